//! Frequently asked questions.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    fn new(question: &str, answer: &str) -> Self {
        Self {
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }
}

/// A fixed list of questions searchable by substring.
#[derive(Debug, Clone)]
pub struct FaqBook {
    entries: Vec<FaqEntry>,
    operator: String,
}

impl Default for FaqBook {
    fn default() -> Self {
        Self {
            entries: vec![
                FaqEntry::new("How do I sign up?", "Send /start and follow the instructions."),
                FaqEntry::new(
                    "How do I change my password?",
                    "Open the settings and choose 'Change password'.",
                ),
                FaqEntry::new(
                    "What if I forgot my password?",
                    "Use 'Restore password' on the website.",
                ),
                FaqEntry::new(
                    "How do I contact support?",
                    "Write to support@example.com.",
                ),
            ],
            operator: "@op_login".to_string(),
        }
    }
}

impl FaqBook {
    pub fn new(entries: Vec<FaqEntry>, operator: impl Into<String>) -> Self {
        Self {
            entries,
            operator: operator.into(),
        }
    }

    /// How to ask a question, shown for the FAQ menu button.
    pub fn instructions(&self) -> String {
        format!(
            "Ask a question in the form: faq <your question>\nor contact an operator {}",
            self.operator
        )
    }

    /// Entries whose question contains `query`, ignoring case.
    ///
    /// An empty query returns every entry.
    pub fn search(&self, query: &str) -> Vec<FaqEntry> {
        let query = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| query.is_empty() || e.question.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }
}
