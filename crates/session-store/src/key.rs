use common::UserId;
use serde::{Deserialize, Serialize};

/// Logical namespace a session lives in.
///
/// One user may hold independent sessions in different namespaces (for
/// example a private chat and a group conversation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Namespace used for one-to-one chats with the bot.
    pub const CHAT: &'static str = "chat";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new(Self::CHAT)
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a single session: a user within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub namespace: Namespace,
    pub user_id: UserId,
}

impl SessionKey {
    pub fn new(namespace: Namespace, user_id: UserId) -> Self {
        Self { namespace, user_id }
    }

    /// Key for the user's one-to-one chat session.
    pub fn chat(user_id: UserId) -> Self {
        Self::new(Namespace::default(), user_id)
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.user_id)
    }
}
