//! Broadcast tick phases.

use serde::{Deserialize, Serialize};

/// What the broadcast job is doing right now.
///
/// ```text
/// Idle ──► FindingPromo ──┬──► Idle                     (no eligible promo)
///                         └──► Broadcasting ──► Consuming ──► Idle
/// ```
///
/// Any error returns the job to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastPhase {
    #[default]
    Idle,
    FindingPromo,
    Broadcasting,
    Consuming,
}

impl BroadcastPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastPhase::Idle => "idle",
            BroadcastPhase::FindingPromo => "finding_promo",
            BroadcastPhase::Broadcasting => "broadcasting",
            BroadcastPhase::Consuming => "consuming",
        }
    }
}

impl std::fmt::Display for BroadcastPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_phase_is_idle() {
        assert_eq!(BroadcastPhase::default(), BroadcastPhase::Idle);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(BroadcastPhase::FindingPromo).unwrap(),
            "finding_promo"
        );
        assert_eq!(BroadcastPhase::Broadcasting.to_string(), "broadcasting");
    }
}
