//! Canonical SLURM job states and their classification.
//!
//! The scheduler reports free-form state tokens; everything downstream
//! (store, reconciler, HTTP responses) works with the canonical
//! [`SlurmState`] enum. Tokens outside the canonical set fold to
//! [`SlurmState::Unknown`] rather than leaking raw strings into the store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical job states.
///
/// `Cancelled` is canonical even though sacct reports it with an
/// attribution suffix (`CANCELLED by <uid>`); classification strips that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlurmState {
    Completed,
    Completing,
    Failed,
    Pending,
    Preempted,
    Running,
    Suspended,
    Stopped,
    Cancelled,
    Unknown,
}

/// Short status code and human explanation for a canonical state, as
/// reported in diagnostic responses.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StateInfo {
    pub state: SlurmState,
    pub code: &'static str,
    pub explanation: &'static str,
}

/// Reference table of status codes and explanations.
pub const STATE_TABLE: &[StateInfo] = &[
    StateInfo {
        state: SlurmState::Completed,
        code: "CD",
        explanation: "The job has completed successfully.",
    },
    StateInfo {
        state: SlurmState::Completing,
        code: "CG",
        explanation: "The job is finishing but some processes are still active.",
    },
    StateInfo {
        state: SlurmState::Failed,
        code: "F",
        explanation: "The job terminated with a non-zero exit code and failed to execute.",
    },
    StateInfo {
        state: SlurmState::Pending,
        code: "PD",
        explanation: "The job is waiting for resource allocation. It will eventually run.",
    },
    StateInfo {
        state: SlurmState::Preempted,
        code: "PR",
        explanation: "The job was terminated because of preemption by another job.",
    },
    StateInfo {
        state: SlurmState::Running,
        code: "R",
        explanation: "The job currently is allocated to a node and is running.",
    },
    StateInfo {
        state: SlurmState::Suspended,
        code: "S",
        explanation: "A running job has been stopped with its cores released to other jobs.",
    },
    StateInfo {
        state: SlurmState::Stopped,
        code: "ST",
        explanation: "A running job has been stopped with its cores retained.",
    },
];

impl SlurmState {
    /// Classify a raw scheduler token into a canonical state.
    ///
    /// Unrecognized tokens become `Unknown`. sacct reports cancellations as
    /// `CANCELLED by <uid>`, so a `CANCELLED` prefix is enough.
    pub fn classify(token: &str) -> Self {
        let token = token.trim();
        if token.starts_with("CANCELLED") {
            return Self::Cancelled;
        }
        match token {
            "COMPLETED" => Self::Completed,
            "COMPLETING" => Self::Completing,
            "FAILED" => Self::Failed,
            "PENDING" => Self::Pending,
            "PREEMPTED" => Self::Preempted,
            "RUNNING" => Self::Running,
            "SUSPENDED" => Self::Suspended,
            "STOPPED" => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    /// Strict parse for user-supplied state names: canonical named states
    /// only, no folding. `UNKNOWN` is not addressable by clients.
    pub fn parse_known(token: &str) -> Option<Self> {
        match Self::classify(token) {
            Self::Unknown => None,
            state => Some(state),
        }
    }

    /// Terminal states trigger notification and removal from the store.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether this is a named canonical state (everything but `Unknown`).
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Completing => "COMPLETING",
            Self::Failed => "FAILED",
            Self::Pending => "PENDING",
            Self::Preempted => "PREEMPTED",
            Self::Running => "RUNNING",
            Self::Suspended => "SUSPENDED",
            Self::Stopped => "STOPPED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Short sacct code, where the reference table defines one.
    pub fn code(self) -> Option<&'static str> {
        STATE_TABLE
            .iter()
            .find(|info| info.state == self)
            .map(|info| info.code)
    }
}

impl fmt::Display for SlurmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_canonical_tokens() {
        assert_eq!(SlurmState::classify("COMPLETED"), SlurmState::Completed);
        assert_eq!(SlurmState::classify("PENDING"), SlurmState::Pending);
        assert_eq!(SlurmState::classify("RUNNING"), SlurmState::Running);
        assert_eq!(SlurmState::classify(" SUSPENDED "), SlurmState::Suspended);
    }

    #[test]
    fn unknown_tokens_fold_to_unknown() {
        assert_eq!(SlurmState::classify("BOOT_FAIL"), SlurmState::Unknown);
        assert_eq!(SlurmState::classify("running"), SlurmState::Unknown);
        assert_eq!(SlurmState::classify(""), SlurmState::Unknown);
    }

    #[test]
    fn cancelled_by_uid_is_cancelled() {
        assert_eq!(SlurmState::classify("CANCELLED"), SlurmState::Cancelled);
        assert_eq!(
            SlurmState::classify("CANCELLED by 5012"),
            SlurmState::Cancelled
        );
    }

    #[test]
    fn terminal_set() {
        assert!(SlurmState::Completed.is_terminal());
        assert!(SlurmState::Failed.is_terminal());
        assert!(SlurmState::Cancelled.is_terminal());
        assert!(!SlurmState::Suspended.is_terminal());
        assert!(!SlurmState::Completing.is_terminal());
        assert!(!SlurmState::Unknown.is_terminal());
    }

    #[test]
    fn parse_known_rejects_unknown() {
        assert_eq!(SlurmState::parse_known("FAILED"), Some(SlurmState::Failed));
        assert_eq!(SlurmState::parse_known("UNKNOWN"), None);
        assert_eq!(SlurmState::parse_known("NODE_FAIL"), None);
    }

    #[test]
    fn code_table_covers_the_eight_reported_states() {
        assert_eq!(SlurmState::Completed.code(), Some("CD"));
        assert_eq!(SlurmState::Stopped.code(), Some("ST"));
        assert_eq!(SlurmState::Cancelled.code(), None);
        assert_eq!(SlurmState::Unknown.code(), None);
        assert_eq!(STATE_TABLE.len(), 8);
    }

    #[test]
    fn wire_format_is_screaming_snake_case() {
        let json = serde_json::to_string(&SlurmState::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        let back: SlurmState = serde_json::from_str("\"PENDING\"").unwrap();
        assert_eq!(back, SlurmState::Pending);
    }
}
