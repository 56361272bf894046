//! Session lifecycle states and the rules for moving between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a session.
///
/// States are ordered along `Connecting → Configured → Active → Closing →
/// Closed`. A session only ever moves forward along this order; `Active` may
/// be re-entered from itself as further input arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Freshly created, setup not yet applied.
    Connecting,
    /// Setup applied, no conversational input seen yet.
    Configured,
    /// At least one text or audio input has been received.
    Active,
    /// An end-session request is being processed.
    Closing,
    /// Terminal.
    Closed,
}

impl SessionState {
    /// Returns `true` if a session in this state may move to `next`.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        match self {
            SessionState::Closed => false,
            _ => next >= self && next != SessionState::Connecting,
        }
    }

    /// Returns `true` once setup has been applied and the session has not
    /// started closing.
    pub fn is_configured(self) -> bool {
        matches!(self, SessionState::Configured | SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "Connecting",
            SessionState::Configured => "Configured",
            SessionState::Active => "Active",
            SessionState::Closing => "Closing",
            SessionState::Closed => "Closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SessionState; 5] = [
        SessionState::Connecting,
        SessionState::Configured,
        SessionState::Active,
        SessionState::Closing,
        SessionState::Closed,
    ];

    #[test]
    fn test_display_names() {
        let names: Vec<String> = ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec!["Connecting", "Configured", "Active", "Closing", "Closed"]
        );
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(SessionState::Connecting.can_advance_to(SessionState::Configured));
        assert!(SessionState::Configured.can_advance_to(SessionState::Active));
        assert!(SessionState::Active.can_advance_to(SessionState::Active));
        assert!(SessionState::Active.can_advance_to(SessionState::Closing));
        assert!(SessionState::Configured.can_advance_to(SessionState::Closing));
        assert!(SessionState::Closing.can_advance_to(SessionState::Closed));
    }

    #[test]
    fn test_no_state_regresses() {
        for (i, from) in ALL.iter().enumerate() {
            for to in &ALL[..i] {
                assert!(
                    !from.can_advance_to(*to),
                    "{} must not move back to {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_closed_is_terminal() {
        for to in ALL {
            assert!(!SessionState::Closed.can_advance_to(to));
        }
    }

    #[test]
    fn test_connecting_is_never_reentered() {
        assert!(!SessionState::Connecting.can_advance_to(SessionState::Connecting));
    }

    #[test]
    fn test_is_configured() {
        assert!(!SessionState::Connecting.is_configured());
        assert!(SessionState::Configured.is_configured());
        assert!(SessionState::Active.is_configured());
        assert!(!SessionState::Closing.is_configured());
        assert!(!SessionState::Closed.is_configured());
    }

    #[test]
    fn test_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionState::Configured).unwrap(),
            "\"configured\""
        );
    }
}
