//! Session lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle of a live session.
///
/// `Connecting → Connected`, `Connecting → Error`, `Connected → Error`, and
/// any state to `Closed`. Nothing leaves `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Connecting,
    Connected,
    Error,
    Closed,
}

impl SessionState {
    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, Connected)
                | (Connecting, Error)
                | (Connected, Error)
                | (Connecting, Closed)
                | (Connected, Closed)
                | (Error, Closed)
        )
    }

    /// Whether audio may still flow in this state.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// What the presentation layer renders.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionState,
    pub muted: bool,
    /// Microphone loudness in `[0, 1]`.
    pub volume: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    const ALL: [SessionState; 4] = [Connecting, Connected, Error, Closed];

    #[test]
    fn test_nothing_leaves_closed() {
        for next in ALL {
            assert!(!Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_everything_else_can_close() {
        for state in [Connecting, Connected, Error] {
            assert!(state.can_transition_to(Closed));
        }
    }

    #[test]
    fn test_no_backwards_moves() {
        assert!(!Connected.can_transition_to(Connecting));
        assert!(!Error.can_transition_to(Connected));
        assert!(!Error.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connected.can_transition_to(Error));
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(Connected.to_string(), "connected");
        assert_eq!(serde_json::to_string(&Error).unwrap(), "\"error\"");
    }
}
