//! Pure connection state and fallback policy
//!
//! The connect-time policy is deliberately small: one attempt against the
//! resolved target, one fallback attempt against `"localhost"`, then give
//! up. After the broker has acknowledged the connection there is no
//! automatic recovery; a lost link is terminal and the keep-alive
//! interval is the only liveness mechanism.

/// Observable state of the bus link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Connect requested, no acknowledgement from the broker yet.
    Connecting,
    /// Broker acknowledged the connection.
    Connected,
    /// Both connect attempts failed; the client is unconnected.
    Failed(String),
    /// Connection lost after it had been established.
    Closed(String),
}

impl LinkState {
    /// Terminal states end the event loop and gate further operations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkState::Failed(_) | LinkState::Closed(_))
    }
}

/// What to do after an event-loop error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectDecision {
    /// Retry once against `"localhost"` on the same port.
    FallBack,
    /// Stop; the client stays unconnected.
    GiveUp,
    /// The link was up when the error occurred; close it.
    CloseLink,
}

/// Pure decision functions for the connect lifecycle.
pub struct ConnectPolicy;

impl ConnectPolicy {
    /// Decide the response to an event-loop error.
    ///
    /// `connected_once` - whether a ConnAck was ever received on this
    /// connect call. `fallen_back` - whether the single fallback attempt
    /// was already used.
    pub fn on_error(connected_once: bool, fallen_back: bool) -> ConnectDecision {
        if connected_once {
            ConnectDecision::CloseLink
        } else if fallen_back {
            ConnectDecision::GiveUp
        } else {
            ConnectDecision::FallBack
        }
    }

    /// Whether subscribe/publish may be issued in `state`.
    ///
    /// Requests queued while still `Connecting` are flushed by the
    /// transport once the handshake completes, so only terminal states
    /// block operations.
    pub fn can_operate(state: &LinkState) -> bool {
        !state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_falls_back_exactly_once() {
        assert_eq!(ConnectPolicy::on_error(false, false), ConnectDecision::FallBack);
        assert_eq!(ConnectPolicy::on_error(false, true), ConnectDecision::GiveUp);
    }

    #[test]
    fn post_connect_errors_close_the_link() {
        assert_eq!(ConnectPolicy::on_error(true, false), ConnectDecision::CloseLink);
        assert_eq!(ConnectPolicy::on_error(true, true), ConnectDecision::CloseLink);
    }

    #[test]
    fn operations_allowed_until_terminal() {
        assert!(ConnectPolicy::can_operate(&LinkState::Connecting));
        assert!(ConnectPolicy::can_operate(&LinkState::Connected));
        assert!(!ConnectPolicy::can_operate(&LinkState::Failed("refused".into())));
        assert!(!ConnectPolicy::can_operate(&LinkState::Closed("broker gone".into())));
    }

    #[test]
    fn terminal_states() {
        assert!(!LinkState::Connecting.is_terminal());
        assert!(!LinkState::Connected.is_terminal());
        assert!(LinkState::Failed(String::new()).is_terminal());
        assert!(LinkState::Closed(String::new()).is_terminal());
    }
}
