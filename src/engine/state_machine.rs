//! Ticket status transition table

use crate::core::Status;
use crate::error::{Result, ServiceDeskError};

/// Targets reachable from `from` in one step
#[must_use]
pub const fn allowed_transitions(from: Status) -> &'static [Status] {
    match from {
        Status::Open => &[Status::InProgress, Status::Resolved, Status::Closed],
        Status::InProgress => &[Status::Pending, Status::Resolved, Status::Open],
        Status::Pending => &[Status::InProgress, Status::Resolved],
        Status::Resolved => &[Status::Closed, Status::InProgress],
        Status::Closed => &[],
    }
}

#[must_use]
pub fn can_transition(from: Status, to: Status) -> bool {
    allowed_transitions(from).contains(&to)
}

pub fn validate_transition(from: Status, to: Status) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(ServiceDeskError::InvalidTransition { from, to })
    }
}

/// Whether the move takes the ticket out of the active set
#[must_use]
pub const fn leaves_active_set(from: Status, to: Status) -> bool {
    from.is_active() && !to.is_active()
}

/// Whether the move brings the ticket back into the active set
#[must_use]
pub const fn enters_active_set(from: Status, to: Status) -> bool {
    !from.is_active() && to.is_active()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table() {
        assert!(can_transition(Status::Open, Status::InProgress));
        assert!(can_transition(Status::Open, Status::Closed));
        assert!(can_transition(Status::Open, Status::Resolved));
        assert!(can_transition(Status::InProgress, Status::Pending));
        assert!(can_transition(Status::InProgress, Status::Open));
        assert!(can_transition(Status::Pending, Status::InProgress));
        assert!(can_transition(Status::Pending, Status::Resolved));
        assert!(can_transition(Status::Resolved, Status::Closed));
        assert!(can_transition(Status::Resolved, Status::InProgress));

        assert!(!can_transition(Status::Open, Status::Pending));
        assert!(!can_transition(Status::Pending, Status::Open));
        assert!(!can_transition(Status::Pending, Status::Closed));
        assert!(!can_transition(Status::Resolved, Status::Open));
    }

    #[test]
    fn test_closed_is_terminal() {
        for to in Status::ALL {
            assert!(matches!(
                validate_transition(Status::Closed, to),
                Err(ServiceDeskError::InvalidTransition {
                    from: Status::Closed,
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_no_self_transitions() {
        for status in Status::ALL {
            assert!(!can_transition(status, status), "{status}");
        }
    }

    #[test]
    fn test_active_set_crossings() {
        assert!(leaves_active_set(Status::Pending, Status::Resolved));
        assert!(!leaves_active_set(Status::Resolved, Status::Closed));
        assert!(enters_active_set(Status::Resolved, Status::InProgress));
        assert!(!enters_active_set(Status::Open, Status::InProgress));
    }
}
