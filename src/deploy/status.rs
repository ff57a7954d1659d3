//! Stack status classification.
//!
//! Maps raw control-plane status codes onto the three outcomes the poll
//! loop cares about, and decides which events are allowed to end an
//! operation.

use crate::controlplane::StackEvent;

/// Resource type of a top-level stack in the event log.
pub const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// Statuses that terminate an operation successfully.
const SUCCESS_STATUSES: &[&str] = &["CREATE_COMPLETE", "UPDATE_COMPLETE", "DELETE_COMPLETE"];

/// Statuses that terminate an operation as failed. Rollback activity in
/// any form means the requested operation was abandoned.
const FAILURE_STATUSES: &[&str] = &[
    "ROLLBACK_IN_PROGRESS",
    "ROLLBACK_FAILED",
    "ROLLBACK_COMPLETE",
    "UPDATE_ROLLBACK_IN_PROGRESS",
    "UPDATE_ROLLBACK_FAILED",
    "UPDATE_ROLLBACK_COMPLETE",
    "CREATE_FAILED",
    "UPDATE_FAILED",
    "DELETE_FAILED",
];

/// Statuses under which a stack accepts an update rather than a create.
const UPDATABLE_STATUSES: &[&str] = &[
    "CREATE_COMPLETE",
    "UPDATE_COMPLETE",
    "ROLLBACK_COMPLETE",
    "UPDATE_ROLLBACK_COMPLETE",
];

/// Settled statuses the cleanup scanner considers. In-progress stacks are
/// left alone.
pub const STABLE_STATUSES: &[&str] = &[
    "CREATE_COMPLETE",
    "CREATE_FAILED",
    "ROLLBACK_COMPLETE",
    "ROLLBACK_FAILED",
    "UPDATE_COMPLETE",
    "UPDATE_ROLLBACK_COMPLETE",
    "UPDATE_ROLLBACK_FAILED",
    "DELETE_FAILED",
];

/// Outcome class of a raw status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackProgress {
    /// The operation is still in flight.
    Pending,
    /// The operation completed successfully.
    Success,
    /// The operation failed or is rolling back.
    Failure,
}

/// Classifies a raw status code.
#[must_use]
pub fn classify(status: &str) -> StackProgress {
    if SUCCESS_STATUSES.contains(&status) {
        StackProgress::Success
    } else if FAILURE_STATUSES.contains(&status) {
        StackProgress::Failure
    } else {
        StackProgress::Pending
    }
}

/// Returns true if the event is the stack's own lifecycle signal.
///
/// Nested child stacks emit the same status vocabulary under the same
/// resource type; only an event whose logical id equals the target stack
/// name may end the operation.
#[must_use]
pub fn is_authoritative(event: &StackEvent, stack_name: &str) -> bool {
    event.resource_type == STACK_RESOURCE_TYPE && event.logical_id == stack_name
}

/// Returns true if a stack in this status is updated rather than created.
#[must_use]
pub fn is_updatable(status: &str) -> bool {
    UPDATABLE_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(resource_type: &str, logical_id: &str) -> StackEvent {
        StackEvent {
            event_id: String::from("evt-1"),
            logical_id: logical_id.to_string(),
            resource_type: resource_type.to_string(),
            status: String::from("CREATE_COMPLETE"),
            status_reason: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_classify_success_statuses() {
        assert_eq!(classify("CREATE_COMPLETE"), StackProgress::Success);
        assert_eq!(classify("UPDATE_COMPLETE"), StackProgress::Success);
        assert_eq!(classify("DELETE_COMPLETE"), StackProgress::Success);
    }

    #[test]
    fn test_classify_failure_statuses() {
        assert_eq!(classify("ROLLBACK_IN_PROGRESS"), StackProgress::Failure);
        assert_eq!(classify("ROLLBACK_COMPLETE"), StackProgress::Failure);
        assert_eq!(classify("UPDATE_ROLLBACK_COMPLETE"), StackProgress::Failure);
        assert_eq!(classify("CREATE_FAILED"), StackProgress::Failure);
        assert_eq!(classify("DELETE_FAILED"), StackProgress::Failure);
    }

    #[test]
    fn test_classify_everything_else_is_pending() {
        assert_eq!(classify("CREATE_IN_PROGRESS"), StackProgress::Pending);
        assert_eq!(
            classify("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"),
            StackProgress::Pending
        );
        assert_eq!(
            classify("UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS"),
            StackProgress::Pending
        );
        assert_eq!(classify("REVIEW_IN_PROGRESS"), StackProgress::Pending);
    }

    #[test]
    fn test_authoritative_requires_stack_type_and_name() {
        assert!(is_authoritative(&event(STACK_RESOURCE_TYPE, "demo"), "demo"));
        assert!(!is_authoritative(&event("AWS::S3::Bucket", "demo"), "demo"));
    }

    #[test]
    fn test_nested_child_stack_is_not_authoritative() {
        let nested = event(STACK_RESOURCE_TYPE, "demo-ChildStack-1ABC");
        assert!(!is_authoritative(&nested, "demo"));
    }

    #[test]
    fn test_updatable_statuses() {
        assert!(is_updatable("CREATE_COMPLETE"));
        assert!(is_updatable("UPDATE_ROLLBACK_COMPLETE"));
        assert!(!is_updatable("DELETE_COMPLETE"));
        assert!(!is_updatable("CREATE_IN_PROGRESS"));
    }
}
