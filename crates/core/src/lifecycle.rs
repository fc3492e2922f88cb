use thiserror::Error;

use crate::domain::request::{ApprovalRequest, RequestStatus};
use crate::domain::user::User;

/// Why a locally-evaluated transition was denied. The same check runs before
/// enabling UI affordances and before issuing the transition command; either
/// way the backend's verdict stays authoritative.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionDenial {
    #[error("no authenticated user")]
    NotAuthenticated,
    #[error("only the assigned approver (#{approver_id}) may change this request")]
    NotAssignedApprover { approver_id: i64 },
    #[error("request is already {status}; no further transitions are allowed")]
    AlreadyTerminal { status: RequestStatus },
    #[error("`{target}` is not a valid transition target")]
    InvalidTarget { target: RequestStatus },
}

/// True iff `user` is present, is the assigned approver, and the request is
/// still pending. Advisory only: the backend re-checks on every transition,
/// and a backend denial wins even when this said yes (clock/role skew).
pub fn can_transition(user: Option<&User>, request: &ApprovalRequest) -> bool {
    user.is_some_and(|user| user.id == request.approver_id)
        && request.status == RequestStatus::Pending
}

/// Full transition gate: target validity, authentication, assignment, and the
/// terminal-absorption rule, with a typed denial for each failure.
pub fn authorize_transition(
    user: Option<&User>,
    request: &ApprovalRequest,
    target: RequestStatus,
) -> Result<(), TransitionDenial> {
    if !target.is_terminal() {
        return Err(TransitionDenial::InvalidTarget { target });
    }

    let Some(user) = user else {
        return Err(TransitionDenial::NotAuthenticated);
    };

    if user.id != request.approver_id {
        return Err(TransitionDenial::NotAssignedApprover { approver_id: request.approver_id.0 });
    }

    if request.status.is_terminal() {
        return Err(TransitionDenial::AlreadyTerminal { status: request.status });
    }

    Ok(())
}

/// The status state machine on its own: pending may move to either terminal
/// status; terminal statuses absorb.
pub fn next_status(
    current: RequestStatus,
    target: RequestStatus,
) -> Result<RequestStatus, TransitionDenial> {
    use RequestStatus::{Approved, Pending, Rejected};

    match (current, target) {
        (Pending, Approved) => Ok(Approved),
        (Pending, Rejected) => Ok(Rejected),
        (_, Pending) => Err(TransitionDenial::InvalidTarget { target }),
        (current, _) if current.is_terminal() => {
            Err(TransitionDenial::AlreadyTerminal { status: current })
        }
        (_, target) => Err(TransitionDenial::InvalidTarget { target }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{authorize_transition, can_transition, next_status, TransitionDenial};
    use crate::domain::request::{ApprovalRequest, RequestId, RequestStatus};
    use crate::domain::user::{Role, User, UserId};

    fn approver(id: i64) -> User {
        User {
            id: UserId(id),
            name: format!("Approver {id}"),
            email: format!("approver{id}@coe.dev"),
            role: Role::Approver,
        }
    }

    fn request(approver_id: i64, status: RequestStatus) -> ApprovalRequest {
        ApprovalRequest {
            id: RequestId(1),
            title: "Despliegue pagos v2".to_owned(),
            description: "Ventana nocturna".to_owned(),
            type_key: "despliegue".to_owned(),
            status,
            requester_id: UserId(3),
            approver_id: UserId(approver_id),
            created_at: Utc.timestamp_opt(100, 0).unwrap(),
            updated_at: Utc.timestamp_opt(100, 0).unwrap(),
        }
    }

    #[test]
    fn predicate_true_only_for_assigned_approver_on_pending() {
        let pending = request(7, RequestStatus::Pending);
        assert!(can_transition(Some(&approver(7)), &pending));
    }

    #[test]
    fn predicate_false_for_every_other_combination() {
        let pending = request(7, RequestStatus::Pending);
        let approved = request(7, RequestStatus::Approved);
        let rejected = request(7, RequestStatus::Rejected);

        assert!(!can_transition(None, &pending));
        assert!(!can_transition(Some(&approver(9)), &pending));
        assert!(!can_transition(Some(&approver(7)), &approved));
        assert!(!can_transition(Some(&approver(7)), &rejected));
        assert!(!can_transition(None, &approved));
        assert!(!can_transition(Some(&approver(9)), &rejected));
    }

    #[test]
    fn authorize_allows_both_terminal_targets_from_pending() {
        let pending = request(7, RequestStatus::Pending);
        let actor = approver(7);
        assert!(authorize_transition(Some(&actor), &pending, RequestStatus::Approved).is_ok());
        assert!(authorize_transition(Some(&actor), &pending, RequestStatus::Rejected).is_ok());
    }

    #[test]
    fn authorize_rejects_pending_as_a_target() {
        let pending = request(7, RequestStatus::Pending);
        assert_eq!(
            authorize_transition(Some(&approver(7)), &pending, RequestStatus::Pending),
            Err(TransitionDenial::InvalidTarget { target: RequestStatus::Pending })
        );
    }

    #[test]
    fn authorize_rejects_unauthenticated_actor() {
        let pending = request(7, RequestStatus::Pending);
        assert_eq!(
            authorize_transition(None, &pending, RequestStatus::Approved),
            Err(TransitionDenial::NotAuthenticated)
        );
    }

    #[test]
    fn authorize_rejects_non_assigned_approver() {
        let pending = request(7, RequestStatus::Pending);
        assert_eq!(
            authorize_transition(Some(&approver(9)), &pending, RequestStatus::Approved),
            Err(TransitionDenial::NotAssignedApprover { approver_id: 7 })
        );
    }

    #[test]
    fn authorize_rejects_transitions_out_of_terminal_status() {
        let approved = request(7, RequestStatus::Approved);
        assert_eq!(
            authorize_transition(Some(&approver(7)), &approved, RequestStatus::Rejected),
            Err(TransitionDenial::AlreadyTerminal { status: RequestStatus::Approved })
        );
    }

    #[test]
    fn state_machine_only_permits_pending_to_terminal() {
        assert_eq!(
            next_status(RequestStatus::Pending, RequestStatus::Approved),
            Ok(RequestStatus::Approved)
        );
        assert_eq!(
            next_status(RequestStatus::Pending, RequestStatus::Rejected),
            Ok(RequestStatus::Rejected)
        );
        assert!(next_status(RequestStatus::Approved, RequestStatus::Rejected).is_err());
        assert!(next_status(RequestStatus::Rejected, RequestStatus::Approved).is_err());
        assert!(next_status(RequestStatus::Pending, RequestStatus::Pending).is_err());
    }
}
