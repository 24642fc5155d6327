//! Request lifecycle.
//!
//! ```text
//! pending --approved--> approved
//! pending --rejected--> rejected
//! pending --returned--> pending   (sent back for resubmission)
//! pending --withdraw--> withdrawn (author only)
//! ```
//!
//! Approved, rejected and withdrawn are terminal. Callers must evaluate these
//! checks against a row they hold locked, so the status they read is still the
//! status when they write.

use thiserror::Error;

use crate::model::{
    approval::ApprovalAction,
    request::RequestStatus,
    role::Role,
};

/// The signed-in employee acting on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub employee_id: u64,
    pub role: Role,
}

/// Current state of a request together with its author's manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct RequestSnapshot {
    pub status: RequestStatus,
    pub employee_id: u64,
    pub manager_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("承認権限がありません")]
    NotAnApprover,
    #[error("直属の部下の申請のみ処理できます")]
    NotSubordinate,
    #[error("本人の申請のみ取り下げできます")]
    NotOwner,
    #[error("この申請は既に処理済みです（{0}）")]
    NotPending(RequestStatus),
}

/// Validates an approval action and returns the status the request moves to.
pub fn authorize_action(
    actor: Actor,
    request: &RequestSnapshot,
    action: ApprovalAction,
) -> Result<RequestStatus, TransitionError> {
    if !actor.role.is_approver() {
        return Err(TransitionError::NotAnApprover);
    }
    if actor.role == Role::Manager && request.manager_id != Some(actor.employee_id) {
        return Err(TransitionError::NotSubordinate);
    }
    if request.status != RequestStatus::Pending {
        return Err(TransitionError::NotPending(request.status));
    }
    Ok(action.resulting_status())
}

/// Validates that `employee_id` may withdraw the request.
pub fn authorize_withdrawal(
    employee_id: u64,
    request: &RequestSnapshot,
) -> Result<RequestStatus, TransitionError> {
    if request.employee_id != employee_id {
        return Err(TransitionError::NotOwner);
    }
    if request.status != RequestStatus::Pending {
        return Err(TransitionError::NotPending(request.status));
    }
    Ok(RequestStatus::Withdrawn)
}
