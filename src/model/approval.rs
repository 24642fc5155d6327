use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::model::request::RequestStatus;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    EnumString,
    strum::Display,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalAction {
    Approved,
    Rejected,
    /// Sends the request back to its author for resubmission.
    Returned,
}

impl ApprovalAction {
    /// Status the request takes once this action is recorded.
    pub fn resulting_status(self) -> RequestStatus {
        match self {
            ApprovalAction::Approved => RequestStatus::Approved,
            ApprovalAction::Rejected => RequestStatus::Rejected,
            ApprovalAction::Returned => RequestStatus::Pending,
        }
    }
}

/// Audit trail of approval decisions; one row per action.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Approval {
    pub id: u64,
    pub request_id: u64,
    pub approver_id: u64,
    pub action: ApprovalAction,
    pub comment: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub acted_at: DateTime<Utc>,
}
