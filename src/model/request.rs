use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

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
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestType {
    Overtime,
    HolidayWork,
    Leave,
    AttendanceCorrection,
}

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
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Withdrawn,
}

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
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveType {
    Paid,
    Substitute,
    Sick,
    Special,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 81,
    "employee_id": 12,
    "request_type": "leave",
    "status": "pending",
    "request_date": "2025-04-01",
    "start_date": "2025-04-10",
    "end_date": "2025-04-12",
    "reason": "family event",
    "leave_type": "paid",
    "target_attendance_id": null,
    "created_at": "2025-04-01T01:00:00Z",
    "updated_at": "2025-04-01T01:00:00Z"
}))]
pub struct Request {
    pub id: u64,
    pub employee_id: u64,
    pub request_type: RequestType,
    pub status: RequestStatus,
    #[schema(value_type = String, format = "date")]
    pub request_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub reason: String,
    /// Set iff `request_type` is `leave`.
    pub leave_type: Option<LeaveType>,
    pub target_attendance_id: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}
