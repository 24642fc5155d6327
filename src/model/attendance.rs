use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

/// Kind of punch.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
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
pub enum AttendanceType {
    ClockIn,
    ClockOut,
    BreakStart,
    BreakEnd,
}

/// One raw punch event. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    pub attendance_type: AttendanceType,
    #[schema(value_type = String, format = "date-time")]
    pub recorded_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub note: Option<String>,
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
pub enum DayStatus {
    Present,
    Absent,
    Holiday,
    Leave,
}

/// Aggregated one-row-per-day summary, unique on (employee_id, work_date).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DailyAttendance {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub work_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub clock_out: Option<DateTime<Utc>>,
    pub break_minutes: i32,
    pub actual_work_minutes: i32,
    pub overtime_minutes: i32,
    pub late_night_minutes: i32,
    pub status: DayStatus,
}
