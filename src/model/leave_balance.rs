use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::request::LeaveType;

/// Leave entitlement for one fiscal year. `remaining_days` is maintained by the store.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    pub id: u64,
    pub employee_id: u64,
    pub fiscal_year: i32,
    pub leave_type: LeaveType,
    pub granted_days: f64,
    pub used_days: f64,
    pub remaining_days: f64,
}
