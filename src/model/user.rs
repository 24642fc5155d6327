use serde::{Deserialize, Serialize};

use crate::model::role::Role;

/// Login account joined with the employee it belongs to.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub employee_id: u64,
    pub role: Role,
    pub is_active: bool,
}
