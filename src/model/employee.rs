use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::model::role::Role;

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
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 12,
        "user_id": 40,
        "employee_number": "E0012",
        "name": "山田 太郎",
        "email": "taro.yamada@example.com",
        "department_id": 3,
        "department_name": "開発部",
        "role": "employee",
        "employment_type": "full_time",
        "manager_id": 4,
        "hire_date": "2024-04-01",
        "is_active": true,
        "created_at": "2024-04-01T00:00:00Z",
        "updated_at": "2024-04-01T00:00:00Z"
    })
)]
pub struct Employee {
    pub id: u64,

    pub user_id: u64,

    #[schema(example = "E0012")]
    pub employee_number: String,

    pub name: String,

    #[schema(example = "taro.yamada@example.com")]
    pub email: String,

    #[schema(nullable = true)]
    pub department_id: Option<u64>,

    /// Joined from `departments`.
    #[sqlx(default)]
    #[schema(nullable = true)]
    pub department_name: Option<String>,

    pub role: Role,

    pub employment_type: EmploymentType,

    /// Direct manager; managers form a tree over employees.
    #[schema(nullable = true)]
    pub manager_id: Option<u64>,

    #[schema(
        example = "2024-04-01",
        value_type = String,
        format = "date"
    )]
    pub hire_date: NaiveDate,

    pub is_active: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}
