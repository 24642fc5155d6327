use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AuditLog {
    pub id: u64,
    pub actor_id: Option<u64>,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub old_values: Option<sqlx::types::JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub new_values: Option<sqlx::types::JsonValue>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
