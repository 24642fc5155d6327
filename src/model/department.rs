use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 3,
    "name": "開発部",
    "parent_id": null,
    "created_at": "2025-04-01T00:00:00Z",
    "updated_at": "2025-04-01T00:00:00Z"
}))]
pub struct Department {
    pub id: u64,
    pub name: String,
    pub parent_id: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}
