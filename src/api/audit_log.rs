use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    error::{AppError, db_error},
    model::{audit_log::AuditLog, role::Capability},
    utils::db_utils::PageWindow,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditLogQuery {
    /// Only entries written for this table.
    pub table: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AuditLogPage {
    pub data: Vec<AuditLog>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(AuditLogQuery),
    responses((status = 200, description = "Audit entries, newest first", body = AuditLogPage)),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
pub async fn list_audit_logs(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AuditLogQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewAuditLog)?;

    let PageWindow { page, per_page, offset } = PageWindow::new(query.page, query.per_page, 50, 200);
    let table = query.table.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let where_clause = if table.is_some() { "WHERE table_name = ?" } else { "" };
    debug!(?table, page, per_page, "Listing audit logs");

    let count_sql = format!("SELECT COUNT(*) FROM audit_logs {where_clause}");
    let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(table) = table {
        count = count.bind(table);
    }
    let total = count
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("count audit logs"))?;

    let data_sql = format!(
        r#"
        SELECT id, actor_id, action, table_name, record_id, old_values, new_values, created_at
        FROM audit_logs {where_clause}
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#
    );
    let mut rows = sqlx::query_as::<_, AuditLog>(&data_sql);
    if let Some(table) = table {
        rows = rows.bind(table);
    }
    let data = rows
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("list audit logs"))?;

    Ok(HttpResponse::Ok().json(AuditLogPage {
        data,
        page,
        per_page,
        total,
    }))
}
