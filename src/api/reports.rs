use actix_web::{HttpResponse, web};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    api::attendance::MonthQuery,
    auth::auth::AuthUser,
    config::Config,
    domain::aggregation::{
        DepartmentDayRow, DepartmentSummary, MonthlySummary, OvertimeAlert, OvertimeRow,
        overtime_alerts, summarize_departments, summarize_month,
    },
    error::{AppError, db_error},
    model::role::Capability,
    utils::month::{MonthParam, parse_month_param},
};

const ALERT_LIMIT: usize = 10;

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlyReport {
    pub month: MonthParam,
    pub label: String,
    pub summary: MonthlySummary,
    pub total_work: String,
    pub total_overtime: String,
    pub total_late_night: String,
    pub departments: Vec<DepartmentSummary>,
    pub overtime_alerts: Vec<OvertimeAlert>,
    pub active_employees: i64,
}

#[utoipa::path(
    get,
    path = "/api/admin/reports",
    params(MonthQuery),
    responses((status = 200, description = "Organization-wide figures for the month", body = MonthlyReport)),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn monthly_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewReports)?;

    let month = parse_month_param(query.month.as_deref(), config.work_policy().today());
    let (first, last) = (month.first_day(), month.last_day());
    debug!(year = month.year, month = month.month, is_valid = month.is_valid, "Building report");
    let pool = pool.get_ref();

    let days = sqlx::query_as::<_, DepartmentDayRow>(
        r#"
        SELECT da.employee_id, e.is_active AS employee_active, e.department_id,
               d.name AS department_name, da.actual_work_minutes, da.overtime_minutes,
               da.late_night_minutes, da.status
        FROM daily_attendances da
        JOIN employees e ON e.id = da.employee_id
        LEFT JOIN departments d ON d.id = e.department_id
        WHERE da.work_date BETWEEN ? AND ?
        "#,
    )
    .bind(first)
    .bind(last)
    .fetch_all(pool)
    .await
    .map_err(db_error("fetch report days"))?;

    let overtime = sqlx::query_as::<_, OvertimeRow>(
        r#"
        SELECT da.employee_id, e.name, e.employee_number, d.name AS department_name,
               da.overtime_minutes
        FROM daily_attendances da
        JOIN employees e ON e.id = da.employee_id
        LEFT JOIN departments d ON d.id = e.department_id
        WHERE e.is_active = TRUE AND da.work_date BETWEEN ? AND ? AND da.overtime_minutes > 0
        "#,
    )
    .bind(first)
    .bind(last)
    .fetch_all(pool)
    .await
    .map_err(db_error("fetch report overtime"))?;

    let active_employees =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE is_active = TRUE")
            .fetch_one(pool)
            .await
            .map_err(db_error("count active employees"))?;

    // Organization totals include since-deactivated employees; departments do not.
    let summary = summarize_month(&days);
    Ok(HttpResponse::Ok().json(MonthlyReport {
        label: month.label(),
        month,
        total_work: summary.total_work(),
        total_overtime: summary.total_overtime(),
        total_late_night: summary.total_late_night(),
        summary,
        departments: summarize_departments(&days),
        overtime_alerts: overtime_alerts(
            &overtime,
            i64::from(config.overtime_alert_minutes),
            ALERT_LIMIT,
        ),
        active_employees,
    }))
}
