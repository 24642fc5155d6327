use actix_web::{HttpResponse, web};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    config::Config,
    domain::aggregation::{MonthlySummary, summarize_month},
    error::{AppError, db_error},
    model::{
        attendance::DailyAttendance, leave_balance::LeaveBalance, request::LeaveType,
    },
    utils::month::{fiscal_year, parse_month_param},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub today: Option<DailyAttendance>,
    pub month: MonthlySummary,
    pub total_work: String,
    pub total_overtime: String,
    pub pending_requests: i64,
    pub fiscal_year: i32,
    pub paid_leave: Option<LeaveBalance>,
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = 200, description = "Today's row, this month's totals, pending requests and paid leave", body = Dashboard)),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let today = config.work_policy().today();
    let month = parse_month_param(None, today);
    let pool = pool.get_ref();

    let rows = sqlx::query_as::<_, DailyAttendance>(
        r#"
        SELECT id, employee_id, work_date, clock_in, clock_out, break_minutes,
               actual_work_minutes, overtime_minutes, late_night_minutes, status
        FROM daily_attendances
        WHERE employee_id = ? AND work_date BETWEEN ? AND ?
        ORDER BY work_date ASC
        "#,
    )
    .bind(auth.employee_id)
    .bind(month.first_day())
    .bind(month.last_day())
    .fetch_all(pool)
    .await
    .map_err(db_error("fetch dashboard month"))?;

    let pending_requests = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM requests WHERE employee_id = ? AND status = 'pending'",
    )
    .bind(auth.employee_id)
    .fetch_one(pool)
    .await
    .map_err(db_error("count pending requests"))?;

    let fiscal_year = fiscal_year(today, config.fiscal_year_start_month);
    let paid_leave = sqlx::query_as::<_, LeaveBalance>(
        r#"
        SELECT id, employee_id, fiscal_year, leave_type, granted_days, used_days, remaining_days
        FROM leave_balances
        WHERE employee_id = ? AND fiscal_year = ? AND leave_type = ?
        "#,
    )
    .bind(auth.employee_id)
    .bind(fiscal_year)
    .bind(LeaveType::Paid)
    .fetch_optional(pool)
    .await
    .map_err(db_error("fetch paid leave balance"))?;

    let summary = summarize_month(&rows);
    Ok(HttpResponse::Ok().json(Dashboard {
        today: rows.into_iter().find(|r| r.work_date == today),
        total_work: summary.total_work(),
        total_overtime: summary.total_overtime(),
        month: summary,
        pending_requests,
        fiscal_year,
        paid_leave,
    }))
}
