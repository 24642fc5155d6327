use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, MySql, MySqlPool};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    config::Config,
    domain::{
        aggregation::{DaySummary, MonthlySummary, Punch, WorkPolicy, summarize_day, summarize_month},
        punch::PunchState,
    },
    error::{AppError, db_error},
    model::{
        attendance::{AttendanceRecord, AttendanceType, DailyAttendance},
        role::Capability,
    },
    utils::{
        month::{MonthParam, parse_month_param},
        validation::{ValidationRule, sanitize, validate_optional},
    },
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PunchRequest {
    pub attendance_type: AttendanceType,
    #[schema(example = 35.681)]
    pub latitude: Option<f64>,
    #[schema(example = 139.767)]
    pub longitude: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayAttendance {
    #[schema(value_type = String, format = "date")]
    pub work_date: NaiveDate,
    pub punches: Vec<AttendanceRecord>,
    pub state: PunchState,
    /// Punch kinds accepted next.
    pub allowed: Vec<AttendanceType>,
    pub summary: DaySummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PunchResponse {
    pub record: AttendanceRecord,
    pub state: PunchState,
    pub allowed: Vec<AttendanceType>,
    pub summary: DaySummary,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthQuery {
    /// `YYYY-MM`; the current month when absent or invalid.
    pub month: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalendarDay {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    /// `Mon` … `Sun`.
    pub weekday: String,
    pub is_weekend: bool,
    pub record: Option<DailyAttendance>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub month: MonthParam,
    pub records: Vec<DailyAttendance>,
    pub calendar: Vec<CalendarDay>,
    pub summary: MonthlySummary,
    pub total_work: String,
    pub total_overtime: String,
    pub total_late_night: String,
}

fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), AppError> {
    let lat_ok = latitude.is_none_or(|v| (-90.0..=90.0).contains(&v));
    let lon_ok = longitude.is_none_or(|v| (-180.0..=180.0).contains(&v));
    if lat_ok && lon_ok && latitude.is_some() == longitude.is_some() {
        Ok(())
    } else {
        Err(AppError::validation("位置情報が不正です"))
    }
}

async fn punches_on<'c, E>(
    executor: E,
    employee_id: u64,
    date: NaiveDate,
    policy: &WorkPolicy,
) -> Result<Vec<AttendanceRecord>, AppError>
where
    E: Executor<'c, Database = MySql>,
{
    let (start, end) = policy.day_bounds(date);
    sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, employee_id, attendance_type, recorded_at, latitude, longitude, note
        FROM attendance_records
        WHERE employee_id = ? AND recorded_at >= ? AND recorded_at < ?
        ORDER BY recorded_at ASC, id ASC
        "#,
    )
    .bind(employee_id)
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
    .map_err(db_error("fetch punches"))
}

fn day_of(records: &[AttendanceRecord], policy: &WorkPolicy) -> (PunchState, DaySummary) {
    let state = PunchState::replay(records.iter().map(|r| r.attendance_type));
    let punches: Vec<Punch> = records.iter().map(Punch::from).collect();
    (state, summarize_day(&punches, policy))
}

#[utoipa::path(
    get,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Today's punches and the punches allowed next", body = TodayAttendance),
        (status = 401, description = "Unauthorized", body = AppError)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::Punch)?;

    let policy = config.work_policy();
    let work_date = policy.today();

    let punches = punches_on(pool.get_ref(), auth.employee_id, work_date, &policy).await?;

    let (state, summary) = day_of(&punches, &policy);
    Ok(HttpResponse::Ok().json(TodayAttendance {
        work_date,
        punches,
        allowed: state.allowed(),
        state,
        summary,
    }))
}

#[utoipa::path(
    post,
    path = "/api/attendance/punch",
    request_body = PunchRequest,
    responses(
        (status = 201, description = "Punch recorded and the day re-aggregated", body = PunchResponse),
        (status = 400, description = "Invalid note or coordinates", body = AppError),
        (status = 409, description = "Punch out of sequence", body = AppError)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn punch(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<PunchRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::Punch)?;

    let payload = payload.into_inner();
    validate_optional(payload.note.as_deref(), ValidationRule::Comment)?;
    check_coordinates(payload.latitude, payload.longitude)?;
    let note = payload
        .note
        .as_deref()
        .map(sanitize)
        .filter(|n| !n.is_empty());

    let policy = config.work_policy();
    let now = Utc::now();
    let work_date = policy.work_date(now);
    let employee_id = auth.employee_id;

    let mut tx = pool.begin().await.map_err(db_error("begin punch"))?;

    // Serializes concurrent punches of one employee.
    sqlx::query("SELECT id FROM employees WHERE id = ? FOR UPDATE")
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("lock employee"))?
        .ok_or_else(|| AppError::not_found("社員情報が見つかりません"))?;

    let mut punches = punches_on(&mut *tx, employee_id, work_date, &policy).await?;
    PunchState::replay(punches.iter().map(|r| r.attendance_type)).check(payload.attendance_type)?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO attendance_records
            (employee_id, attendance_type, recorded_at, latitude, longitude, note)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.attendance_type)
    .bind(now)
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(&note)
    .execute(&mut *tx)
    .await
    .map_err(db_error("insert punch"))?;

    let record = AttendanceRecord {
        id: inserted.last_insert_id(),
        employee_id,
        attendance_type: payload.attendance_type,
        recorded_at: now,
        latitude: payload.latitude,
        longitude: payload.longitude,
        note,
    };
    punches.push(record.clone());

    let (state, summary) = day_of(&punches, &policy);
    sqlx::query(
        r#"
        INSERT INTO daily_attendances
            (employee_id, work_date, clock_in, clock_out, break_minutes,
             actual_work_minutes, overtime_minutes, late_night_minutes, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            clock_in = VALUES(clock_in),
            clock_out = VALUES(clock_out),
            break_minutes = VALUES(break_minutes),
            actual_work_minutes = VALUES(actual_work_minutes),
            overtime_minutes = VALUES(overtime_minutes),
            late_night_minutes = VALUES(late_night_minutes),
            status = VALUES(status)
        "#,
    )
    .bind(employee_id)
    .bind(work_date)
    .bind(summary.clock_in)
    .bind(summary.clock_out)
    .bind(summary.break_minutes)
    .bind(summary.actual_work_minutes)
    .bind(summary.overtime_minutes)
    .bind(summary.late_night_minutes)
    .bind(summary.status)
    .execute(&mut *tx)
    .await
    .map_err(db_error("upsert daily attendance"))?;

    tx.commit().await.map_err(db_error("commit punch"))?;

    info!(
        employee_id,
        attendance_type = %record.attendance_type,
        %work_date,
        actual_work_minutes = summary.actual_work_minutes,
        "Punch recorded"
    );

    Ok(HttpResponse::Created().json(PunchResponse {
        record,
        allowed: state.allowed(),
        state,
        summary,
    }))
}

fn calendar(month: &MonthParam, records: &[DailyAttendance]) -> Vec<CalendarDay> {
    month
        .days()
        .map(|date| {
            let weekday = date.weekday();
            CalendarDay {
                date,
                weekday: weekday.to_string(),
                is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
                record: records.iter().find(|r| r.work_date == date).cloned(),
            }
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(MonthQuery),
    responses(
        (status = 200, description = "Daily rows, calendar and totals of one month", body = HistoryResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewHistory)?;

    let month = parse_month_param(query.month.as_deref(), config.work_policy().today());
    if !month.is_valid {
        debug!(raw = ?query.month, "Invalid month parameter, using current month");
    }

    let records = sqlx::query_as::<_, DailyAttendance>(
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
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("fetch attendance history"))?;

    let summary = summarize_month(&records);
    Ok(HttpResponse::Ok().json(HistoryResponse {
        calendar: calendar(&month, &records),
        month,
        total_work: summary.total_work(),
        total_overtime: summary.total_overtime(),
        total_late_night: summary.total_late_night(),
        summary,
        records,
    }))
}
