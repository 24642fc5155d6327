use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    config::Config,
    domain::approval::{RequestSnapshot, authorize_action, authorize_withdrawal},
    error::{AppError, db_error},
    model::{
        approval::{Approval, ApprovalAction},
        request::{LeaveType, Request, RequestStatus, RequestType},
        role::{Capability, Role},
    },
    utils::validation::{ValidationRule, sanitize, validate, validate_optional},
};

const REQUEST_COLUMNS: &str = "id, employee_id, request_type, status, request_date, start_date, \
     end_date, reason, leave_type, target_attendance_id, created_at, updated_at";

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "request_type": "leave",
    "start_date": "2025-04-10",
    "end_date": "2025-04-12",
    "reason": "family event",
    "leave_type": "paid"
}))]
pub struct CreateRequest {
    pub request_type: RequestType,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    /// Defaults to `start_date`.
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
    pub reason: String,
    /// Required for `leave`, ignored otherwise.
    pub leave_type: Option<LeaveType>,
    /// Only kept for `attendance_correction`.
    pub target_attendance_id: Option<u64>,
}

/// Validated insert values.
#[derive(Debug, PartialEq)]
struct NewRequest {
    request_type: RequestType,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    leave_type: Option<LeaveType>,
    target_attendance_id: Option<u64>,
}

impl CreateRequest {
    fn normalize(self) -> Result<NewRequest, AppError> {
        validate(&self.reason, ValidationRule::Reason)?;

        let end_date = self.end_date.unwrap_or(self.start_date);
        if self.start_date > end_date {
            return Err(AppError::validation("終了日は開始日以降を指定してください"));
        }

        let leave_type = match (self.request_type, self.leave_type) {
            (RequestType::Leave, Some(t)) => Some(t),
            (RequestType::Leave, None) => {
                return Err(AppError::validation("休暇種別を選択してください"));
            }
            _ => None,
        };

        let target_attendance_id = match self.request_type {
            RequestType::AttendanceCorrection => self.target_attendance_id,
            _ => None,
        };

        Ok(NewRequest {
            request_type: self.request_type,
            start_date: self.start_date,
            end_date,
            reason: sanitize(&self.reason),
            leave_type,
            target_attendance_id,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApprovalInput {
    pub action: ApprovalAction,
    #[schema(example = "insufficient notice")]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApprovalResult {
    pub approval: Approval,
    pub status: RequestStatus,
}

/// Pending request with its author, as shown in the approval queue.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct PendingRequest {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub employee_number: String,
    pub department_name: Option<String>,
    pub request_type: RequestType,
    pub status: RequestStatus,
    #[schema(value_type = String, format = "date")]
    pub request_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub reason: String,
    pub leave_type: Option<LeaveType>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

async fn fetch_request(
    tx: &mut Transaction<'_, MySql>,
    request_id: u64,
) -> Result<Request, AppError> {
    sqlx::query_as::<_, Request>(&format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?"))
        .bind(request_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error("fetch request"))
}

/// Locks the request row for the rest of the transaction.
async fn lock_request(
    tx: &mut Transaction<'_, MySql>,
    request_id: u64,
) -> Result<RequestSnapshot, AppError> {
    sqlx::query_as::<_, RequestSnapshot>(
        r#"
        SELECT r.status, r.employee_id, e.manager_id
        FROM requests r
        JOIN employees e ON e.id = r.employee_id
        WHERE r.id = ?
        FOR UPDATE
        "#,
    )
    .bind(request_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_error("lock request"))?
    .ok_or_else(|| AppError::not_found("申請が見つかりません"))
}

async fn set_status(
    tx: &mut Transaction<'_, MySql>,
    request_id: u64,
    status: RequestStatus,
) -> Result<(), AppError> {
    sqlx::query("UPDATE requests SET status = ?, updated_at = NOW() WHERE id = ?")
        .bind(status)
        .bind(request_id)
        .execute(&mut **tx)
        .await
        .map_err(db_error("update request status"))?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/requests",
    responses((status = 200, description = "Own requests, newest first", body = [Request])),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn list_own(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::SubmitRequests)?;

    let requests = sqlx::query_as::<_, Request>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE employee_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(auth.employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("list own requests"))?;

    Ok(HttpResponse::Ok().json(requests))
}

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateRequest,
    responses(
        (status = 201, description = "Request submitted as pending", body = Request),
        (status = 400, description = "Invalid request", body = AppError)
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn create(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::SubmitRequests)?;

    let new = payload.into_inner().normalize()?;
    let request_date = config.work_policy().today();

    let mut tx = pool.begin().await.map_err(db_error("begin create request"))?;

    if let Some(target) = new.target_attendance_id {
        let owned = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendance_records WHERE id = ? AND employee_id = ?",
        )
        .bind(target)
        .bind(auth.employee_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("check correction target"))?;
        if owned == 0 {
            return Err(AppError::validation("修正対象の打刻が見つかりません"));
        }
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO requests
            (employee_id, request_type, status, request_date, start_date, end_date,
             reason, leave_type, target_attendance_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.employee_id)
    .bind(new.request_type)
    .bind(RequestStatus::Pending)
    .bind(request_date)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(&new.reason)
    .bind(new.leave_type)
    .bind(new.target_attendance_id)
    .execute(&mut *tx)
    .await
    .map_err(db_error("insert request"))?;

    let request = fetch_request(&mut tx, inserted.last_insert_id()).await?;
    tx.commit().await.map_err(db_error("commit create request"))?;

    info!(
        employee_id = auth.employee_id,
        request_id = request.id,
        request_type = request.request_type.as_ref(),
        "Request submitted"
    );
    Ok(HttpResponse::Created().json(request))
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/withdraw",
    params(("id", Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request withdrawn", body = Request),
        (status = 403, description = "Not the author", body = AppError),
        (status = 404, description = "Unknown request", body = AppError),
        (status = 409, description = "No longer pending", body = AppError)
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn withdraw(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::SubmitRequests)?;
    let request_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(db_error("begin withdraw"))?;
    let snapshot = lock_request(&mut tx, request_id).await?;
    let next = authorize_withdrawal(auth.employee_id, &snapshot)?;
    set_status(&mut tx, request_id, next).await?;
    let request = fetch_request(&mut tx, request_id).await?;
    tx.commit().await.map_err(db_error("commit withdraw"))?;

    info!(employee_id = auth.employee_id, request_id, "Request withdrawn");
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    get,
    path = "/api/requests/approval",
    responses(
        (status = 200, description = "Pending requests the caller may act on, newest first", body = [PendingRequest]),
        (status = 403, description = "Not an approver", body = AppError)
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn approval_queue(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ApproveRequests)?;

    let scope = match auth.role {
        Role::Admin => "",
        _ => "AND e.manager_id = ?",
    };
    let sql = format!(
        r#"
        SELECT r.id, r.employee_id, e.name AS employee_name, e.employee_number,
               d.name AS department_name, r.request_type, r.status, r.request_date,
               r.start_date, r.end_date, r.reason, r.leave_type, r.created_at
        FROM requests r
        JOIN employees e ON e.id = r.employee_id
        LEFT JOIN departments d ON d.id = e.department_id
        WHERE r.status = 'pending' {scope}
        ORDER BY r.created_at DESC, r.id DESC
        "#
    );

    let mut query = sqlx::query_as::<_, PendingRequest>(&sql);
    if auth.role != Role::Admin {
        query = query.bind(auth.employee_id);
    }
    let pending = query
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("list approval queue"))?;

    debug!(approver_id = auth.employee_id, count = pending.len(), "Approval queue loaded");
    Ok(HttpResponse::Ok().json(pending))
}

#[utoipa::path(
    post,
    path = "/api/requests/{id}/approval",
    params(("id", Path, description = "Request ID")),
    request_body = ApprovalInput,
    responses(
        (status = 200, description = "Action recorded", body = ApprovalResult),
        (status = 403, description = "Not allowed to act on this request", body = AppError),
        (status = 404, description = "Unknown request", body = AppError),
        (status = 409, description = "Request already processed", body = AppError)
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn act(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ApprovalInput>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ApproveRequests)?;
    let request_id = path.into_inner();
    let ApprovalInput { action, comment } = payload.into_inner();

    validate_optional(comment.as_deref(), ValidationRule::Comment)?;
    let comment = comment.as_deref().map(sanitize).filter(|c| !c.is_empty());

    let mut tx = pool.begin().await.map_err(db_error("begin approval"))?;

    let snapshot = lock_request(&mut tx, request_id).await?;
    let next = authorize_action(auth.actor(), &snapshot, action)?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO approvals (request_id, approver_id, action, comment, acted_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(request_id)
    .bind(auth.employee_id)
    .bind(action)
    .bind(&comment)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .map_err(db_error("insert approval"))?;

    set_status(&mut tx, request_id, next).await?;

    let approval = sqlx::query_as::<_, Approval>(
        "SELECT id, request_id, approver_id, action, comment, acted_at FROM approvals WHERE id = ?",
    )
    .bind(inserted.last_insert_id())
    .fetch_one(&mut *tx)
    .await
    .map_err(db_error("fetch approval"))?;

    tx.commit().await.map_err(db_error("commit approval"))?;

    info!(
        approver_id = auth.employee_id,
        request_id,
        action = %action,
        status = %next,
        "Approval recorded"
    );
    Ok(HttpResponse::Ok().json(ApprovalResult {
        approval,
        status: next,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leave(leave_type: Option<LeaveType>) -> CreateRequest {
        CreateRequest {
            request_type: RequestType::Leave,
            start_date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 4, 12),
            reason: "family event".to_string(),
            leave_type,
            target_attendance_id: None,
        }
    }

    #[test]
    fn leave_request_keeps_its_leave_type() {
        let new = leave(Some(LeaveType::Paid)).normalize().unwrap();
        assert_eq!(new.leave_type, Some(LeaveType::Paid));
        assert_eq!(new.end_date, NaiveDate::from_ymd_opt(2025, 4, 12).unwrap());
        assert_eq!(new.reason, "family event");
    }

    #[test]
    fn leave_request_requires_a_leave_type() {
        let err = leave(None).normalize().unwrap_err();
        assert_eq!(err.message, "休暇種別を選択してください");
    }

    #[test]
    fn other_types_drop_leave_type_and_default_end_date() {
        let new = CreateRequest {
            request_type: RequestType::Overtime,
            end_date: None,
            target_attendance_id: Some(9),
            ..leave(Some(LeaveType::Sick))
        }
        .normalize()
        .unwrap();
        assert_eq!(new.leave_type, None);
        assert_eq!(new.target_attendance_id, None);
        assert_eq!(new.end_date, new.start_date);
    }

    #[test]
    fn corrections_keep_their_target() {
        let new = CreateRequest {
            request_type: RequestType::AttendanceCorrection,
            target_attendance_id: Some(9),
            ..leave(None)
        }
        .normalize()
        .unwrap();
        assert_eq!(new.target_attendance_id, Some(9));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let req = CreateRequest {
            end_date: NaiveDate::from_ymd_opt(2025, 4, 9),
            ..leave(Some(LeaveType::Paid))
        };
        assert!(req.normalize().is_err());
    }

    #[test]
    fn reason_is_required_and_sanitized() {
        let blank = CreateRequest {
            reason: "  ".to_string(),
            ..leave(Some(LeaveType::Paid))
        };
        assert_eq!(blank.normalize().unwrap_err().message, "必須項目です");

        let markup = CreateRequest {
            reason: "<b>通院</b>".to_string(),
            ..leave(Some(LeaveType::Sick))
        };
        assert_eq!(markup.normalize().unwrap().reason, "&lt;b&gt;通院&lt;&#x2F;b&gt;");
    }
}
