use crate::api::{
    attendance::{CalendarDay, HistoryResponse, PunchRequest, PunchResponse, TodayAttendance},
    audit_log::AuditLogPage,
    dashboard::Dashboard,
    department::DepartmentInput,
    employee::{CreateEmployee, CreatedEmployee, EmployeeListResponse},
    navigation::Navigation,
    reports::MonthlyReport,
    requests::{ApprovalInput, ApprovalResult, CreateRequest, PendingRequest},
};
use crate::domain::{
    aggregation::{DaySummary, DepartmentSummary, MonthlySummary, OvertimeAlert},
    navigation::Page,
    punch::PunchState,
};
use crate::error::{AppError, AppErrorCode, Severity};
use crate::model::{
    approval::{Approval, ApprovalAction},
    attendance::{AttendanceRecord, AttendanceType, DailyAttendance, DayStatus},
    audit_log::AuditLog,
    department::Department,
    employee::{Employee, EmploymentType},
    leave_balance::LeaveBalance,
    request::{LeaveType, Request, RequestStatus, RequestType},
    role::{Capability, Role},
};
use crate::models::{LoginReqDto, LoginResponse, SessionUser};
use crate::utils::month::MonthParam;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kintai API",
        version = "0.1.0",
        description = r#"
## Attendance & Leave Management

Backend for a small-company attendance system: employees punch in and out,
review their monthly history and file leave / correction requests;
managers approve their direct reports' requests; admins maintain the
organization and read monthly reports.

### 🔐 Security
- `POST /auth/login` returns a bearer access token, a refresh token and a
  per-session CSRF token.
- Every `/api` route requires `Authorization: Bearer <access_token>`.
- `POST`, `PUT`, `PATCH` and `DELETE` additionally require `X-CSRF-Token`.
- Failed logins are throttled per e-mail address (429 with `reset_in_secs`).

### 🕘 Time
Work dates, the night window and "today" are evaluated in the configured
work-time offset (JST by default). Durations are minutes; `H:MM`
renderings accompany totals.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::check_route,

        crate::api::dashboard::dashboard,
        crate::api::navigation::navigation,

        crate::api::attendance::today,
        crate::api::attendance::punch,
        crate::api::attendance::history,

        crate::api::requests::list_own,
        crate::api::requests::create,
        crate::api::requests::withdraw,
        crate::api::requests::approval_queue,
        crate::api::requests::act,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::create_employee,
        crate::api::employee::update_employee,
        crate::api::employee::deactivate_employee,

        crate::api::department::list_departments,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::reports::monthly_report,
        crate::api::audit_log::list_audit_logs
    ),
    components(
        schemas(
            AppError,
            AppErrorCode,
            Severity,
            LoginReqDto,
            LoginResponse,
            SessionUser,
            Role,
            Capability,
            Page,
            Navigation,
            Dashboard,
            MonthParam,
            PunchRequest,
            PunchResponse,
            PunchState,
            TodayAttendance,
            CalendarDay,
            HistoryResponse,
            AttendanceType,
            AttendanceRecord,
            DayStatus,
            DailyAttendance,
            DaySummary,
            MonthlySummary,
            RequestType,
            RequestStatus,
            LeaveType,
            Request,
            CreateRequest,
            ApprovalAction,
            Approval,
            ApprovalInput,
            ApprovalResult,
            PendingRequest,
            LeaveBalance,
            EmploymentType,
            Employee,
            CreateEmployee,
            CreatedEmployee,
            EmployeeListResponse,
            Department,
            DepartmentInput,
            DepartmentSummary,
            OvertimeAlert,
            MonthlyReport,
            AuditLog,
            AuditLogPage
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Session issuance, rotation and route guard"),
        (name = "Dashboard", description = "Personal overview"),
        (name = "Navigation", description = "Role-based menu"),
        (name = "Attendance", description = "Punching and monthly history"),
        (name = "Requests", description = "Leave / correction requests and approvals"),
        (name = "Employee", description = "Employee administration"),
        (name = "Department", description = "Department administration"),
        (name = "Reports", description = "Monthly organization reports"),
        (name = "Audit", description = "Audit log listing"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_routes_with_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/attendance/punch"));
        assert!(doc.paths.paths.contains_key("/api/requests/{id}/approval"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
