use actix_web::{
    HttpResponse, ResponseError,
    http::{StatusCode, header},
};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::Serialize;
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::{
    domain::{approval::TransitionError, punch::PunchError},
    utils::validation::{FieldErrors, ValidationError},
};

/// Application error taxonomy shown to users.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, EnumString, strum::Display, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AppErrorCode {
    AuthError,
    ValidationError,
    NetworkError,
    DatabaseError,
    PermissionError,
    NotFound,
    RateLimited,
    UnknownError,
}

impl AppErrorCode {
    pub fn message(self) -> &'static str {
        match self {
            AppErrorCode::AuthError => "認証エラーが発生しました。再度ログインしてください",
            AppErrorCode::ValidationError => "入力内容に誤りがあります",
            AppErrorCode::NetworkError => {
                "ネットワークエラーが発生しました。接続を確認してください"
            }
            AppErrorCode::DatabaseError => {
                "データベースエラーが発生しました。しばらく待ってから再試行してください"
            }
            AppErrorCode::PermissionError => "この操作を行う権限がありません",
            AppErrorCode::NotFound => "指定されたデータが見つかりません",
            AppErrorCode::RateLimited => {
                "リクエストが多すぎます。しばらく待ってから再試行してください"
            }
            AppErrorCode::UnknownError => "予期しないエラーが発生しました",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            AppErrorCode::AuthError => StatusCode::UNAUTHORIZED,
            AppErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            AppErrorCode::NetworkError => StatusCode::SERVICE_UNAVAILABLE,
            AppErrorCode::PermissionError => StatusCode::FORBIDDEN,
            AppErrorCode::NotFound => StatusCode::NOT_FOUND,
            AppErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppErrorCode::DatabaseError | AppErrorCode::UnknownError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Validation problems and missing data are shown as warnings, not failures.
    pub fn severity(self) -> Severity {
        match self {
            AppErrorCode::ValidationError | AppErrorCode::NotFound => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// First-match classification of a backend failure.
    ///
    /// `None` means the failure carried no recognizable shape at all.
    pub fn classify(signal: Option<&ErrorSignal>) -> Self {
        let Some(err) = signal else {
            return AppErrorCode::UnknownError;
        };
        let code = err.code.as_deref().unwrap_or_default();
        let message = err.message.as_deref().unwrap_or_default();

        if code.contains("auth") || code == "28000" || err.status == Some(401) {
            return AppErrorCode::AuthError;
        }
        if err.status == Some(403) || code == "PGRST301" {
            return AppErrorCode::PermissionError;
        }
        if err.status == Some(404) || code == "PGRST116" {
            return AppErrorCode::NotFound;
        }
        if err.status == Some(429) {
            return AppErrorCode::RateLimited;
        }
        if VALIDATION_CODES.contains(&code) {
            return AppErrorCode::ValidationError;
        }
        if message.contains("network") || message.contains("fetch") {
            return AppErrorCode::NetworkError;
        }
        AppErrorCode::DatabaseError
    }
}

/// How a client should present the error toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Constraint-violation and bad-input codes (PostgreSQL and MySQL SQLSTATE).
const VALIDATION_CODES: [&str; 6] = ["23505", "23503", "22P02", "23000", "22001", "22007"];

/// Low-level signals reported by a backend failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSignal {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Display, Serialize, ToSchema)]
#[display(fmt = "[{}] {}", code, message)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub severity: Severity,
    #[serde(skip)]
    pub details: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_in_secs: Option<u64>,
    /// Per-field messages for form errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
    #[serde(skip)]
    status: StatusCode,
}

impl AppError {
    pub fn new(code: AppErrorCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
            severity: code.severity(),
            details: None,
            timestamp: Utc::now(),
            reset_in_secs: None,
            fields: None,
            status: code.status(),
        }
    }

    /// Replaces the canned message with a field-specific one.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(AppErrorCode::ValidationError).with_message(message)
    }

    /// Validation failure carrying every failing field; the first message leads.
    pub fn invalid_fields(fields: FieldErrors) -> Self {
        let mut err = match fields.values().next() {
            Some(first) => Self::validation(first.clone()),
            None => Self::new(AppErrorCode::ValidationError),
        };
        err.fields = Some(fields);
        err
    }

    pub fn forbidden() -> Self {
        Self::new(AppErrorCode::PermissionError)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AppErrorCode::NotFound).with_message(message)
    }

    /// A write lost against the current stored state.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::validation(message).with_status(StatusCode::CONFLICT)
    }

    pub fn rate_limited(reset_in_secs: u64) -> Self {
        let mut err = Self::new(AppErrorCode::RateLimited);
        err.reset_in_secs = Some(reset_in_secs);
        err
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(AppErrorCode::AuthError).with_message(message)
    }

    pub fn internal() -> Self {
        Self::new(AppErrorCode::UnknownError)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        let mut res = HttpResponse::build(self.status);
        if let Some(secs) = self.reset_in_secs {
            res.insert_header((header::RETRY_AFTER, secs.to_string()));
        }
        res.json(self)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.message)
    }
}

impl From<PunchError> for AppError {
    fn from(err: PunchError) -> Self {
        AppError::conflict(err.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotPending(_) => AppError::conflict(err.to_string()),
            TransitionError::NotAnApprover
            | TransitionError::NotSubordinate
            | TransitionError::NotOwner => AppError::forbidden().with_message(err.to_string()),
        }
    }
}

fn signal_of(err: &sqlx::Error) -> Option<ErrorSignal> {
    match err {
        sqlx::Error::RowNotFound => Some(ErrorSignal {
            status: Some(404),
            ..Default::default()
        }),
        sqlx::Error::Database(db_err) => Some(ErrorSignal {
            status: None,
            code: db_err.code().map(|c| c.into_owned()),
            message: Some(db_err.message().to_string()),
        }),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => Some(ErrorSignal {
            message: Some("network failure talking to the store".to_string()),
            ..Default::default()
        }),
        sqlx::Error::Configuration(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_) => Some(ErrorSignal::default()),
        _ => None,
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let code = AppErrorCode::classify(signal_of(&err).as_ref());
        AppError::new(code).with_details(err.to_string())
    }
}

/// Logs a store failure with its call-site context and classifies it.
pub fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| {
        let app_err = AppError::from(err);
        tracing::error!(
            code = %app_err.code,
            details = ?app_err.details,
            context,
            "Store operation failed"
        );
        app_err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(status: Option<u16>, code: Option<&str>, message: Option<&str>) -> ErrorSignal {
        ErrorSignal {
            status,
            code: code.map(str::to_string),
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn missing_shape_is_unknown() {
        assert_eq!(AppErrorCode::classify(None), AppErrorCode::UnknownError);
    }

    #[test]
    fn empty_shape_falls_back_to_database() {
        let empty = ErrorSignal::default();
        assert_eq!(
            AppErrorCode::classify(Some(&empty)),
            AppErrorCode::DatabaseError
        );
    }

    #[test]
    fn auth_wins_over_everything_else() {
        let s = signal(Some(401), Some("23505"), Some("network down"));
        assert_eq!(AppErrorCode::classify(Some(&s)), AppErrorCode::AuthError);

        let s = signal(None, Some("invalid_auth_session"), None);
        assert_eq!(AppErrorCode::classify(Some(&s)), AppErrorCode::AuthError);
    }

    #[test]
    fn status_and_code_mapping() {
        let cases = [
            (signal(Some(403), None, None), AppErrorCode::PermissionError),
            (signal(None, Some("PGRST301"), None), AppErrorCode::PermissionError),
            (signal(Some(404), None, None), AppErrorCode::NotFound),
            (signal(None, Some("PGRST116"), None), AppErrorCode::NotFound),
            (signal(Some(429), None, None), AppErrorCode::RateLimited),
            (signal(None, Some("23505"), None), AppErrorCode::ValidationError),
            (signal(None, Some("23000"), None), AppErrorCode::ValidationError),
            (signal(None, Some("22P02"), None), AppErrorCode::ValidationError),
            (
                signal(None, None, Some("TypeError: failed to fetch")),
                AppErrorCode::NetworkError,
            ),
            (signal(Some(500), Some("XX000"), None), AppErrorCode::DatabaseError),
        ];

        for (s, expected) in cases {
            assert_eq!(AppErrorCode::classify(Some(&s)), expected, "{s:?}");
        }
    }

    #[test]
    fn permission_checked_before_not_found() {
        let s = signal(Some(403), Some("PGRST116"), None);
        assert_eq!(
            AppErrorCode::classify(Some(&s)),
            AppErrorCode::PermissionError
        );
    }

    #[test]
    fn codes_render_in_screaming_snake_case() {
        assert_eq!(AppErrorCode::RateLimited.to_string(), "RATE_LIMITED");
        assert_eq!(AppErrorCode::NotFound.as_ref(), "NOT_FOUND");
        assert_eq!(
            serde_json::to_value(AppErrorCode::UnknownError).unwrap(),
            serde_json::json!("UNKNOWN_ERROR")
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.code, AppErrorCode::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn pool_timeout_is_a_network_error() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.code, AppErrorCode::NetworkError);
    }

    #[test]
    fn conflict_keeps_validation_code_with_409() {
        let err = AppError::conflict("already processed");
        assert_eq!(err.code, AppErrorCode::ValidationError);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.message, "already processed");
    }

    #[test]
    fn field_errors_lead_with_the_first_message() {
        let mut fields = FieldErrors::new();
        fields.insert("email".to_string(), "有効なメールアドレスを入力してください".to_string());
        fields.insert("name".to_string(), "必須項目です".to_string());
        let err = AppError::invalid_fields(fields);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "有効なメールアドレスを入力してください");

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["fields"]["name"], "必須項目です");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn transition_errors_map_to_conflict_or_forbidden() {
        use crate::model::request::RequestStatus;

        let err = AppError::from(TransitionError::NotPending(RequestStatus::Approved));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        let err = AppError::from(TransitionError::NotSubordinate);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.code, AppErrorCode::PermissionError);
    }

    #[test]
    fn out_of_sequence_punch_is_a_conflict() {
        let err = AppError::from(PunchError::OnBreak);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.message, PunchError::OnBreak.to_string());
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let res = AppError::rate_limited(42).error_response();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn warnings_are_validation_and_not_found() {
        assert_eq!(AppErrorCode::ValidationError.severity(), Severity::Warning);
        assert_eq!(AppErrorCode::NotFound.severity(), Severity::Warning);
        assert_eq!(AppErrorCode::DatabaseError.severity(), Severity::Error);
    }

    #[test]
    fn body_carries_severity_for_the_toast() {
        let warning = serde_json::to_value(AppError::not_found("社員が見つかりません")).unwrap();
        assert_eq!(warning["severity"], "warning");
        assert_eq!(warning["code"], "NOT_FOUND");

        let failure = serde_json::to_value(AppError::internal()).unwrap();
        assert_eq!(failure["severity"], "error");
        assert!(failure.get("details").is_none());
    }
}
