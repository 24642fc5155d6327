use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::Method,
    middleware::Next,
    web::Data,
};

use crate::{
    auth::{auth::AuthUser, jwt::verify_token},
    config::Config,
    error::{AppError, AppErrorCode},
    models::TokenType,
};

pub const CSRF_HEADER: &str = "X-CSRF-Token";

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn reject(req: ServiceRequest, err: AppError) -> ServiceResponse<BoxBody> {
    req.into_response(err.error_response())
}

/// Authenticates the bearer access token and, for state-changing methods,
/// checks the session's anti-forgery token.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let Some(config) = req.app_data::<Data<Config>>().cloned() else {
        tracing::error!("Config missing from app data");
        return Ok(reject(req, AppError::internal()));
    };

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_owned);
    let Some(token) = token else {
        return Ok(reject(req, AppError::unauthorized("ログインしてください")));
    };

    let claims = match verify_token(&token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Access => c,
        Ok(_) => {
            return Ok(reject(req, AppError::unauthorized("アクセストークンではありません")));
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return Ok(reject(req, AppError::new(AppErrorCode::AuthError)));
        }
    };

    if is_state_changing(req.method()) {
        let presented = req.headers().get(CSRF_HEADER).and_then(|h| h.to_str().ok());
        if presented != Some(claims.csrf.as_str()) {
            tracing::info!(
                employee_id = claims.employee_id,
                path = req.path(),
                "CSRF token missing or mismatched"
            );
            return Ok(reject(
                req,
                AppError::forbidden().with_message("不正なリクエストです。ページを再読み込みしてください"),
            ));
        }
    }

    req.extensions_mut().insert(AuthUser::from(claims));

    next.call(req).await
}
