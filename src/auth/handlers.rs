use std::time::Duration;

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument, warn};
use utoipa::IntoParams;

use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, new_csrf_token, verify_token},
        password::verify_password,
    },
    config::Config,
    domain::navigation::{self, RouteDecision},
    error::{AppError, db_error},
    model::{role::Role, user::User},
    models::{Claims, LoginReqDto, LoginResponse, SessionUser, TokenType},
    utils::{
        rate_limiter::{RateLimitConfig, RateLimiter, login_key},
        validation::{ValidationRule, validate},
    },
};

const INVALID_CREDENTIALS: &str = "メールアドレスまたはパスワードが正しくありません";
const INACTIVE_ACCOUNT: &str = "このアカウントは無効になっています";

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn token_error(err: jsonwebtoken::errors::Error) -> AppError {
    error!(error = %err, "Failed to sign token");
    AppError::internal()
}

/// Issues an access/refresh pair for `session` and records the refresh jti.
async fn issue_tokens(
    session: &AuthUser,
    pool: &MySqlPool,
    config: &Config,
) -> Result<LoginResponse, AppError> {
    let access_token = generate_access_token(session, &config.jwt_secret, config.access_token_ttl)
        .map_err(token_error)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(session, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    debug!(user_id = session.user_id, jti = %refresh_claims.jti, "Storing refresh token");
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(session.user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    .map_err(db_error("store refresh token"))?;

    Ok(LoginResponse {
        access_token,
        refresh_token,
        csrf_token: session.csrf.clone(),
        expires_in: config.access_token_ttl,
        user: SessionUser {
            user_id: session.user_id,
            employee_id: session.employee_id,
            email: session.email.clone(),
            role: session.role,
        },
    })
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Malformed email or empty password", body = AppError),
        (status = 401, description = "Invalid credentials or inactive account", body = AppError),
        (status = 429, description = "Too many attempts for this email", body = AppError)
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, limiter, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    let email = user.email.trim().to_lowercase();
    validate(&email, ValidationRule::Email)?;
    if user.password.is_empty() {
        return Err(AppError::validation("パスワードを入力してください"));
    }

    let key = login_key(&email);
    let decision = limiter
        .check(
            &key,
            RateLimitConfig {
                max_attempts: config.login_max_attempts,
                window: Duration::from_secs(config.login_window_secs),
            },
        )
        .await;
    if !decision.allowed {
        warn!(reset_in_ms = decision.reset_in.as_millis() as u64, "Login throttled");
        return Err(AppError::rate_limited(decision.retry_after_secs()));
    }

    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.email, u.password, e.id AS employee_id, e.role, e.is_active
        FROM users u
        JOIN employees e ON e.user_id = u.id
        WHERE u.email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(db_error("fetch login account"))?;

    let Some(db_user) = db_user else {
        info!(remaining = decision.remaining_attempts, "Invalid credentials: unknown email");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, remaining = decision.remaining_attempts, "Invalid credentials: password mismatch");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    if !db_user.is_active {
        info!(employee_id = db_user.employee_id, "Login refused: inactive employee");
        return Err(AppError::unauthorized(INACTIVE_ACCOUNT));
    }

    limiter.reset(&key).await;

    let session = AuthUser {
        user_id: db_user.id,
        email: db_user.email,
        role: db_user.role,
        employee_id: db_user.employee_id,
        csrf: new_csrf_token(),
    };
    let response = issue_tokens(&session, pool.get_ref(), &config).await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(session.user_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(employee_id = session.employee_id, role = %session.role, "Login successful");
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = LoginResponse),
        (status = 401, description = "Missing, revoked or expired refresh token", body = AppError)
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let session_expired = || AppError::unauthorized("セッションの有効期限が切れました。再度ログインしてください");

    let token = bearer_token(&req).ok_or_else(session_expired)?;
    let claims = verify_token(token, &config.jwt_secret).map_err(|e| {
        debug!(error = %e, "Refresh token rejected");
        session_expired()
    })?;
    if claims.token_type != TokenType::Refresh {
        return Err(session_expired());
    }

    // Revoking is the check-and-set: only one caller can rotate a given jti.
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ? AND revoked = FALSE AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await
    .map_err(db_error("revoke refresh token"))?;
    if revoked.rows_affected() == 0 {
        warn!(user_id = claims.user_id, jti = %claims.jti, "Refresh token reuse or unknown jti");
        return Err(session_expired());
    }

    let current = sqlx::query_as::<_, (Role, bool)>(
        "SELECT role, is_active FROM employees WHERE id = ?",
    )
    .bind(claims.employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(db_error("reload session employee"))?;

    let role = match current {
        Some((role, true)) => role,
        _ => return Err(AppError::unauthorized(INACTIVE_ACCOUNT)),
    };

    let session = AuthUser {
        role,
        ..AuthUser::from(claims)
    };
    let response = issue_tokens(&session, pool.get_ref(), &config).await?;

    debug!(employee_id = session.employee_id, "Refresh token rotated");
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Signed out (also when already signed out)")),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let claims = match bearer_token(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RouteQuery {
    /// Client-side path, e.g. `/admin/reports?month=2025-04`.
    pub path: String,
}

/// Session of an optional bearer access token.
fn optional_session(req: &HttpRequest, secret: &str) -> Option<Claims> {
    bearer_token(req)
        .and_then(|t| verify_token(t, secret).ok())
        .filter(|c| c.token_type == TokenType::Access)
}

#[utoipa::path(
    get,
    path = "/auth/route",
    params(RouteQuery),
    responses(
        (status = 200, description = "`{\"decision\":\"allow\"}` or `{\"decision\":\"redirect\",\"to\":...}`")
    ),
    tag = "Auth"
)]
pub async fn check_route(
    req: HttpRequest,
    query: web::Query<RouteQuery>,
    config: web::Data<Config>,
) -> HttpResponse {
    let role = optional_session(&req, &config.jwt_secret).map(|c| c.role);
    let decision = navigation::resolve(&query.path, role);

    if let RouteDecision::Redirect { to } = decision {
        debug!(path = %query.path, to, "Navigation redirected");
    }
    HttpResponse::Ok().json(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use actix_web::{App, test};

    async fn route_decision(path: &str, bearer: Option<String>) -> serde_json::Value {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .route("/auth/route", web::get().to(check_route)),
        )
        .await;
        let mut req = test::TestRequest::get().uri(&format!("/auth/route?path={path}"));
        if let Some(token) = bearer {
            req = req.insert_header(("Authorization", format!("Bearer {token}")));
        }
        test::call_and_read_body_json(&app, req.to_request()).await
    }

    fn employee_token() -> String {
        let user = AuthUser {
            user_id: 1,
            email: "e@example.com".to_string(),
            role: Role::Employee,
            employee_id: 3,
            csrf: "c".to_string(),
        };
        generate_access_token(&user, &test_config().jwt_secret, 60).unwrap()
    }

    #[actix_web::test]
    async fn anonymous_dashboard_redirects_to_login() {
        let json = route_decision("/dashboard", None).await;
        assert_eq!(json, serde_json::json!({"decision": "redirect", "to": "/login"}));
    }

    #[actix_web::test]
    async fn signed_in_login_redirects_to_dashboard() {
        let json = route_decision("/login", Some(employee_token())).await;
        assert_eq!(json["to"], "/dashboard");
    }

    #[actix_web::test]
    async fn employee_is_kept_out_of_admin_pages() {
        let json = route_decision("/admin/employees", Some(employee_token())).await;
        assert_eq!(json["to"], "/dashboard");

        let json = route_decision("/attendance", Some(employee_token())).await;
        assert_eq!(json["decision"], "allow");
    }

    #[actix_web::test]
    async fn logout_without_token_is_still_no_content() {
        let pool = sqlx::mysql::MySqlPoolOptions::new()
            .connect_lazy(&test_config().database_url)
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(pool))
                .route("/auth/logout", web::post().to(logout)),
        )
        .await;
        let res = test::call_service(&app, test::TestRequest::post().uri("/auth/logout").to_request()).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn throttled_login_returns_429_before_touching_the_store() {
        let config = test_config();
        let limiter = RateLimiter::new(100, Duration::from_secs(120));
        let rule = RateLimitConfig {
            max_attempts: config.login_max_attempts,
            window: Duration::from_secs(config.login_window_secs),
        };
        for _ in 0..config.login_max_attempts {
            limiter.check(&login_key("a@example.com"), rule).await;
        }

        // Lazy pool: any query would fail with a connection error, not 429.
        let pool = sqlx::mysql::MySqlPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config))
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(limiter))
                .route("/auth/login", web::post().to(login)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(serde_json::json!({"email": " A@Example.com", "password": "x"}))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), actix_web::http::StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = res
            .headers()
            .get(actix_web::http::header::RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry_after));

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["code"], "RATE_LIMITED");
        assert_eq!(body["reset_in_secs"], retry_after);
    }
}
