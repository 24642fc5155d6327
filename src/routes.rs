use crate::{
    api::{attendance, audit_log, dashboard, department, employee, navigation, reports, requests},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Context, Result};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = 60_000 / u64::from(requests_per_min);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limit configuration")?;
    Ok(Governor::new(&cfg))
}

/// Per-IP limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    refresh: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    protected: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            refresh: Arc::new(build_limiter(config.rate_refresh_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            )
            .service(web::resource("/route").route(web::get().to(handlers::check_route))),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(limiters.protected.clone())
            .service(web::resource("/dashboard").route(web::get().to(dashboard::dashboard)))
            .service(web::resource("/navigation").route(web::get().to(navigation::navigation)))
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::today)))
                    // /attendance/punch
                    .service(web::resource("/punch").route(web::post().to(attendance::punch)))
                    // /attendance/history
                    .service(web::resource("/history").route(web::get().to(attendance::history))),
            )
            .service(
                web::scope("/requests")
                    // /requests
                    .service(
                        web::resource("")
                            .route(web::get().to(requests::list_own))
                            .route(web::post().to(requests::create)),
                    )
                    // /requests/approval
                    .service(
                        web::resource("/approval").route(web::get().to(requests::approval_queue)),
                    )
                    // /requests/{id}/withdraw
                    .service(
                        web::resource("/{id}/withdraw").route(web::post().to(requests::withdraw)),
                    )
                    // /requests/{id}/approval
                    .service(web::resource("/{id}/approval").route(web::post().to(requests::act))),
            )
            .service(
                web::scope("/admin")
                    // /admin/employees
                    .service(
                        web::resource("/employees")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /admin/employees/{id}
                    .service(
                        web::resource("/employees/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::deactivate_employee)),
                    )
                    // /admin/departments
                    .service(
                        web::resource("/departments")
                            .route(web::get().to(department::list_departments))
                            .route(web::post().to(department::create_department)),
                    )
                    // /admin/departments/{id}
                    .service(
                        web::resource("/departments/{id}")
                            .route(web::put().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    )
                    .service(web::resource("/reports").route(web::get().to(reports::monthly_report)))
                    .service(
                        web::resource("/audit-logs")
                            .route(web::get().to(audit_log::list_audit_logs)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min) + csrf claim
//  └─ refresh_token (7 days)

// API REQUEST
//  ├─ Authorization: Bearer access_token
//  └─ X-CSRF-Token on POST/PUT/PATCH/DELETE

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns rotated access + refresh tokens
