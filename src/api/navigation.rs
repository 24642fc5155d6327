use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::auth::AuthUser,
    domain::navigation::{Page, menu_for},
    model::role::{Capability, Role},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct Navigation {
    pub role: Role,
    pub capabilities: Vec<Capability>,
    /// Sidebar entries in display order.
    pub menu: Vec<Page>,
}

impl Navigation {
    pub fn for_role(role: Role) -> Self {
        Self {
            role,
            capabilities: role.capabilities().to_vec(),
            menu: menu_for(role),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/navigation",
    responses((status = 200, description = "Menu and capabilities of the caller's role", body = Navigation)),
    tag = "Navigation",
    security(("bearer_auth" = []))
)]
pub async fn navigation(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(Navigation::for_role(auth.role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpMessage, test};

    #[actix_web::test]
    async fn employee_menu_hides_admin_pages() {
        let app = test::init_service(App::new().route(
            "/navigation",
            web::get().to(navigation),
        ))
        .await;

        let req = test::TestRequest::get().uri("/navigation").to_request();
        req.extensions_mut().insert(AuthUser {
            user_id: 1,
            email: "staff@example.com".to_string(),
            role: Role::Employee,
            employee_id: 10,
            csrf: "csrf".to_string(),
        });
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["role"], "employee");
        let paths: Vec<&str> = body["menu"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["path"].as_str().unwrap())
            .collect();
        assert!(paths.contains(&"/attendance"));
        assert!(!paths.iter().any(|p| p.starts_with("/admin")));
    }

    #[actix_web::test]
    async fn admin_sees_every_capability() {
        let nav = Navigation::for_role(Role::Admin);
        assert!(nav.capabilities.contains(&Capability::ViewAuditLog));
        assert!(nav.menu.iter().any(|p| p.path == "/admin/reports"));
    }
}
