use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::{
    domain::approval::Actor,
    error::AppError,
    model::role::{Capability, Role},
    models::Claims,
};

/// The authenticated session, placed in request extensions by
/// [`auth_middleware`](crate::auth::middleware::auth_middleware).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
    pub employee_id: u64,
    pub csrf: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.sub,
            role: claims.role,
            employee_id: claims.employee_id,
            csrf: claims.csrf,
        }
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AppError::unauthorized("ログインしてください")),
        )
    }
}

impl AuthUser {
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.can(capability) {
            Ok(())
        } else {
            tracing::info!(
                employee_id = self.employee_id,
                role = %self.role,
                ?capability,
                "Capability denied"
            );
            Err(AppError::forbidden())
        }
    }

    pub fn actor(&self) -> Actor {
        Actor {
            employee_id: self.employee_id,
            role: self.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn employee() -> AuthUser {
        AuthUser {
            user_id: 1,
            email: "e@example.com".to_string(),
            role: Role::Employee,
            employee_id: 7,
            csrf: "t".to_string(),
        }
    }

    #[test]
    fn require_follows_the_capability_table() {
        let user = employee();
        assert!(user.require(Capability::Punch).is_ok());
        let err = user.require(Capability::ApproveRequests).unwrap_err();
        assert_eq!(err.code, crate::error::AppErrorCode::PermissionError);
    }

    #[actix_web::test]
    async fn extractor_reads_the_session_from_extensions() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(employee());

        let user = AuthUser::extract(&req).await.unwrap();
        assert_eq!(user.employee_id, 7);
        assert_eq!(user.actor().role, Role::Employee);
    }

    #[actix_web::test]
    async fn extractor_without_session_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        let err = AuthUser::extract(&req).await.unwrap_err();
        assert_eq!(err.code, crate::error::AppErrorCode::AuthError);
    }
}
