use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "taro.yamada@example.com")]
    pub email: String,
    pub password: String,
}

/// Signed-in user as returned to the client.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionUser {
    pub user_id: u64,
    pub employee_id: u64,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Echo in `X-CSRF-Token` on every state-changing request.
    pub csrf_token: String,
    pub expires_in: usize,
    pub user: SessionUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Login email.
    pub sub: String,
    pub role: Role,
    pub employee_id: u64,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
    /// Per-session anti-forgery token, shared by the access and refresh tokens.
    pub csrf: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}
