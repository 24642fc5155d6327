use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::{
    auth::auth::AuthUser,
    models::{Claims, TokenType},
};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn claims_for(user: &AuthUser, token_type: TokenType, ttl: usize) -> Claims {
    Claims {
        user_id: user.user_id,
        sub: user.email.clone(),
        role: user.role,
        employee_id: user.employee_id,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        csrf: user.csrf.clone(),
    }
}

fn sign(claims: &Claims, secret: &str) -> Result<String, Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn generate_access_token(user: &AuthUser, secret: &str, ttl: usize) -> Result<String, Error> {
    sign(&claims_for(user, TokenType::Access, ttl), secret)
}

pub fn generate_refresh_token(
    user: &AuthUser,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = claims_for(user, TokenType::Refresh, ttl);
    let token = sign(&claims, secret)?;
    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// New per-session anti-forgery token.
pub fn new_csrf_token() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn user() -> AuthUser {
        AuthUser {
            user_id: 40,
            email: "taro.yamada@example.com".to_string(),
            role: Role::Manager,
            employee_id: 12,
            csrf: "csrf-1".to_string(),
        }
    }

    #[test]
    fn access_token_round_trips_the_session() {
        let token = generate_access_token(&user(), "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(AuthUser::from(claims), user());
    }

    #[test]
    fn refresh_tokens_share_the_csrf_token_but_not_the_jti() {
        let (token, claims) = generate_refresh_token(&user(), "secret", 60).unwrap();
        let (_, other) = generate_refresh_token(&user(), "secret", 60).unwrap();

        assert_eq!(verify_token(&token, "secret").unwrap().csrf, "csrf-1");
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_ne!(claims.jti, other.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&user(), "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
