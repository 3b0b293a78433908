use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::user::{Backend, BackendError};
use crate::{
    entities::{sea_orm_active_enums::Role, user},
    error::ApiError,
    router::AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub role: Role,
    pub exp: usize,
}

/// HS256 signing material for bearer tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &user::Model) -> Result<String, BackendError> {
        let exp = (Utc::now() + self.ttl).timestamp() as usize;
        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(BackendError::Token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, BackendError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(BackendError::Token)
    }
}

/// The authenticated account behind a request's bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already resolved by the capability guard.
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::Unauthorized("Not authorized to access this route".into()))?;

        let claims = state.keys.verify(bearer.token())?;
        let user = Backend::new(state.db.clone()).get_user(claims.sub).await?;

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn user(id: i32, role: Role) -> user::Model {
        let now: NaiveDateTime = Utc::now().naive_utc();
        user::Model {
            id,
            email: "test@example.com".into(),
            password_hash: String::new(),
            first_name: "Test".into(),
            last_name: "User".into(),
            role,
            phone: None,
            address: None,
            is_verified: true,
            verification_token: None,
            reset_password_token: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let keys = TokenKeys::new("secret", 1);
        let token = keys.issue(&user(42, Role::OrphanageManager)).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::OrphanageManager);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenKeys::new("secret", 1).issue(&user(1, Role::Donor)).unwrap();
        assert!(TokenKeys::new("other", 1).verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new("secret", -2);
        let token = keys.issue(&user(1, Role::Donor)).unwrap();
        assert!(keys.verify(&token).is_err());
    }
}
