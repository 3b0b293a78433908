use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{TimeDelta, Utc};
use sea_orm::{ActiveValue::*, IntoActiveModel, prelude::*};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::entities::{sea_orm_active_enums::Role, user};

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailsUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Seaorm(sea_orm::DbErr),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please verify your email before logging in")]
    UnverifiedEmail,

    #[error("User not found")]
    UnknownUser,

    #[error(transparent)]
    Token(jsonwebtoken::errors::Error),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Outcome of [`Backend::register`] and [`Backend::forgot_password`]:
/// the affected account and the one-time token to email to it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub user: user::Model,
    pub token: String,
}

pub const MIN_PASSWORD_LEN: usize = 6;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Clone)]
pub struct Backend {
    db: DatabaseConnection,
}

impl Backend {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn authenticate(&self, creds: Credentials) -> Result<user::Model, BackendError> {
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(&creds.email)))
            .one(&self.db)
            .await
            .map_err(BackendError::Seaorm)?
            .ok_or(BackendError::InvalidCredentials)?;

        if !verify_password(&creds.password, &user.password_hash) {
            return Err(BackendError::InvalidCredentials);
        }

        if !user.is_verified {
            return Err(BackendError::UnverifiedEmail);
        }

        Ok(user)
    }

    pub async fn get_user(&self, user_id: i32) -> Result<user::Model, BackendError> {
        user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(BackendError::Seaorm)?
            .ok_or(BackendError::UnknownUser)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, BackendError> {
        user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await
            .map_err(BackendError::Seaorm)
    }

    /// Creates an unverified account and returns its email verification token.
    pub async fn register(&self, reg: Registration) -> Result<IssuedToken, BackendError> {
        let token = new_token();
        let now = Utc::now().naive_utc();
        let user = user::ActiveModel {
            id: NotSet,
            email: Set(normalize_email(&reg.email)),
            password_hash: Set(hash_password(&reg.password)?),
            first_name: Set(reg.first_name.trim().to_string()),
            last_name: Set(reg.last_name.trim().to_string()),
            role: Set(reg.role.unwrap_or(Role::Donor)),
            phone: Set(reg.phone),
            address: Set(reg.address),
            is_verified: Set(false),
            verification_token: Set(Some(token.clone())),
            reset_password_token: Set(None),
            reset_password_expires: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        debug!("Creating new user: {}", reg.email);
        let user = user.insert(&self.db).await.map_err(BackendError::Seaorm)?;

        Ok(IssuedToken { user, token })
    }

    pub async fn verify_email(&self, token: &str) -> Result<user::Model, BackendError> {
        let user = user::Entity::find()
            .filter(user::Column::VerificationToken.eq(token))
            .one(&self.db)
            .await
            .map_err(BackendError::Seaorm)?
            .ok_or(BackendError::InvalidCredentials)?;

        let mut user = user.into_active_model();
        user.is_verified = Set(true);
        user.verification_token = Set(None);
        user.updated_at = Set(Utc::now().naive_utc());
        user.update(&self.db).await.map_err(BackendError::Seaorm)
    }

    /// Issues a one-hour reset token, or `None` when no account has that email.
    pub async fn forgot_password(&self, email: &str) -> Result<Option<IssuedToken>, BackendError> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };

        let token = new_token();
        let mut user = user.into_active_model();
        user.reset_password_token = Set(Some(token.clone()));
        let expires = Utc::now().naive_utc() + TimeDelta::hours(RESET_TOKEN_TTL_HOURS);
        user.reset_password_expires = Set(Some(expires));
        user.updated_at = Set(Utc::now().naive_utc());
        let user = user.update(&self.db).await.map_err(BackendError::Seaorm)?;

        Ok(Some(IssuedToken { user, token }))
    }

    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<user::Model, BackendError> {
        let now = Utc::now().naive_utc();
        let user = user::Entity::find()
            .filter(user::Column::ResetPasswordToken.eq(token))
            .filter(user::Column::ResetPasswordExpires.gt(now))
            .one(&self.db)
            .await
            .map_err(BackendError::Seaorm)?
            .ok_or(BackendError::InvalidCredentials)?;

        let mut user = user.into_active_model();
        user.password_hash = Set(hash_password(password)?);
        user.reset_password_token = Set(None);
        user.reset_password_expires = Set(None);
        user.updated_at = Set(now);
        user.update(&self.db).await.map_err(BackendError::Seaorm)
    }

    pub async fn update_details(
        &self,
        user: user::Model,
        details: DetailsUpdate,
    ) -> Result<user::Model, BackendError> {
        let mut user = user.into_active_model();
        if let Some(first_name) = details.first_name {
            user.first_name = Set(first_name);
        }
        if let Some(last_name) = details.last_name {
            user.last_name = Set(last_name);
        }
        if let Some(email) = details.email {
            user.email = Set(normalize_email(&email));
        }
        if details.phone.is_some() {
            user.phone = Set(details.phone);
        }
        if details.address.is_some() {
            user.address = Set(details.address);
        }
        user.updated_at = Set(Utc::now().naive_utc());
        user.update(&self.db).await.map_err(BackendError::Seaorm)
    }

    pub async fn update_password(
        &self,
        user: user::Model,
        change: PasswordChange,
    ) -> Result<user::Model, BackendError> {
        if !verify_password(&change.current_password, &user.password_hash) {
            return Err(BackendError::InvalidCredentials);
        }

        let mut user = user.into_active_model();
        user.password_hash = Set(hash_password(&change.new_password)?);
        user.updated_at = Set(Utc::now().naive_utc());
        user.update(&self.db).await.map_err(BackendError::Seaorm)
    }
}

pub fn hash_password(password: &str) -> Result<String, BackendError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BackendError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
