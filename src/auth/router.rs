use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;

use super::{
    CurrentUser,
    user::{
        Backend, BackendError, Credentials, DetailsUpdate, MIN_PASSWORD_LEN, PasswordChange,
        Registration,
    },
};
use crate::{
    entities::sea_orm_active_enums::Role,
    error::{ApiError, ApiResult},
    response::ApiResponse,
    router::AppState,
};

const SELF_SERVICE_ROLES: [Role; 3] = [Role::Donor, Role::Volunteer, Role::OrphanageManager];

#[derive(Debug, Deserialize)]
pub struct NewPassword {
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPassword {
    email: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(self::post::register))
        .route("/login", post(self::post::login))
        .route("/forgot-password", post(self::post::forgot_password))
        .route("/verify-email/{token}", get(self::get::verify_email))
        .route("/me", get(self::get::me))
        .route("/logout", get(self::get::logout))
        .route("/reset-password/{token}", put(self::put::reset_password))
        .route("/update-details", put(self::put::update_details))
        .route("/update-password", put(self::put::update_password))
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

mod post {
    use super::*;

    pub async fn register(
        State(state): State<AppState>,
        Json(reg): Json<Registration>,
    ) -> ApiResult<ApiResponse<serde_json::Value>> {
        if reg.email.trim().is_empty()
            || !reg.email.contains('@')
            || reg.first_name.trim().is_empty()
            || reg.last_name.trim().is_empty()
        {
            return Err(ApiError::validation(
                "Please provide a valid email, first name and last name",
            ));
        }
        validate_password(&reg.password)?;
        if let Some(role) = reg.role {
            if !SELF_SERVICE_ROLES.contains(&role) {
                return Err(ApiError::validation(
                    "Role must be one of: donor, volunteer, orphanage_manager",
                ));
            }
        }

        let backend = Backend::new(state.db.clone());
        if backend.find_by_email(&reg.email).await?.is_some() {
            return Err(ApiError::Conflict("Email already registered".into()));
        }

        let issued = backend.register(reg).await?;
        let link = format!(
            "{}/api/v1/auth/verify-email/{}",
            state.notifier.base_url(),
            issued.token
        );
        state.notifier.email(
            issued.user.email.clone(),
            "Verify your HopeConnect account",
            "verify_email.html",
            minijinja::context! { name => issued.user.first_name.clone(), link => link },
        );

        let token = state.keys.issue(&issued.user)?;
        Ok(
            ApiResponse::created(json!({ "token": token, "user": issued.user }))
                .with_message("User registered successfully. Please verify your email."),
        )
    }

    pub async fn login(
        State(state): State<AppState>,
        Json(creds): Json<Credentials>,
    ) -> ApiResult<ApiResponse<serde_json::Value>> {
        if creds.email.trim().is_empty() || creds.password.is_empty() {
            return Err(ApiError::validation("Please provide email and password"));
        }

        let user = Backend::new(state.db.clone()).authenticate(creds).await?;
        let token = state.keys.issue(&user)?;
        tracing::info!(user_id = user.id, "user logged in");

        Ok(ApiResponse::ok(json!({ "token": token, "user": user })))
    }

    pub async fn forgot_password(
        State(state): State<AppState>,
        Json(ForgotPassword { email }): Json<ForgotPassword>,
    ) -> ApiResult<ApiResponse<()>> {
        let issued = Backend::new(state.db.clone())
            .forgot_password(&email)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;

        let link = format!(
            "{}/api/v1/auth/reset-password/{}",
            state.notifier.base_url(),
            issued.token
        );
        state.notifier.email(
            issued.user.email.clone(),
            "Password reset",
            "reset_password.html",
            minijinja::context! { name => issued.user.first_name.clone(), link => link },
        );

        Ok(ApiResponse::message("Password reset email sent"))
    }
}

mod get {
    use super::*;

    pub async fn verify_email(
        State(state): State<AppState>,
        Path(token): Path<String>,
    ) -> ApiResult<ApiResponse<()>> {
        Backend::new(state.db.clone())
            .verify_email(&token)
            .await
            .map_err(|e| match e {
                BackendError::InvalidCredentials => {
                    ApiError::validation("Invalid verification token")
                }
                e => e.into(),
            })?;

        Ok(ApiResponse::message(
            "Email verified successfully. You can now log in.",
        ))
    }

    pub async fn me(user: CurrentUser) -> ApiResponse<crate::entities::user::Model> {
        ApiResponse::ok(user.0)
    }

    pub async fn logout(_user: CurrentUser) -> ApiResponse<()> {
        // Tokens are stateless; the client discards its copy.
        ApiResponse::message("Logged out successfully")
    }
}

mod put {
    use super::*;

    pub async fn reset_password(
        State(state): State<AppState>,
        Path(token): Path<String>,
        Json(NewPassword { password }): Json<NewPassword>,
    ) -> ApiResult<ApiResponse<()>> {
        validate_password(&password)?;
        Backend::new(state.db.clone())
            .reset_password(&token, &password)
            .await
            .map_err(|e| match e {
                BackendError::InvalidCredentials => {
                    ApiError::validation("Invalid or expired reset token")
                }
                e => e.into(),
            })?;

        Ok(ApiResponse::message(
            "Password reset successful. You can now log in with your new password.",
        ))
    }

    pub async fn update_details(
        State(state): State<AppState>,
        user: CurrentUser,
        Json(details): Json<DetailsUpdate>,
    ) -> ApiResult<ApiResponse<crate::entities::user::Model>> {
        let backend = Backend::new(state.db.clone());
        if let Some(email) = &details.email {
            if !email.contains('@') {
                return Err(ApiError::validation("Please provide a valid email"));
            }
            if let Some(existing) = backend.find_by_email(email).await? {
                if existing.id != user.id() {
                    return Err(ApiError::Conflict("Email already registered".into()));
                }
            }
        }

        let updated = backend.update_details(user.0, details).await?;
        Ok(ApiResponse::ok(updated).with_message("User details updated successfully"))
    }

    pub async fn update_password(
        State(state): State<AppState>,
        user: CurrentUser,
        Json(change): Json<PasswordChange>,
    ) -> ApiResult<ApiResponse<()>> {
        validate_password(&change.new_password)?;
        Backend::new(state.db.clone())
            .update_password(user.0, change)
            .await
            .map_err(|e| match e {
                BackendError::InvalidCredentials => {
                    ApiError::Unauthorized("Current password is incorrect".into())
                }
                e => e.into(),
            })?;

        Ok(ApiResponse::message("Password updated successfully"))
    }
}
