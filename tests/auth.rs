mod common;

use axum::http::StatusCode;
use hopeconnect::entities::{sea_orm_active_enums::Role, user};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use common::{PASSWORD, spawn_app};

#[tokio::test]
async fn register_verify_and_login() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "email": "Grace@Example.com",
                "password": "hunter22",
                "first_name": "Grace",
                "last_name": "Hopper",
                "role": "volunteer"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["data"]["token"].is_string());
    assert_eq!(body["data"]["user"]["role"], "volunteer");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let login = json!({ "email": "grace@example.com", "password": "hunter22" });
    let (status, _) = app.post("/api/v1/auth/login", None, login.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = user::Entity::find()
        .filter(user::Column::Email.eq("grace@example.com"))
        .one(&app.state.db)
        .await
        .unwrap()
        .and_then(|u| u.verification_token)
        .expect("verification token stored");
    let (status, _) = app
        .get(&format!("/api/v1/auth/verify-email/{token}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/api/v1/auth/login", None, login).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let bearer = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/v1/auth/me", Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "grace@example.com");
    assert_eq!(body["data"]["is_verified"], true);
}

#[tokio::test]
async fn registration_rejects_admin_and_duplicates() {
    let app = spawn_app().await;
    let body = json!({
        "email": "eve@example.com",
        "password": "hunter22",
        "first_name": "Eve",
        "last_name": "Root",
        "role": "admin"
    });
    let (status, _) = app.post("/api/v1/auth/register", None, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.user("taken@example.com", Role::Donor).await;
    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "email": "taken@example.com",
                "password": "hunter22",
                "first_name": "Tak",
                "last_name": "En"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = spawn_app().await;

    let (status, body) = app.get("/api/v1/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/v1/donations", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let donor = app.user("donor@example.com", Role::Donor).await;
    let (status, body) = app.get("/api/v1/donations/stats", Some(&donor.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "User role donor is not authorized to access this route"
    );

    let admin = app.user("admin@example.com", Role::Admin).await;
    let (status, body) = app.get("/api/v1/donations/stats", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_count"], 0);
}

#[tokio::test]
async fn password_change_requires_the_current_password() {
    let app = spawn_app().await;
    let donor = app.user("donor@example.com", Role::Donor).await;

    let (status, body) = app
        .put(
            "/api/v1/auth/update-password",
            Some(&donor.token),
            json!({ "currentPassword": "wrong-one", "newPassword": "brand-new" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Current password is incorrect");

    let (status, _) = app
        .put(
            "/api/v1/auth/update-password",
            Some(&donor.token),
            json!({ "currentPassword": PASSWORD, "newPassword": "brand-new" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "donor@example.com", "password": "brand-new" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}
