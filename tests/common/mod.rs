#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use hopeconnect::{
    auth::user::hash_password,
    config::Config,
    entities::{orphan, orphanage, sea_orm_active_enums::{Role, VerificationStatus}, user},
    router::{AppState, create_router},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use serde_json::Value;
use tower::ServiceExt;

pub const PASSWORD: &str = "secret123";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub struct TestUser {
    pub model: user::Model,
    pub token: String,
}

/// A router over a fresh in-memory SQLite database with every migration applied.
pub async fn spawn_app() -> TestApp {
    // A single connection keeps every query on the same in-memory database.
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.expect("connect to sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let state = AppState::new(db, Config::new("sqlite::memory:", "test-secret"));
    let router = create_router(state.clone());
    TestApp { state, router }
}

impl TestApp {
    /// Inserts a verified account and issues it a bearer token.
    pub async fn user(&self, email: &str, role: Role) -> TestUser {
        let now = Utc::now().naive_utc();
        let model = user::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(hash_password(PASSWORD).expect("hash password")),
            first_name: Set("Test".into()),
            last_name: Set(email.split('@').next().unwrap_or("user").to_string()),
            role: Set(role),
            is_verified: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.state.db)
        .await
        .expect("insert user");
        let token = self.state.keys.issue(&model).expect("issue token");
        TestUser { model, token }
    }

    pub async fn orphanage(&self, contact: &TestUser) -> orphanage::Model {
        let now = Utc::now().naive_utc();
        orphanage::ActiveModel {
            name: Set("Sunrise Home".into()),
            location: Set("Nairobi".into()),
            contact_person_id: Set(Some(contact.model.id)),
            verification_status: Set(VerificationStatus::Approved),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.state.db)
        .await
        .expect("insert orphanage")
    }

    pub async fn orphan(&self, orphanage_id: Option<i32>) -> orphan::Model {
        let now = Utc::now().naive_utc();
        orphan::ActiveModel {
            first_name: Set("Amani".into()),
            last_name: Set("Otieno".into()),
            dob: Set(chrono::NaiveDate::from_ymd_opt(2015, 6, 1).expect("valid date")),
            gender: Set("female".into()),
            orphanage_id: Set(orphanage_id),
            is_sponsored: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.state.db)
        .await
        .expect("insert orphan")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }
}
