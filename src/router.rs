use std::sync::Arc;

use axum::{Json, Router, routing::get};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::{router as auth_router, token::TokenKeys},
    config::Config,
    notify::{Notifier, mailer},
    routes::{
        admin, campaigns, deliveries, donations, notifications, orphanages, orphans,
        sponsorships, volunteers,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub keys: TokenKeys,
    pub notifier: Notifier,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let notifier = Notifier::new(
            mailer::from_config(&config.email),
            config.public_base_url.clone(),
            config.admin_notify_email.clone(),
        );
        Self {
            db,
            keys: TokenKeys::new(&config.jwt_secret, config.jwt_ttl_hours),
            notifier,
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_router::router())
        .nest("/orphans", orphans::routes(&state))
        .nest("/orphanages", orphanages::routes(&state))
        .nest("/donations", donations::routes(&state))
        .nest("/sponsorships", sponsorships::routes(&state))
        .nest("/campaigns", campaigns::routes(&state))
        .nest("/deliveries", deliveries::routes(&state))
        .nest("/volunteers", volunteers::routes(&state))
        .nest("/notifications", notifications::routes())
        .nest("/admin", admin::routes(&state));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "message": "HopeConnect API is running" }))
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
