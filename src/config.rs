use anyhow::Context;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub public_base_url: String,
    pub admin_notify_email: Option<String>,
    pub email: EmailConfig,
    pub db_max_connections: u32,
}

#[derive(Clone, Debug, Default)]
pub struct EmailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env file is fine in deployed environments.
        let _ = dotenvy::dotenv();
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let rust_log =
            env::var("RUST_LOG").unwrap_or_else(|_| "hopeconnect=debug,tower_http=info".into());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
        let jwt_ttl_hours = match env::var("JWT_TTL_HOURS") {
            Ok(v) => v.parse().context("JWT_TTL_HOURS must be an integer")?,
            Err(_) => 720,
        };
        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(v) => v.parse().context("DB_MAX_CONNECTIONS must be an integer")?,
            Err(_) => 10,
        };
        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());

        Ok(Self {
            database_url,
            rust_log,
            bind_addr,
            jwt_secret,
            jwt_ttl_hours,
            public_base_url,
            admin_notify_email: env::var("ADMIN_NOTIFY_EMAIL").ok(),
            email: EmailConfig {
                api_url: env::var("EMAIL_API_URL").ok(),
                api_key: env::var("EMAIL_API_KEY").ok(),
                from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "HopeConnect <noreply@hopeconnect.org>".into()),
            },
            db_max_connections,
        })
    }

    /// Configuration with defaults for everything but the database and signing secret.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            rust_log: "hopeconnect=debug".into(),
            bind_addr: "127.0.0.1:3000".into(),
            jwt_secret: jwt_secret.into(),
            jwt_ttl_hours: 720,
            public_base_url: "http://localhost:3000".into(),
            admin_notify_email: None,
            email: EmailConfig {
                from: "HopeConnect <noreply@hopeconnect.org>".into(),
                ..Default::default()
            },
            db_max_connections: 10,
        }
    }
}
