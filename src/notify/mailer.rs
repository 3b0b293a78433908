use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::EmailConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Posts messages to a transactional email HTTP API.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        let body = OutgoingEmail {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        };
        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

/// Logs messages instead of delivering them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "email not sent, no provider configured");
        Ok(())
    }
}

pub fn from_config(config: &EmailConfig) -> Arc<dyn Mailer> {
    match &config.api_url {
        Some(url) => Arc::new(HttpMailer::new(
            url.clone(),
            config.api_key.clone(),
            config.from.clone(),
        )),
        None => Arc::new(LogMailer),
    }
}
