pub mod mailer;

use std::sync::Arc;

use chrono::Utc;
use minijinja::Environment;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entities::{notification, sea_orm_active_enums::NotificationKind, sea_orm_active_enums::Role, user};
use mailer::{Email, Mailer};

/// Best-effort side channel: in-app notification rows and templated email.
/// Nothing here ever fails the request that triggered it.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    templates: Arc<Environment<'static>>,
    base_url: String,
    admin_email: Option<String>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, base_url: String, admin_email: Option<String>) -> Self {
        Self {
            mailer,
            templates: Arc::new(setup_templates()),
            base_url,
            admin_email,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn notify<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i32,
        kind: NotificationKind,
        title: &str,
        message: &str,
        related_id: Option<i32>,
    ) {
        let now = Utc::now().naive_utc();
        let row = notification::ActiveModel {
            user_id: Set(user_id),
            title: Set(title.to_string()),
            message: Set(message.to_string()),
            notification_type: Set(kind),
            related_id: Set(related_id),
            is_read: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        if let Err(e) = row.insert(db).await {
            tracing::warn!(user_id, ?related_id, "Failed to store notification: {:?}", e);
        }
    }

    pub async fn notify_admins<C: ConnectionTrait>(
        &self,
        db: &C,
        kind: NotificationKind,
        title: &str,
        message: &str,
        related_id: Option<i32>,
    ) {
        let admins = match user::Entity::find()
            .filter(user::Column::Role.eq(Role::Admin))
            .all(db)
            .await
        {
            Ok(admins) => admins,
            Err(e) => {
                tracing::warn!(?related_id, "Failed to load admins for notification: {:?}", e);
                return;
            }
        };
        for admin in admins {
            self.notify(db, admin.id, kind, title, message, related_id).await;
        }
        if let Some(to) = self.admin_email.clone() {
            self.email(
                to,
                title,
                "admin_alert.html",
                minijinja::context! { title => title, message => message },
            );
        }
    }

    /// Renders `template` and hands the message to the mailer on a background task.
    pub fn email(&self, to: String, subject: &str, template: &str, ctx: minijinja::Value) {
        let html = match self
            .templates
            .get_template(template)
            .and_then(|t| t.render(ctx))
        {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(template, "Failed to render email: {:?}", e);
                return;
            }
        };
        let email = Email {
            to,
            subject: subject.to_string(),
            html,
        };
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            let to = email.to.clone();
            if let Err(e) = mailer.send(email).await {
                tracing::error!(%to, "Error sending email: {:?}", e);
            }
        });
    }

    pub fn render(&self, template: &str, ctx: minijinja::Value) -> Result<String, minijinja::Error> {
        self.templates.get_template(template)?.render(ctx)
    }
}

fn setup_templates() -> Environment<'static> {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::error!(name, "Invalid email template: {:?}", e);
        }
    }
    env
}

const TEMPLATES: [(&str, &str); 11] = [
    ("base.html", include_str!("../../templates/email/base.html")),
    ("admin_alert.html", include_str!("../../templates/email/admin_alert.html")),
    ("verify_email.html", include_str!("../../templates/email/verify_email.html")),
    ("reset_password.html", include_str!("../../templates/email/reset_password.html")),
    ("donation_receipt.html", include_str!("../../templates/email/donation_receipt.html")),
    ("donation_status.html", include_str!("../../templates/email/donation_status.html")),
    ("sponsorship.html", include_str!("../../templates/email/sponsorship.html")),
    ("delivery_update.html", include_str!("../../templates/email/delivery_update.html")),
    ("orphanage_verification.html", include_str!("../../templates/email/orphanage_verification.html")),
    ("campaign_launch.html", include_str!("../../templates/email/campaign_launch.html")),
    ("application_status.html", include_str!("../../templates/email/application_status.html")),
];

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Email>>);

    #[async_trait]
    impl Mailer for Recorder {
        async fn send(&self, email: Email) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(email);
            Ok(())
        }
    }

    #[test]
    fn every_template_renders() {
        let notifier = Notifier::new(Arc::new(Recorder::default()), "http://x".into(), None);
        for (name, _) in TEMPLATES {
            let html = notifier.render(name, minijinja::context! { name => "Ada" });
            assert!(html.is_ok(), "{name} failed to render: {html:?}");
        }
    }

    #[tokio::test]
    async fn email_is_sent_in_background() {
        let recorder = Arc::new(Recorder::default());
        let notifier = Notifier::new(recorder.clone(), "http://x".into(), None);
        notifier.email(
            "ada@example.com".into(),
            "Thank you",
            "donation_receipt.html",
            minijinja::context! { name => "Ada", amount => 25.0, donation_id => 7 },
        );
        for _ in 0..50 {
            if !recorder.0.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let sent = recorder.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Thank you");
        assert!(sent[0].html.contains("Ada"));
    }
}
