pub mod admin;
pub mod campaigns;
pub mod deliveries;
pub mod donations;
pub mod notifications;
pub mod orphanages;
pub mod orphans;
pub mod sponsorships;
pub mod volunteers;

use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Deserialize;

use crate::entities::user;

/// `{ "status": ... }` request body for the status-transition endpoints.
#[derive(Debug, Deserialize)]
pub struct StatusChange<S> {
    pub status: S,
}

/// Loads the recipient of a notification. A failure is logged and the
/// notification skipped.
pub(crate) async fn recipient(db: &DatabaseConnection, user_id: i32) -> Option<user::Model> {
    match user::Entity::find_by_id(user_id).one(db).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(user_id, "Failed to load notification recipient: {:?}", e);
            None
        }
    }
}
