pub use super::campaign::Entity as Campaign;
pub use super::delivery::Entity as Delivery;
pub use super::delivery_status_history::Entity as DeliveryStatusHistory;
pub use super::donation::Entity as Donation;
pub use super::notification::Entity as Notification;
pub use super::orphan::Entity as Orphan;
pub use super::orphan_update::Entity as OrphanUpdate;
pub use super::orphanage::Entity as Orphanage;
pub use super::review::Entity as Review;
pub use super::sponsorship::Entity as Sponsorship;
pub use super::user::Entity as User;
pub use super::volunteer_application::Entity as VolunteerApplication;
pub use super::volunteer_opportunity::Entity as VolunteerOpportunity;
