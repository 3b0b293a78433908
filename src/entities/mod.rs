pub mod prelude;

pub mod campaign;
pub mod delivery;
pub mod delivery_status_history;
pub mod donation;
pub mod notification;
pub mod orphan;
pub mod orphan_update;
pub mod orphanage;
pub mod review;
pub mod sea_orm_active_enums;
pub mod sponsorship;
pub mod user;
pub mod volunteer_application;
pub mod volunteer_opportunity;
