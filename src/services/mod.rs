pub mod campaigns;
pub mod deliveries;
pub mod donations;
pub mod notifications;
pub mod orphanages;
pub mod orphans;
pub mod reconcile;
pub mod sponsorships;
pub mod volunteers;
