pub use sea_orm_migration::prelude::*;

mod iden;
mod m20250601_000001_create_users;
mod m20250601_000002_create_directory;
mod m20250601_000003_create_ledger;
mod m20250601_000004_create_deliveries;
mod m20250601_000005_create_volunteering;
mod m20250601_000006_create_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_users::Migration),
            Box::new(m20250601_000002_create_directory::Migration),
            Box::new(m20250601_000003_create_ledger::Migration),
            Box::new(m20250601_000004_create_deliveries::Migration),
            Box::new(m20250601_000005_create_volunteering::Migration),
            Box::new(m20250601_000006_create_notifications::Migration),
        ]
    }
}
