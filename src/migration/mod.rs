//! SeaORM database migrations.
//!
//! Written with the backend-neutral schema builder so the same migrations run
//! against PostgreSQL and SQLite.

pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_users;
mod m20250601_000002_create_appraisals;
mod m20250601_000003_create_market_data;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_users::Migration),
            Box::new(m20250601_000002_create_appraisals::Migration),
            Box::new(m20250601_000003_create_market_data::Migration),
        ]
    }
}
