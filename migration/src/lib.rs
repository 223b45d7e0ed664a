//! Database migrations for the chat gateway dispatch core.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_07_01_100000_create_users;
mod m2026_07_01_100100_create_providers;
mod m2026_07_01_100200_create_user_providers;
mod m2026_07_01_100300_create_message_transactions;
mod m2026_07_01_100400_create_message_transaction_history;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_07_01_100000_create_users::Migration),
            Box::new(m2026_07_01_100100_create_providers::Migration),
            Box::new(m2026_07_01_100200_create_user_providers::Migration),
            Box::new(m2026_07_01_100300_create_message_transactions::Migration),
            Box::new(m2026_07_01_100400_create_message_transaction_history::Migration),
        ]
    }
}
