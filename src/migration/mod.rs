// ABOUTME: SeaORM migration module for database schema management
// ABOUTME: Creates the users and checkups tables on startup

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250301_000001_create_users_and_checkups::Migration)]
    }
}

pub mod m20250301_000001_create_users_and_checkups;
