//! Test database setup and management
#![allow(dead_code)]

use kirakira::app_config::BlockLimits;
use kirakira::block::{BlockListStore, VisibilityFilterBuilder};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Fresh in-memory database with the schema in place.
///
/// The pool holds exactly one connection: every SQLite in-memory connection
/// is its own database.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    init_logger();

    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    opt.max_connections(1).min_connections(1);

    let db = Database::connect(opt).await?;
    kirakira::db::create_schema(&db).await?;
    Ok(db)
}

/// Store backed by the test database with default limits.
pub fn store(db: &DatabaseConnection) -> BlockListStore {
    store_with_limits(db, BlockLimits::default())
}

pub fn store_with_limits(db: &DatabaseConnection, limits: BlockLimits) -> BlockListStore {
    BlockListStore::with_database_identity(db.clone(), limits)
}

pub fn filter_builder(db: &DatabaseConnection) -> VisibilityFilterBuilder {
    VisibilityFilterBuilder::with_database_identity(db.clone())
}
