//! Database connection and schema bootstrap

use crate::app_config::DatabaseConfig;
use crate::orm::{block_entries, tags, unblock_audit, user_sessions, users, video_tags, videos};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Statement,
};

/// Name of the unique index that backs rule uniqueness.
pub const RULE_UNIQUE_INDEX: &str = "idx_block_entries_kind_value_operator";

/// Open a connection pool using the configured URL.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());
    opt.max_connections(config.max_connections);

    let db = Database::connect(opt).await?;
    log::info!("Connected to database ({:?})", db.get_database_backend());

    if config.create_schema {
        create_schema(&db).await?;
    }

    Ok(db)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Create every table this crate reads or writes, plus the rule uniqueness
/// index. Intended for fresh databases; existing tables are left alone.
pub async fn create_schema<C>(db: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    // Referenced tables first.
    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, user_sessions::Entity).await?;
    create_table(db, &schema, tags::Entity).await?;
    create_table(db, &schema, videos::Entity).await?;
    create_table(db, &schema, video_tags::Entity).await?;
    create_table(db, &schema, block_entries::Entity).await?;
    create_table(db, &schema, unblock_audit::Entity).await?;

    // Same syntax on Postgres and SQLite.
    db.execute(Statement::from_string(
        backend,
        format!(
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "{}" ON "block_entries" ("kind", "value", "operator_uuid")"#,
            RULE_UNIQUE_INDEX
        ),
    ))
    .await?;

    log::info!("Database schema is in place");
    Ok(())
}
