use anyhow::{Context, Result};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_types::Integer;
use diesel::sqlite::SqliteConnection;
use log::info;

/// Bumped whenever the table layout changes. Shortcut history is advisory,
/// so a mismatch drops and recreates everything rather than migrating.
const SCHEMA_VERSION: i32 = 1;

/// Type alias for the SQLite connection pool
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const CREATE_TABLES_SQL: &str = "
CREATE TABLE shortcuts (
    intent_key TEXT NOT NULL PRIMARY KEY,
    source TEXT NOT NULL,
    format TEXT,
    title TEXT NOT NULL,
    description TEXT,
    icon1 TEXT,
    icon2 TEXT,
    intent_action TEXT,
    intent_data TEXT,
    intent_query TEXT,
    intent_extra_data TEXT,
    intent_component_name TEXT,
    shortcut_id TEXT,
    spinner_while_refreshing INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE click_log (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    intent_key TEXT NOT NULL REFERENCES shortcuts (intent_key),
    query TEXT NOT NULL,
    hit_time INTEGER NOT NULL
);

CREATE INDEX click_log_query ON click_log (query);
CREATE INDEX click_log_hit_time ON click_log (hit_time);

CREATE TABLE source_event_log (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    component TEXT NOT NULL,
    time INTEGER NOT NULL,
    click_count INTEGER NOT NULL,
    impression_count INTEGER NOT NULL
);

CREATE TABLE source_totals (
    component TEXT NOT NULL PRIMARY KEY,
    total_clicks INTEGER NOT NULL,
    total_impressions INTEGER NOT NULL
);
";

const DROP_TABLES_SQL: &str = "
DROP INDEX IF EXISTS click_log_query;
DROP INDEX IF EXISTS click_log_hit_time;
DROP TABLE IF EXISTS click_log;
DROP TABLE IF EXISTS shortcuts;
DROP TABLE IF EXISTS source_event_log;
DROP TABLE IF EXISTS source_totals;
";

/// Initialize the database connection pool and bootstrap the schema.
///
/// Must be called once at startup. When the stored schema version does not
/// match [`SCHEMA_VERSION`] (including the fresh-database case), all tables
/// are dropped and recreated.
pub fn init_db_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);

    let pool = Pool::builder()
        .build(manager)
        .with_context(|| format!("failed to create database pool for {database_url}"))?;

    bootstrap_schema(&pool)?;

    Ok(pool)
}

#[derive(QueryableByName)]
struct UserVersionRow {
    #[diesel(sql_type = Integer)]
    user_version: i32,
}

fn bootstrap_schema(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;

    let version: i32 = diesel::sql_query("PRAGMA user_version")
        .get_result::<UserVersionRow>(&mut conn)
        .map(|row| row.user_version)?;

    if version == SCHEMA_VERSION {
        return Ok(());
    }

    info!(
        "shortcut db schema version {} != {}, dropping and recreating",
        version, SCHEMA_VERSION
    );
    conn.batch_execute(DROP_TABLES_SQL)?;
    conn.batch_execute(CREATE_TABLES_SQL)?;
    conn.batch_execute(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))?;
    info!("shortcut db schema created");

    Ok(())
}
