use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::cfg;
use crate::core::DbError;

pub type DbContext = sqlx::SqlitePool;

pub async fn create_db_context(db_settings: &cfg::DatabaseSettings) -> Result<DbContext, DbError> {
    let options = SqliteConnectOptions::from_str(&db_settings.url)
        .map_err(DbError::ConnectionFailed)?
        .create_if_missing(true)
        .foreign_keys(true)
        // Increase SQLite busy timeout to handle concurrent connections better
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(db_settings.max_connections.max(1))
        .connect_with(options)
        .await
        .map_err(DbError::ConnectionFailed)?;

    tracing::info!(url = %db_settings.url, "Database pool initialized");
    Ok(pool)
}
