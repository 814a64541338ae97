use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use sqlx::migrate::{MigrateError, Migrator};
use thiserror::Error;

use crate::core::DbContext;

static MIGRATOR: Migrator = sqlx::migrate!();

#[rustfmt::skip]
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to run embedded migrations")]
    EmbeddedMigrationFailed { source: MigrateError },

    #[error("No migrations applied yet")]
    NoMigrationsApplied,

    #[error("Failed to fetch applied migrations")]
    FetchAppliedMigrationsFailed { #[from] source: sqlx::Error },

    #[error("File system error")]
    FileSystemOperationFailed { #[from] source: std::io::Error },
}

/// Embedded migrations as `version description`.
#[must_use]
pub fn list_migrations() -> Vec<String> {
    MIGRATOR
        .iter()
        .map(|m| format!("{} {}", m.version, m.description))
        .collect()
}

/// Runs the embedded migrations
pub async fn run_migrations(db: &DbContext) -> Result<(), MigrationError> {
    MIGRATOR
        .run(db)
        .await
        .map_err(|e| MigrationError::EmbeddedMigrationFailed { source: e })?;
    tracing::info!("Database migrations completed successfully.");
    Ok(())
}

/// Number of embedded migrations not yet applied to the database.
pub async fn count_pending_migrations(db: &DbContext) -> Result<usize, MigrationError> {
    let applied = sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success = TRUE")
        .fetch_all(db)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(e) if e.message().contains("no such table") => MigrationError::NoMigrationsApplied,
            _ => MigrationError::FetchAppliedMigrationsFailed { source: err },
        })?;

    Ok(MIGRATOR.iter().filter(|m| !applied.contains(&m.version)).count())
}

/// Create a new migration file with the current timestamp as its version
pub fn create_migration(name: &str) -> Result<String, MigrationError> {
    let migrations_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    if !migrations_path.exists() {
        std::fs::create_dir_all(&migrations_path)?;
    }

    let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();
    let normalized_name = name.trim().replace(' ', "_").to_lowercase();
    let filename = format!("{timestamp}_{normalized_name}.sql");
    let filepath = migrations_path.join(&filename);

    let mut file = File::create(&filepath)?;
    writeln!(file, "-- Migration: {name}")?;
    writeln!(file, "--")?;
    writeln!(file, "-- Add migration script here")?;

    tracing::info!("Created new migration file: {}.", filepath.display());
    Ok(filename)
}
