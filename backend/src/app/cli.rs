use std::env;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::app::{self, MigrationError};
use crate::auth;
use crate::core::{self, ApiError, DbContext};
use crate::db::{self, NewUser, Role};

#[rustfmt::skip]
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Migration creation failed")]
    MigrationCreateFailed { #[source] source: MigrationError },

    #[error("Checking migration status failed")]
    MigrationStatusCheckFailed { #[source] source: MigrationError },

    #[error("Running migrations failed")]
    MigrationRunFailed { #[source] source: MigrationError },

    #[error("Failed to read password")]
    PasswordPromptFailed { #[source] source: std::io::Error },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Super admin '{0}' already exists")]
    SuperAdminExists(String),

    #[error("Failed to create super admin")]
    SuperAdminCreateFailed { #[source] source: ApiError },
}

#[derive(Parser)]
#[command(name = "migrate")]
#[command(about = "Database migration and administration utility", long_about = None)]
struct Cli {
    #[command(subcommand)]
    migrate_sub_command: MigrateSubCommands,
}

#[derive(Subcommand)]
enum MigrateSubCommands {
    /// Create a new migration file
    Create {
        /// Name of the migration
        name: String,
    },
    /// List all embedded migrations
    List,
    /// Check if there are pending migrations
    Status,
    /// Run all pending migrations
    Run,
    /// Create a platform super admin (the password is prompted for)
    CreateSuperAdmin {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        full_name: String,
    },
}

/// Handles `<bin> migrate ...`. Returns `true` when a command ran and the server should not start.
pub async fn run_cli(db: &DbContext) -> Result<bool, CliError> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1] != "migrate" {
        return Ok(false);
    }

    // drop the "migrate" argument so clap sees the sub-command first
    let mut cli_args = vec![args[0].clone()];
    cli_args.extend(args.iter().skip(2).cloned());
    let cli = Cli::parse_from(cli_args);

    match cli.migrate_sub_command {
        MigrateSubCommands::Create { name } => {
            let filename = app::create_migration(&name).map_err(|e| CliError::MigrationCreateFailed { source: e })?;
            println!("Created new migration file: {filename}");
        }
        MigrateSubCommands::List => {
            let migrations = app::list_migrations();
            if migrations.is_empty() {
                println!("No migrations found.");
            } else {
                println!("Available migrations:");
                for (i, migration) in migrations.iter().enumerate() {
                    println!("{}. {}", i + 1, migration);
                }
            }
        }
        MigrateSubCommands::Status => match app::count_pending_migrations(db).await {
            Ok(0) => println!("Database is up to date. No pending migrations."),
            Ok(pending) => println!("There are {pending} pending migrations that need to be applied."),
            Err(MigrationError::NoMigrationsApplied) => println!("No migrations have been applied yet."),
            Err(e) => return Err(CliError::MigrationStatusCheckFailed { source: e }),
        },
        MigrateSubCommands::Run => {
            app::run_migrations(db).await.map_err(|e| CliError::MigrationRunFailed { source: e })?;
            println!("Migrations applied successfully.");
        }
        MigrateSubCommands::CreateSuperAdmin { email, full_name } => {
            app::run_migrations(db).await.map_err(|e| CliError::MigrationRunFailed { source: e })?;

            let password = rpassword::prompt_password(format!("Enter password for super admin '{email}': "))
                .map_err(|e| CliError::PasswordPromptFailed { source: e })?;

            let user = create_super_admin(db, &email, &full_name, password).await?;
            println!("Super admin '{}' created successfully!", user.email);
        }
    }

    Ok(true)
}

async fn create_super_admin(db: &DbContext, email: &str, full_name: &str, password: String) -> Result<db::User, CliError> {
    let invalid = |e: ApiError| CliError::InvalidInput(e.to_string());
    let email = core::normalize_email(email).map_err(invalid)?;
    let full_name = core::required(Some(full_name), "Full name is required").map_err(invalid)?;
    core::validate_password(&password).map_err(invalid)?;

    let failed = |e: ApiError| CliError::SuperAdminCreateFailed { source: e };
    if db::get_super_admin_by_email(db, &email).await.map_err(|e| failed(e.into()))?.is_some() {
        return Err(CliError::SuperAdminExists(email));
    }

    let password_hash = auth::hash_password_blocking(password).await.map_err(|e| failed(e.into()))?;
    let new_user = NewUser { tenant_id: None, email, password_hash, full_name, role: Role::SuperAdmin };
    db::insert_user(db, new_user).await.map_err(|e| failed(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_super_admin_rejects_duplicates() {
        let db = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        app::run_migrations(&db).await.unwrap();

        let user = create_super_admin(&db, "Root@Example.com", "Root", "super-secret".to_string())
            .await
            .unwrap();
        assert_eq!(user.email, "root@example.com");
        assert_eq!(user.role, Role::SuperAdmin);
        assert!(user.tenant_id.is_none());

        let err = create_super_admin(&db, "root@example.com", "Root", "super-secret".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::SuperAdminExists(_)));

        let err = create_super_admin(&db, "other@example.com", "Other", "short".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(_)));
    }
}
