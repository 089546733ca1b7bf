//! CLI subcommands.
//!
//! # Environment Variables
//!
//! - `TICKETDESK_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

pub mod migrate;
pub mod role;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use ticketdesk_core::{EmailError, RoleNameError};
use ticketdesk_server::db::{self, RepositoryError};
use ticketdesk_server::services::auth::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid role name: {0}")]
    InvalidRoleName(#[from] RoleNameError),

    #[error("No user with email: {0}")]
    UnknownUser(String),

    #[error("No role named: {0}")]
    UnknownRole(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Connect to the database named by the environment.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("TICKETDESK_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("TICKETDESK_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&SecretString::from(database_url)).await?)
}
