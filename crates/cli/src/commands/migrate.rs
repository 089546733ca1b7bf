//! Database migration command.
//!
//! Applies `crates/server/migrations`, which also seeds the four standard
//! roles (`Admin`, `User`, `Moderator`, `ReadOnly`).

use super::{CommandError, connect};

pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
