//! `PostgreSQL` implementation of the stores.
//!
//! Queries are checked at runtime (`query_as` with `FromRow` row types) so the
//! crate builds without a live database.

mod identity;
mod tickets;

use sqlx::PgPool;

use super::RepositoryError;

/// Both stores backed by one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for migrations and health checks.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map constraint violations on writes to repository errors.
fn write_error(e: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(conflict.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Database(e)
}
