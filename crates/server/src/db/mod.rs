//! Persistence for users, roles and tickets.
//!
//! # Stores
//!
//! Handlers reach storage through two object-safe traits held in
//! [`AppState`](crate::state::AppState):
//!
//! - [`IdentityStore`] - users, roles and role assignments
//! - [`TicketStore`] - support tickets
//!
//! Both are implemented by [`PgStore`] (`PostgreSQL`) and [`MemoryStore`]
//! (in process, selected with `TICKETDESK_DATABASE_URL=memory://`).
//!
//! # Tables
//!
//! - `users` - Accounts with Argon2id password hashes
//! - `roles` - Named roles (`Admin`, `User`, `Moderator`, `ReadOnly` are seeded)
//! - `user_roles` - Many-to-many assignment
//! - `tickets` - Support tickets
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p ticketdesk-cli -- migrate
//! ```

pub mod memory;
pub mod pg;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use ticketdesk_core::{Email, RoleId, RoleName, TicketId, UserId};

use crate::models::{NewUser, Role, Ticket, TicketDetails, User, UserUpdate};

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Users, roles and the assignments between them.
///
/// Every returned [`User`] carries its complete role set. Writes are
/// visible to the next read through the same store.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Round-trip to the backing store.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Exact, case-sensitive email lookup.
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// All users ordered by id.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// Insert a user without roles.
    ///
    /// Returns `Conflict` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Change a user's email and validity flag.
    ///
    /// Returns `NotFound` for an unknown id and `Conflict` if the new email is taken.
    async fn update_user(&self, update: UserUpdate) -> Result<User, RepositoryError>;

    /// Remove a user and its role assignments, returning what was removed.
    async fn delete_user(&self, id: UserId) -> Result<User, RepositoryError>;

    async fn find_role_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError>;

    async fn find_role_by_name(&self, name: &RoleName) -> Result<Option<Role>, RepositoryError>;

    /// All roles ordered by id.
    async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError>;

    /// Returns `Conflict` if the name is taken.
    async fn create_role(&self, name: RoleName) -> Result<Role, RepositoryError>;

    /// Rename a role. Returns `NotFound` or `Conflict`.
    async fn update_role(&self, role: Role) -> Result<Role, RepositoryError>;

    /// Remove a role; assignments to it disappear with it.
    async fn delete_role(&self, id: RoleId) -> Result<Role, RepositoryError>;

    /// Assign a role to a user. Granting a held role is a no-op.
    ///
    /// Returns the user with its updated roles, or `NotFound` if either side is missing.
    async fn grant_role(&self, user_id: UserId, role_id: RoleId) -> Result<User, RepositoryError>;

    /// Remove a role from a user. Revoking a role that is not held is a no-op.
    async fn revoke_role(&self, user_id: UserId, role_id: RoleId)
    -> Result<User, RepositoryError>;
}

/// Support ticket persistence.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// All tickets ordered by id.
    async fn list_tickets(&self) -> Result<Vec<Ticket>, RepositoryError>;

    async fn create_ticket(&self, details: TicketDetails) -> Result<Ticket, RepositoryError>;

    /// Replace a ticket's content. Returns `NotFound` for an unknown id.
    async fn update_ticket(&self, ticket: Ticket) -> Result<Ticket, RepositoryError>;

    /// Returns whether a ticket was removed.
    async fn delete_ticket(&self, id: TicketId) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
