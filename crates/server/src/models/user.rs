//! User domain types.

use std::collections::BTreeSet;

use secrecy::SecretString;

use ticketdesk_core::{Email, RoleName, UserId};

use super::Role;

/// A user account with its assigned roles.
///
/// Not `Serialize`. Response bodies are built in the route handlers and
/// never include the password hash.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email, unique across all users.
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: SecretString,
    /// Account validity flag. Stored and returned, not consulted at login.
    pub is_valid: bool,
    /// Roles currently held, ordered by name.
    pub roles: Vec<Role>,
}

impl User {
    /// The distinct role names this user holds.
    #[must_use]
    pub fn role_names(&self) -> BTreeSet<RoleName> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }
}

/// Data for inserting a new user.
#[derive(Debug)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: SecretString,
}

/// Editable fields of an existing user.
///
/// The password hash is not editable through this path.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub id: UserId,
    pub email: Email,
    pub is_valid: bool,
}
