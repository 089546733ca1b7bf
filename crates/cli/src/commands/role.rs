//! Role commands.

use ticketdesk_core::{Email, RoleName};
use ticketdesk_server::db::{IdentityStore, PgStore};

use super::{CommandError, connect};

/// Create a role. Fails if the name is taken.
pub async fn create(name: &str) -> Result<(), CommandError> {
    let name = RoleName::parse(name)?;
    let store = PgStore::new(connect().await?);

    let role = store.create_role(name).await?;
    tracing::info!("Created role {} (id {})", role.name, role.id);
    Ok(())
}

/// Grant a role to a user by email and role name.
///
/// The user's existing sessions are unaffected; the role shows up at next login.
pub async fn grant(email: &str, name: &str) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let name = RoleName::parse(name)?;
    let store = PgStore::new(connect().await?);

    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| CommandError::UnknownUser(email.to_string()))?;
    let role = store
        .find_role_by_name(&name)
        .await?
        .ok_or_else(|| CommandError::UnknownRole(name.to_string()))?;

    store.grant_role(user.id, role.id).await?;
    tracing::info!("Granted {} to {}", role.name, user.email);
    Ok(())
}
