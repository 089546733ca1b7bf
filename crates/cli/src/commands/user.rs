//! User account commands.

use ticketdesk_server::db::PgStore;
use ticketdesk_server::services::auth::AuthService;

use super::{CommandError, connect};

/// Create a password account with no roles, returning its ID.
pub async fn create(email: &str, password: &str) -> Result<i32, CommandError> {
    let store = PgStore::new(connect().await?);

    let user = AuthService::new(&store)
        .register_with_password(email, password)
        .await?;

    tracing::info!("Created user {} (id {})", user.email, user.id);
    Ok(user.id.get())
}
