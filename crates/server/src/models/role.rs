//! Role domain type.

use serde::{Deserialize, Serialize};

use ticketdesk_core::{RoleId, RoleName};

/// A role that can be granted to users.
///
/// Names are unique across the store, so a user's role names form a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
}
