//! In-process implementation of the stores.
//!
//! Backs the integration tests and local runs with
//! `TICKETDESK_DATABASE_URL=memory://`. Data lives as long as the process.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::RwLock;

use ticketdesk_core::{Email, RoleId, RoleName, TicketId, UserId};

use super::{IdentityStore, RepositoryError, TicketStore};
use crate::models::{NewUser, Role, Ticket, TicketDetails, User, UserUpdate};

#[derive(Debug)]
struct StoredUser {
    email: Email,
    password_hash: SecretString,
    is_valid: bool,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, StoredUser>,
    roles: BTreeMap<RoleId, RoleName>,
    assignments: BTreeSet<(UserId, RoleId)>,
    tickets: BTreeMap<TicketId, TicketDetails>,
    last_user_id: i32,
    last_role_id: i32,
    last_ticket_id: i32,
}

impl Tables {
    fn user(&self, id: UserId) -> Option<User> {
        let stored = self.users.get(&id)?;
        let mut roles: Vec<Role> = self
            .assignments
            .iter()
            .filter(|(user_id, _)| *user_id == id)
            .filter_map(|(_, role_id)| {
                self.roles.get(role_id).map(|name| Role {
                    id: *role_id,
                    name: name.clone(),
                })
            })
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));

        Some(User {
            id,
            email: stored.email.clone(),
            password_hash: stored.password_hash.clone(),
            is_valid: stored.is_valid,
            roles,
        })
    }

    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|(id, u)| &u.email == email && Some(*id) != except)
    }

    fn role_name_taken(&self, name: &RoleName, except: Option<RoleId>) -> bool {
        self.roles
            .iter()
            .any(|(id, n)| n == name && Some(*id) != except)
    }

    fn insert_role(&mut self, name: RoleName) -> Role {
        self.last_role_id += 1;
        let id = RoleId::new(self.last_role_id);
        self.roles.insert(id, name.clone());
        Role { id, name }
    }
}

/// Users, roles and tickets held in memory behind an async `RwLock`.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// An empty store seeded with the `Admin`, `User`, `Moderator` and
    /// `ReadOnly` roles (ids 1 to 4), matching the initial migration.
    #[must_use]
    pub fn new() -> Self {
        let mut tables = Tables::default();
        for name in [
            RoleName::admin(),
            RoleName::user(),
            RoleName::moderator(),
            RoleName::read_only(),
        ] {
            tables.insert_role(name);
        }

        Self {
            tables: RwLock::new(tables),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        let id = tables
            .users
            .iter()
            .find(|(_, u)| &u.email == email)
            .map(|(id, _)| *id);
        Ok(id.and_then(|id| tables.user(id)))
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.read().await.user(id))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .keys()
            .filter_map(|id| tables.user(*id))
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        tables.last_user_id += 1;
        let id = UserId::new(tables.last_user_id);
        tables.users.insert(
            id,
            StoredUser {
                email: user.email,
                password_hash: user.password_hash,
                is_valid: false,
            },
        );
        tables.user(id).ok_or(RepositoryError::NotFound)
    }

    async fn update_user(&self, update: UserUpdate) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&update.email, Some(update.id)) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let stored = tables
            .users
            .get_mut(&update.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.email = update.email;
        stored.is_valid = update.is_valid;
        tables.user(update.id).ok_or(RepositoryError::NotFound)
    }

    async fn delete_user(&self, id: UserId) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let user = tables.user(id).ok_or(RepositoryError::NotFound)?;
        tables.users.remove(&id);
        tables.assignments.retain(|(user_id, _)| *user_id != id);
        Ok(user)
    }

    async fn find_role_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.roles.get(&id).map(|name| Role {
            id,
            name: name.clone(),
        }))
    }

    async fn find_role_by_name(&self, name: &RoleName) -> Result<Option<Role>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .roles
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(id, n)| Role {
                id: *id,
                name: n.clone(),
            }))
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .roles
            .iter()
            .map(|(id, name)| Role {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }

    async fn create_role(&self, name: RoleName) -> Result<Role, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.role_name_taken(&name, None) {
            return Err(RepositoryError::Conflict(
                "role name already exists".to_owned(),
            ));
        }
        Ok(tables.insert_role(name))
    }

    async fn update_role(&self, role: Role) -> Result<Role, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.role_name_taken(&role.name, Some(role.id)) {
            return Err(RepositoryError::Conflict(
                "role name already exists".to_owned(),
            ));
        }

        let name = tables
            .roles
            .get_mut(&role.id)
            .ok_or(RepositoryError::NotFound)?;
        name.clone_from(&role.name);
        Ok(role)
    }

    async fn delete_role(&self, id: RoleId) -> Result<Role, RepositoryError> {
        let mut tables = self.tables.write().await;
        let name = tables.roles.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.assignments.retain(|(_, role_id)| *role_id != id);
        Ok(Role { id, name })
    }

    async fn grant_role(&self, user_id: UserId, role_id: RoleId) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) || !tables.roles.contains_key(&role_id) {
            return Err(RepositoryError::NotFound);
        }
        tables.assignments.insert((user_id, role_id));
        tables.user(user_id).ok_or(RepositoryError::NotFound)
    }

    async fn revoke_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) || !tables.roles.contains_key(&role_id) {
            return Err(RepositoryError::NotFound);
        }
        tables.assignments.remove(&(user_id, role_id));
        tables.user(user_id).ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn list_tickets(&self) -> Result<Vec<Ticket>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tickets
            .iter()
            .map(|(id, details)| Ticket {
                id: *id,
                details: details.clone(),
            })
            .collect())
    }

    async fn create_ticket(&self, details: TicketDetails) -> Result<Ticket, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.last_ticket_id += 1;
        let id = TicketId::new(tables.last_ticket_id);
        tables.tickets.insert(id, details.clone());
        Ok(Ticket { id, details })
    }

    async fn update_ticket(&self, ticket: Ticket) -> Result<Ticket, RepositoryError> {
        let mut tables = self.tables.write().await;
        let details = tables
            .tickets
            .get_mut(&ticket.id)
            .ok_or(RepositoryError::NotFound)?;
        details.clone_from(&ticket.details);
        Ok(ticket)
    }

    async fn delete_ticket(&self, id: TicketId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.tickets.remove(&id).is_some())
    }
}
