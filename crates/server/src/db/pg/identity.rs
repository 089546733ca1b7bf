use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use ticketdesk_core::{Email, RoleId, RoleName, UserId};

use super::{PgStore, write_error};
use crate::db::{IdentityStore, RepositoryError};
use crate::models::{NewUser, Role, User, UserUpdate};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    password_hash: String,
    is_valid: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: i32,
    name: String,
}

/// One role held by one user.
#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    user_id: i32,
    role_id: i32,
    name: String,
}

impl TryFrom<RoleRow> for Role {
    type Error = RepositoryError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RoleId::new(row.id),
            name: parse_role_name(&row.name)?,
        })
    }
}

fn parse_role_name(name: &str) -> Result<RoleName, RepositoryError> {
    RoleName::parse(name)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid role name in database: {e}")))
}

fn user_from_row(row: UserRow, roles: Vec<Role>) -> Result<User, RepositoryError> {
    let email = Email::parse(&row.email).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
    })?;

    Ok(User {
        id: UserId::new(row.id),
        email,
        password_hash: SecretString::from(row.password_hash),
        is_valid: row.is_valid,
        roles,
    })
}

const USER_COLUMNS: &str = "id, email, password_hash, is_valid";

impl PgStore {
    /// Load the roles of every user in `rows` with a single query.
    async fn with_roles(&self, rows: Vec<UserRow>) -> Result<Vec<User>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let assignments = sqlx::query_as::<_, AssignmentRow>(
            r"
            SELECT ur.user_id, r.id AS role_id, r.name
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = ANY($1)
            ORDER BY r.name
            ",
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut by_user: HashMap<i32, Vec<Role>> = HashMap::new();
        for a in assignments {
            by_user.entry(a.user_id).or_default().push(Role {
                id: RoleId::new(a.role_id),
                name: parse_role_name(&a.name)?,
            });
        }

        rows.into_iter()
            .map(|row| {
                let roles = by_user.remove(&row.id).unwrap_or_default();
                user_from_row(row, roles)
            })
            .collect()
    }

    async fn with_roles_one(&self, row: Option<UserRow>) -> Result<Option<User>, RepositoryError> {
        match row {
            Some(row) => Ok(self.with_roles(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        self.with_roles_one(row).await
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_roles_one(row).await
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.with_roles(rows).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.email.as_str())
        .bind(user.password_hash.expose_secret())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "email already exists"))?;

        user_from_row(row, Vec::new())
    }

    async fn update_user(&self, update: UserUpdate) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET email = $2, is_valid = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(update.id)
        .bind(update.email.as_str())
        .bind(update.is_valid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, "email already exists"))?;

        self.with_roles_one(row)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_user(&self, id: UserId) -> Result<User, RepositoryError> {
        let user = self
            .find_user_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_role_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Role::try_from)
            .transpose()
    }

    async fn find_role_by_name(&self, name: &RoleName) -> Result<Option<Role>, RepositoryError> {
        sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Role::try_from)
            .transpose()
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        sqlx::query_as::<_, RoleRow>("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Role::try_from)
            .collect()
    }

    async fn create_role(&self, name: RoleName) -> Result<Role, RepositoryError> {
        sqlx::query_as::<_, RoleRow>("INSERT INTO roles (name) VALUES ($1) RETURNING id, name")
            .bind(name.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "role name already exists"))?
            .try_into()
    }

    async fn update_role(&self, role: Role) -> Result<Role, RepositoryError> {
        sqlx::query_as::<_, RoleRow>("UPDATE roles SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(role.id)
            .bind(role.name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, "role name already exists"))?
            .ok_or(RepositoryError::NotFound)?
            .try_into()
    }

    async fn delete_role(&self, id: RoleId) -> Result<Role, RepositoryError> {
        sqlx::query_as::<_, RoleRow>("DELETE FROM roles WHERE id = $1 RETURNING id, name")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?
            .try_into()
    }

    async fn grant_role(&self, user_id: UserId, role_id: RoleId) -> Result<User, RepositoryError> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, "role already granted"))?;

        self.find_user_by_id(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn revoke_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<User, RepositoryError> {
        if self.find_role_by_id(role_id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        self.find_user_by_id(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}
