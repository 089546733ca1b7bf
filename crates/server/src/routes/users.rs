//! User administration and role assignment handlers. Admin only.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use ticketdesk_core::{Email, RoleId, UserId};

use crate::error::{AppError, Result};
use crate::models::{Role, User, UserUpdate};
use crate::state::AppState;

/// A user as returned to clients. Never includes the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub email: Email,
    pub is_valid: bool,
    pub roles: Vec<Role>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_valid: user.is_valid,
            roles: user.roles,
        }
    }
}

/// Body of `PUT /users`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateForm {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub is_valid: bool,
}

/// List all users with their roles.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>> {
    let users = state.identity().list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Fetch one user.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>> {
    let user = find_user(&state, id).await?;
    Ok(Json(user.into()))
}

/// Update a user's email and validity flag.
pub async fn update(
    State(state): State<AppState>,
    Json(form): Json<UserUpdateForm>,
) -> Result<Json<UserResponse>> {
    let email = Email::parse(&form.email).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state
        .identity()
        .update_user(UserUpdate {
            id: form.id,
            email,
            is_valid: form.is_valid,
        })
        .await?;

    tracing::info!(user_id = %user.id, "User updated");
    Ok(Json(user.into()))
}

/// Delete a user, returning the removed record.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>> {
    let user = state.identity().delete_user(id).await?;
    tracing::info!(user_id = %user.id, "User deleted");
    Ok(Json(user.into()))
}

/// Roles held by one user.
pub async fn roles(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Json<Vec<Role>>> {
    let user = find_user(&state, id).await?;
    Ok(Json(user.roles))
}

/// Grant a role. Granting a role the user already holds is a no-op.
///
/// Sessions issued before the grant keep their old claims.
pub async fn grant_role(
    State(state): State<AppState>,
    Path((user_id, role_id)): Path<(UserId, RoleId)>,
) -> Result<Json<UserResponse>> {
    ensure_assignment_sides(&state, user_id, role_id).await?;
    let user = state.identity().grant_role(user_id, role_id).await?;

    tracing::info!(%user_id, %role_id, "Role granted");
    Ok(Json(user.into()))
}

/// Revoke a role. Revoking a role the user does not hold is a no-op.
pub async fn revoke_role(
    State(state): State<AppState>,
    Path((user_id, role_id)): Path<(UserId, RoleId)>,
) -> Result<Json<UserResponse>> {
    ensure_assignment_sides(&state, user_id, role_id).await?;
    let user = state.identity().revoke_role(user_id, role_id).await?;

    tracing::info!(%user_id, %role_id, "Role revoked");
    Ok(Json(user.into()))
}

async fn find_user(state: &AppState, id: UserId) -> Result<User> {
    state
        .identity()
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not exist".to_owned()))
}

/// Report which side of an assignment is missing, user first.
async fn ensure_assignment_sides(state: &AppState, user_id: UserId, role_id: RoleId) -> Result<()> {
    find_user(state, user_id).await?;
    state
        .identity()
        .find_role_by_id(role_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Role not exist".to_owned()))?;
    Ok(())
}
