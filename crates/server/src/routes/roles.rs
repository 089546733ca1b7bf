//! Role administration handlers. Admin only.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use ticketdesk_core::{RoleId, RoleName};

use crate::error::{AppError, Result};
use crate::models::Role;
use crate::state::AppState;

/// Body of `POST /roles`.
#[derive(Debug, Deserialize)]
pub struct NewRoleForm {
    pub name: String,
}

/// Body of `PUT /roles`.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub id: RoleId,
    pub name: String,
}

fn parse_name(name: &str) -> Result<RoleName> {
    RoleName::parse(name).map_err(|e| AppError::BadRequest(e.to_string()))
}

pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Role>>> {
    Ok(Json(state.identity().list_roles().await?))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<RoleId>) -> Result<Json<Role>> {
    state
        .identity()
        .find_role_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Role not exist".to_owned()))
}

/// Create a role. Names are unique; a duplicate answers 409.
pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<NewRoleForm>,
) -> Result<Json<Role>> {
    let role = state.identity().create_role(parse_name(&form.name)?).await?;
    tracing::info!(role_id = %role.id, name = %role.name, "Role created");
    Ok(Json(role))
}

/// Rename a role.
///
/// Existing sessions keep the old name in their claims until they expire.
pub async fn update(State(state): State<AppState>, Json(form): Json<RoleForm>) -> Result<Json<Role>> {
    let role = Role {
        id: form.id,
        name: parse_name(&form.name)?,
    };
    let role = state.identity().update_role(role).await?;
    tracing::info!(role_id = %role.id, name = %role.name, "Role renamed");
    Ok(Json(role))
}

/// Delete a role along with all of its assignments.
pub async fn remove(State(state): State<AppState>, Path(id): Path<RoleId>) -> Result<Json<Role>> {
    let role = state.identity().delete_role(id).await?;
    tracing::info!(role_id = %role.id, name = %role.name, "Role deleted");
    Ok(Json(role))
}
