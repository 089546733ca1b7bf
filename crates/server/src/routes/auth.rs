//! Authentication route handlers.
//!
//! Login verifies the pair and sets the encrypted session cookie. The
//! session's claims (email and role names) are frozen at this point:
//! role changes made afterwards only show up after the next login.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::CurrentPrincipal;
use crate::models::Principal;
use crate::routes::users::UserResponse;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Body of `POST /login` and `POST /register`.
#[derive(Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Handle login.
///
/// Unknown email, wrong password and malformed email all answer 400
/// "Invalid credentials".
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(form): Json<CredentialsForm>,
) -> Result<StatusCode> {
    let auth = AuthService::new(state.identity());

    let user = match auth.login_with_password(&form.email, &form.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("Login failed: invalid credentials");
            return Err(AuthError::InvalidCredentials.into());
        }
        Err(e) => return Err(e.into()),
    };

    let principal = Principal::for_user(&user);
    let cookie = state.sessions().issue(principal, Utc::now())?;
    cookies.add(cookie);

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(email = %user.email, "User logged in");

    Ok(StatusCode::OK)
}

/// Handle logout.
///
/// Sends a removal cookie. The sealed cookie itself stays valid until it
/// expires; a client that kept a copy can still present it.
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> StatusCode {
    cookies.add(state.sessions().removal());
    clear_sentry_user();
    tracing::info!(email = %principal.email, "User logged out");
    StatusCode::OK
}

/// Handle registration of a password account with no roles.
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<CredentialsForm>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let auth = AuthService::new(state.identity());
    let user = auth
        .register_with_password(&form.email, &form.password)
        .await
        .map_err(AppError::from)?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::OK, Json(UserResponse::from(user))))
}

/// The caller's claims, read from the session without touching the store.
pub async fn current(CurrentPrincipal(principal): CurrentPrincipal) -> Json<Principal> {
    Json(principal)
}
