//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! All paths are nested under /api/v1.
//!
//! # Anonymous
//! GET    /health                        - Liveness ("Running")
//! GET    /health/ready                  - Identity store reachable
//! POST   /login                         - Verify credentials, set session cookie
//!
//! # Any authenticated caller
//! POST   /logout                        - Clear session cookie
//! GET    /users/current                 - Claims of the current session
//!
//! # Admin (or anonymous, when registration is open)
//! POST   /register                      - Create a password account
//!
//! # Admin
//! GET    /users                         - List users with roles
//! PUT    /users                         - Update email / validity
//! GET    /users/{id}                    - Fetch user
//! DELETE /users/{id}                    - Remove user
//! GET    /roles                         - List roles
//! POST   /roles                         - Create role
//! PUT    /roles                         - Rename role
//! GET    /roles/{id}                    - Fetch role
//! DELETE /roles/{id}                    - Remove role
//! GET    /user/{id}/roles               - Roles held by a user
//! POST   /user/{userId}/roles/{roleId}  - Grant role
//! DELETE /user/{userId}/roles/{roleId}  - Revoke role
//!
//! # User
//! GET    /tickets                       - List tickets
//!
//! # Admin or User
//! POST   /tickets                       - Create ticket
//! PUT    /tickets                       - Update ticket
//! DELETE /tickets/{id}                  - Remove ticket
//! ```

pub mod auth;
pub mod health;
pub mod roles;
pub mod tickets;
pub mod users;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use crate::config::RegistrationPolicy;
use crate::middleware::gate::policy;
use crate::middleware::{Guard, PolicyError, require_session};
use crate::state::AppState;

/// Prefix for every route in this service.
pub const API_PREFIX: &str = "/api/v1";

/// Wrap every route in `routes` with the gate for `policies`.
///
/// An empty `policies` list admits any authenticated caller.
fn protected(
    state: &AppState,
    policies: &[&str],
    routes: Router<AppState>,
) -> Result<Router<AppState>, PolicyError> {
    let requirement = state.policies().requirement(policies)?;
    let guard = Guard::new(state.sessions().clone(), requirement);
    Ok(routes.route_layer(from_fn_with_state(guard, require_session)))
}

/// Create the anonymous routes router.
fn public_routes(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/login", post(auth::login));

    match state.config().registration {
        RegistrationPolicy::Open => routes.route("/register", post(auth::register)),
        RegistrationPolicy::AdminOnly => routes,
    }
}

/// Create the session-only routes router.
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(auth::logout))
        .route("/users/current", get(auth::current))
}

/// Create the Admin routes router.
fn admin_routes(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/users", get(users::index).put(users::update))
        .route("/users/{id}", get(users::show).delete(users::remove))
        .route("/roles", get(roles::index).post(roles::create).put(roles::update))
        .route("/roles/{id}", get(roles::show).delete(roles::remove))
        .route("/user/{id}/roles", get(users::roles))
        .route(
            "/user/{id}/roles/{role_id}",
            post(users::grant_role).delete(users::revoke_role),
        );

    match state.config().registration {
        RegistrationPolicy::AdminOnly => routes.route("/register", post(auth::register)),
        RegistrationPolicy::Open => routes,
    }
}

/// Create the ticket routes routers, one per access level.
fn ticket_routes(state: &AppState) -> Result<Router<AppState>, PolicyError> {
    let read = protected(
        state,
        &[policy::USER],
        Router::new().route("/tickets", get(tickets::index)),
    )?;
    let write = protected(
        state,
        &[policy::ADMIN, policy::USER],
        Router::new()
            .route("/tickets", post(tickets::create).put(tickets::update))
            .route("/tickets/{id}", delete(tickets::remove)),
    )?;
    Ok(read.merge(write))
}

/// Create all routes for the service.
///
/// # Errors
///
/// Returns `PolicyError::Unknown` if a route group names a policy missing
/// from the state's policy table.
pub fn routes(state: &AppState) -> Result<Router<AppState>, PolicyError> {
    let api = Router::new()
        .merge(public_routes(state))
        .merge(protected(state, &[], session_routes())?)
        .merge(protected(state, &[policy::ADMIN], admin_routes(state))?)
        .merge(ticket_routes(state)?);

    Ok(Router::new().nest(API_PREFIX, api))
}
