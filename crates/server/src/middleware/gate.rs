//! Authorization gate.
//!
//! Protected routes are wrapped with [`require_session`], configured with a
//! [`Requirement`] resolved from named policies when the router is built.
//! Per request the gate opens the session cookie, checks expiry, and checks
//! the principal's roles against the requirement. Every kind of failure
//! (no cookie, bad cookie, expired, wrong roles) produces the same empty 401.
//!
//! On success the [`Principal`] is stored in the request extensions, where
//! the [`CurrentPrincipal`] extractor finds it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tower_cookies::Cookies;
use tower_cookies::cookie::Cookie;

use ticketdesk_core::RoleName;

use super::session::{SESSION_COOKIE, SessionIssuer};
use crate::models::Principal;

/// Policy names known to the standard table.
pub mod policy {
    pub const ADMIN: &str = "Admin";
    pub const USER: &str = "User";
    pub const MODERATOR: &str = "Moderator";
    pub const READ_ONLY: &str = "ReadOnly";
}

/// A route referenced a policy that is not in the table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("unknown authorization policy: {0}")]
    Unknown(String),
}

/// Named policies, each a set of accepted roles. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    policies: BTreeMap<String, BTreeSet<RoleName>>,
}

impl PolicyTable {
    /// `Admin`, `User`, `Moderator` and `ReadOnly`, each accepting the role of the same name.
    #[must_use]
    pub fn standard() -> Self {
        Self::default()
            .with_policy(policy::ADMIN, [RoleName::admin()])
            .with_policy(policy::USER, [RoleName::user()])
            .with_policy(policy::MODERATOR, [RoleName::moderator()])
            .with_policy(policy::READ_ONLY, [RoleName::read_only()])
    }

    /// Add or replace a policy.
    #[must_use]
    pub fn with_policy(
        mut self,
        name: impl Into<String>,
        roles: impl IntoIterator<Item = RoleName>,
    ) -> Self {
        self.policies.insert(name.into(), roles.into_iter().collect());
        self
    }

    /// Resolve a list of policy names into one requirement.
    ///
    /// The accepted roles are the union of the named policies. An empty list
    /// means any authenticated caller is accepted.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::Unknown` for the first name not in the table.
    pub fn requirement(&self, names: &[&str]) -> Result<Requirement, PolicyError> {
        if names.is_empty() {
            return Ok(Requirement::Authenticated);
        }

        let mut accepted = BTreeSet::new();
        for name in names {
            let roles = self
                .policies
                .get(*name)
                .ok_or_else(|| PolicyError::Unknown((*name).to_owned()))?;
            accepted.extend(roles.iter().cloned());
        }
        Ok(Requirement::AnyRole(accepted))
    }
}

/// What a route demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any valid, unexpired session.
    Authenticated,
    /// A valid session holding at least one of these roles.
    AnyRole(BTreeSet<RoleName>),
}

impl Requirement {
    #[must_use]
    pub fn admits(&self, principal: &Principal) -> bool {
        match self {
            Self::Authenticated => true,
            Self::AnyRole(accepted) => principal.holds_any(accepted),
        }
    }
}

/// Why a request was turned away. Only ever logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NoSession,
    InvalidSession,
    Expired,
    InsufficientRole,
}

impl Denial {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::InvalidSession => "invalid_session",
            Self::Expired => "expired",
            Self::InsufficientRole => "insufficient_role",
        }
    }
}

/// Middleware state for one protected group of routes.
#[derive(Debug, Clone)]
pub struct Guard {
    sessions: SessionIssuer,
    requirement: Arc<Requirement>,
}

impl Guard {
    #[must_use]
    pub fn new(sessions: SessionIssuer, requirement: Requirement) -> Self {
        Self {
            sessions,
            requirement: Arc::new(requirement),
        }
    }

    #[must_use]
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Decide a request given its session cookie and the current time.
    ///
    /// # Errors
    ///
    /// Returns the [`Denial`] reason when the request must be rejected.
    pub fn evaluate(
        &self,
        cookie: Option<&Cookie<'_>>,
        now: DateTime<Utc>,
    ) -> Result<Principal, Denial> {
        let cookie = cookie.ok_or(Denial::NoSession)?;
        let payload = self
            .sessions
            .unseal(cookie)
            .ok_or(Denial::InvalidSession)?;

        if !payload.is_live_at(now) {
            return Err(Denial::Expired);
        }
        if !self.requirement.admits(&payload.principal) {
            return Err(Denial::InsufficientRole);
        }
        Ok(payload.principal)
    }
}

/// Gate middleware. Use with `axum::middleware::from_fn_with_state(guard, require_session)`.
pub async fn require_session(
    State(guard): State<Guard>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie = cookies.get(SESSION_COOKIE);

    match guard.evaluate(cookie.as_ref(), Utc::now()) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(denial) => {
            tracing::debug!(
                path = %request.uri().path(),
                reason = denial.as_str(),
                "request rejected by authorization gate"
            );
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

/// Extractor for the principal resolved by the gate.
///
/// Only meaningful on routes behind [`require_session`]; elsewhere it rejects
/// with 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn whoami(CurrentPrincipal(principal): CurrentPrincipal) -> Json<Principal> {
///     Json(principal)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Self)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use secrecy::SecretString;
    use ticketdesk_core::Email;

    use super::*;
    use crate::models::SessionPayload;

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(&SecretString::from("gT7%".repeat(16)), false).unwrap()
    }

    fn principal(roles: &[&str]) -> Principal {
        Principal {
            email: Email::parse("a@x.com").unwrap(),
            roles: roles.iter().map(|r| RoleName::parse(r).unwrap()).collect(),
        }
    }

    fn guard(policies: &[&str]) -> Guard {
        let requirement = PolicyTable::standard().requirement(policies).unwrap();
        Guard::new(issuer(), requirement)
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let err = PolicyTable::standard()
            .requirement(&["Admin", "Superuser"])
            .unwrap_err();
        assert_eq!(err, PolicyError::Unknown("Superuser".to_owned()));
    }

    #[test]
    fn test_requirement_is_union_of_policies() {
        let requirement = PolicyTable::standard()
            .requirement(&["Admin", "User"])
            .unwrap();
        assert_eq!(
            requirement,
            Requirement::AnyRole(BTreeSet::from([RoleName::admin(), RoleName::user()]))
        );
        assert_eq!(
            PolicyTable::standard().requirement(&[]).unwrap(),
            Requirement::Authenticated
        );
    }

    #[test]
    fn test_policy_matrix() {
        let admin = principal(&["Admin"]);
        let user = principal(&["User"]);
        let read_only = principal(&["ReadOnly"]);
        let nobody = principal(&[]);

        let table = PolicyTable::standard();
        let admin_only = table.requirement(&["Admin"]).unwrap();
        let admin_or_user = table.requirement(&["Admin", "User"]).unwrap();
        let authenticated = table.requirement(&[]).unwrap();

        assert!(admin_only.admits(&admin));
        assert!(admin_or_user.admits(&admin));
        assert!(admin_or_user.admits(&user));
        assert!(!admin_only.admits(&user));
        assert!(!admin_only.admits(&read_only));
        assert!(!admin_or_user.admits(&nobody));
        assert!(authenticated.admits(&nobody));
    }

    #[test]
    fn test_role_comparison_is_exact() {
        let lowercase = principal(&["admin"]);
        assert!(!guard(&["Admin"]).requirement().admits(&lowercase));
    }

    #[test]
    fn test_evaluate_states() {
        let guard = guard(&["Admin"]);
        let now = Utc::now();

        assert_eq!(guard.evaluate(None, now), Err(Denial::NoSession));

        let garbage = Cookie::new(SESSION_COOKIE, "not-encrypted");
        assert_eq!(
            guard.evaluate(Some(&garbage), now),
            Err(Denial::InvalidSession)
        );

        let reader = issuer().issue(principal(&["ReadOnly"]), now).unwrap();
        assert_eq!(
            guard.evaluate(Some(&reader), now),
            Err(Denial::InsufficientRole)
        );

        let admin = issuer().issue(principal(&["Admin"]), now).unwrap();
        assert_eq!(
            guard.evaluate(Some(&admin), now).unwrap(),
            principal(&["Admin"])
        );
    }

    #[test]
    fn test_evaluate_expiry_boundary() {
        let guard = guard(&[]);
        let issued = Utc::now();
        let cookie = issuer().issue(principal(&[]), issued).unwrap();

        assert!(guard.evaluate(Some(&cookie), issued + TimeDelta::hours(24)).is_ok());
        assert_eq!(
            guard.evaluate(Some(&cookie), issued + TimeDelta::hours(24) + TimeDelta::seconds(1)),
            Err(Denial::Expired)
        );
    }

    #[test]
    fn test_expired_payload_is_rejected_even_with_valid_roles() {
        let issued = Utc::now() - TimeDelta::hours(25);
        let payload = SessionPayload::issue(principal(&["Admin"]), issued);
        let cookie = issuer().seal(&payload).unwrap();
        assert_eq!(
            guard(&["Admin"]).evaluate(Some(&cookie), Utc::now()),
            Err(Denial::Expired)
        );
    }
}
