//! Session-borne identity.
//!
//! The session cookie carries a [`SessionPayload`] encrypted with the server
//! key. Nothing about the session is stored server side; the claims inside
//! are frozen at login and only expiry or logout ends them.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use ticketdesk_core::{Email, RoleName};

use super::User;

/// Hours a session stays valid after issuance. There is no sliding renewal.
pub const SESSION_LIFETIME_HOURS: i64 = 24;

/// The resolved identity of a caller: one email claim and zero or more role claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub email: Email,
    pub roles: BTreeSet<RoleName>,
}

impl Principal {
    /// Build the claims for a verified user from the roles it holds right now.
    #[must_use]
    pub fn for_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            roles: user.role_names(),
        }
    }

    /// True when at least one held role is in `accepted`.
    #[must_use]
    pub fn holds_any(&self, accepted: &BTreeSet<RoleName>) -> bool {
        !self.roles.is_disjoint(accepted)
    }
}

/// What the session cookie decrypts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub principal: Principal,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionPayload {
    /// Start a session at `now` for the given principal.
    #[must_use]
    pub fn issue(principal: Principal, now: DateTime<Utc>) -> Self {
        Self {
            principal,
            issued_at: now,
            expires_at: now + lifetime(),
        }
    }

    /// A session is live up to and including its expiry instant.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }
}

/// The fixed session lifetime.
#[must_use]
pub fn lifetime() -> TimeDelta {
    TimeDelta::hours(SESSION_LIFETIME_HOURS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn principal(roles: &[&str]) -> Principal {
        Principal {
            email: Email::parse("a@x.com").unwrap(),
            roles: roles.iter().map(|r| RoleName::parse(r).unwrap()).collect(),
        }
    }

    #[test]
    fn test_holds_any() {
        let admin = principal(&["Admin"]);
        let accepted: BTreeSet<_> = [RoleName::admin(), RoleName::user()].into();
        assert!(admin.holds_any(&accepted));
        assert!(admin.holds_any(&[RoleName::admin()].into()));

        let read_only = principal(&["ReadOnly"]);
        assert!(!read_only.holds_any(&[RoleName::admin()].into()));
        assert!(!principal(&[]).holds_any(&accepted));
    }

    #[test]
    fn test_expiry_window() {
        let issued = Utc::now();
        let session = SessionPayload::issue(principal(&[]), issued);

        assert!(session.is_live_at(issued + TimeDelta::minutes(1)));
        assert!(session.is_live_at(issued + TimeDelta::hours(23)));
        assert!(session.is_live_at(issued + lifetime()));
        assert!(!session.is_live_at(issued + lifetime() + TimeDelta::seconds(1)));
        assert!(!session.is_live_at(issued + TimeDelta::hours(25)));
    }

    #[test]
    fn test_principal_json_shape() {
        let json = serde_json::to_value(principal(&["User", "Admin"])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"email": "a@x.com", "roles": ["Admin", "User"]})
        );
    }
}
