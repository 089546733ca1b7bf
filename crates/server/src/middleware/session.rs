//! Session issuance.
//!
//! The session is the cookie: a [`SessionPayload`] serialized to JSON and
//! encrypted (AES-256-GCM, authenticated) with a key derived from
//! `TICKETDESK_SESSION_SECRET`. There is no server-side session table, so a
//! tampered, foreign, or expired cookie simply fails to open.
//!
//! # Cookie attributes
//!
//! - `Secure` and `HttpOnly` always
//! - `SameSite=None` when the browser client is on another origin, `Lax` otherwise
//! - `Path=/`, and both `Max-Age` and `Expires` at issuance + 24 hours

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tower_cookies::Key;
use tower_cookies::cookie::time::{Duration, OffsetDateTime};
use tower_cookies::cookie::{Cookie, CookieJar, SameSite};

use crate::config::ServerConfig;
use crate::models::session::SESSION_LIFETIME_HOURS;
use crate::models::{Principal, SessionPayload};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "ticketdesk_session";

/// Errors from building or sealing a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session secret must be at least 64 bytes")]
    KeyTooShort,
    #[error("failed to encode session payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sealed cookie missing from jar")]
    Seal,
}

/// Mints, opens and clears session cookies.
#[derive(Clone)]
pub struct SessionIssuer {
    key: Key,
    same_site: SameSite,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("key", &"[REDACTED]")
            .field("same_site", &self.same_site)
            .finish()
    }
}

impl SessionIssuer {
    /// Derive the cookie key from a secret of at least 64 bytes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::KeyTooShort` if the secret is shorter.
    pub fn new(secret: &SecretString, cross_site: bool) -> Result<Self, SessionError> {
        let key = Key::try_from(secret.expose_secret().as_bytes())
            .map_err(|_| SessionError::KeyTooShort)?;
        let same_site = if cross_site {
            SameSite::None
        } else {
            SameSite::Lax
        };
        Ok(Self { key, same_site })
    }

    /// Build the issuer described by the server configuration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::KeyTooShort` if the configured secret is too short.
    pub fn from_config(config: &ServerConfig) -> Result<Self, SessionError> {
        Self::new(&config.session_secret, config.serves_cross_site())
    }

    #[must_use]
    pub const fn same_site(&self) -> SameSite {
        self.same_site
    }

    /// Start a session for `principal` at `now`, returning the encrypted cookie.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Encode` if the payload cannot be serialized.
    pub fn issue(
        &self,
        principal: Principal,
        now: DateTime<Utc>,
    ) -> Result<Cookie<'static>, SessionError> {
        self.seal(&SessionPayload::issue(principal, now))
    }

    /// Encrypt an arbitrary payload into a session cookie.
    ///
    /// The cookie's `Expires` attribute follows `payload.expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Encode` if the payload cannot be serialized.
    /// Returns `SessionError::Seal` if the jar does not yield the encrypted cookie.
    pub fn seal(&self, payload: &SessionPayload) -> Result<Cookie<'static>, SessionError> {
        let value = serde_json::to_string(payload)?;
        let mut cookie = self.base_cookie(value);
        cookie.set_max_age(Duration::hours(SESSION_LIFETIME_HOURS));
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(payload.expires_at.timestamp()) {
            cookie.set_expires(expires);
        }

        let mut jar = CookieJar::new();
        jar.private_mut(&self.key).add(cookie);
        jar.get(SESSION_COOKIE).cloned().ok_or(SessionError::Seal)
    }

    /// Decrypt and decode a session cookie.
    ///
    /// Returns `None` for a cookie that was not sealed with this key, was
    /// altered, or does not hold a payload. Expiry is not checked here.
    #[must_use]
    pub fn unseal(&self, cookie: &Cookie<'_>) -> Option<SessionPayload> {
        let mut jar = CookieJar::new();
        jar.add_original(Cookie::new(SESSION_COOKIE, cookie.value().to_owned()));
        let opened = jar.private(&self.key).get(SESSION_COOKIE)?;
        serde_json::from_str(opened.value()).ok()
    }

    /// A cookie instructing the browser to drop the session.
    #[must_use]
    pub fn removal(&self) -> Cookie<'static> {
        let mut cookie = self.base_cookie(String::new());
        cookie.make_removal();
        cookie
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, value))
            .http_only(true)
            .secure(true)
            .same_site(self.same_site)
            .path("/")
            .build()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeDelta;
    use ticketdesk_core::{Email, RoleName};

    use super::*;

    fn issuer(cross_site: bool) -> SessionIssuer {
        SessionIssuer::new(&SecretString::from("k3Y!".repeat(16)), cross_site).unwrap()
    }

    fn principal() -> Principal {
        Principal {
            email: Email::parse("a@x.com").unwrap(),
            roles: BTreeSet::from([RoleName::admin()]),
        }
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let result = SessionIssuer::new(&SecretString::from("x".repeat(63)), false);
        assert!(matches!(result, Err(SessionError::KeyTooShort)));
    }

    #[test]
    fn test_issued_cookie_attributes() {
        let cookie = issuer(true).issue(principal(), Utc::now()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::hours(24)));
        assert!(cookie.expires_datetime().is_some());

        let same_origin = issuer(false).issue(principal(), Utc::now()).unwrap();
        assert_eq!(same_origin.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_cookie_value_is_opaque() {
        let cookie = issuer(false).issue(principal(), Utc::now()).unwrap();
        assert!(!cookie.value().contains("a@x.com"));
        assert!(!cookie.value().contains("Admin"));
    }

    #[test]
    fn test_unseal_recovers_payload() {
        let issuer = issuer(false);
        let now = Utc::now();
        let cookie = issuer.issue(principal(), now).unwrap();

        let payload = issuer.unseal(&cookie).unwrap();
        assert_eq!(payload.principal, principal());
        assert_eq!(payload.expires_at - payload.issued_at, TimeDelta::hours(24));
    }

    #[test]
    fn test_unseal_rejects_tampering_and_foreign_keys() {
        let ours = issuer(false);
        let cookie = ours.issue(principal(), Utc::now()).unwrap();

        let mut tampered = cookie.value().to_owned();
        let swap = if tampered.starts_with('A') { "B" } else { "A" };
        tampered.replace_range(..1, swap);
        assert!(ours.unseal(&Cookie::new(SESSION_COOKIE, tampered)).is_none());

        let foreign =
            SessionIssuer::new(&SecretString::from("Zq9#".repeat(16)), false).unwrap();
        assert!(foreign.unseal(&cookie).is_none());

        assert!(ours.unseal(&Cookie::new(SESSION_COOKIE, "garbage")).is_none());
    }

    #[test]
    fn test_removal_cookie() {
        let cookie = issuer(true).removal();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.path(), Some("/"));
    }
}
