//! Authentication service.
//!
//! Verifies email/password pairs against stored Argon2id hashes and creates
//! password accounts. Verification is read-only: a successful login never
//! rehashes or upgrades the stored hash.

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};

use ticketdesk_core::Email;

use crate::db::{IdentityStore, RepositoryError};
use crate::models::{NewUser, User};

/// Hash checked when the email is unknown, so both failure paths pay for
/// one Argon2 verification.
static UNKNOWN_USER_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("unknown-user-placeholder").ok());

/// Authentication service over an identity store.
pub struct AuthService<'a> {
    store: &'a dyn IdentityStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn IdentityStore) -> Self {
        Self { store }
    }

    /// Check an email/password pair.
    ///
    /// Returns the user, with its current roles, only when the email exists
    /// and the password matches. An unknown email and a wrong password both
    /// produce `Ok(None)`. A stored hash that cannot be parsed counts as a
    /// mismatch.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store lookup fails.
    pub async fn verify_credentials(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            if let Some(hash) = UNKNOWN_USER_HASH.as_deref() {
                let _ = verify_password(password, hash);
            }
            return Ok(None);
        };

        match verify_password(password, user.password_hash.expose_secret()) {
            PasswordCheck::Match => Ok(Some(user)),
            PasswordCheck::Mismatch => Ok(None),
            PasswordCheck::MalformedHash => {
                tracing::warn!(user_id = %user.id, "stored password hash is malformed");
                Ok(None)
            }
        }
    }

    /// Login with a raw email string and password.
    ///
    /// A malformed email is reported as `InvalidCredentials`, the same as an
    /// unknown one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the pair does not verify,
    /// or `AuthError::Repository` if the store fails.
    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        self.verify_credentials(&email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Register a new user with email and password. The user starts with no roles.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::EmptyPassword` if the password is empty.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        if password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }

        let password_hash = SecretString::from(hash_password(password)?);

        self.store
            .create_user(NewUser {
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }
}

/// Outcome of comparing a password with a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Match,
    Mismatch,
    MalformedHash,
}

/// Hash a password using Argon2id with a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a PHC-format hash.
///
/// The comparison is done by the `argon2` crate over the full digest.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> PasswordCheck {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return PasswordCheck::MalformedHash;
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => PasswordCheck::Match,
        Err(_) => PasswordCheck::Mismatch,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ticketdesk_core::RoleId;

    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_hash_verifies_only_the_original_password() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert_eq!(verify_password("secret1", &hash), PasswordCheck::Match);
        assert_eq!(verify_password("secret2", &hash), PasswordCheck::Mismatch);
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("secret1").unwrap();
        let b = hash_password("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_not_a_panic() {
        assert_eq!(
            verify_password("secret1", "not-a-phc-string"),
            PasswordCheck::MalformedHash
        );
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let user = auth.register_with_password("a@x.com", "secret1").await.unwrap();
        store.grant_role(user.id, RoleId::new(1)).await.unwrap();

        let email = Email::parse("a@x.com").unwrap();
        let verified = auth.verify_credentials(&email, "secret1").await.unwrap().unwrap();
        assert_eq!(verified.id, user.id);
        assert_eq!(verified.roles.len(), 1);

        assert!(auth.verify_credentials(&email, "secret2").await.unwrap().is_none());

        let unknown = Email::parse("b@x.com").unwrap();
        assert!(auth.verify_credentials(&unknown, "secret1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register_with_password("a@x.com", "secret1").await.unwrap();

        let wrong_password = auth.login_with_password("a@x.com", "nope").await.unwrap_err();
        let unknown_email = auth.login_with_password("b@x.com", "secret1").await.unwrap_err();
        let malformed = auth.login_with_password("not-an-email", "secret1").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert!(matches!(malformed, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        assert!(matches!(
            auth.register_with_password("a@x.com", "").await,
            Err(AuthError::EmptyPassword)
        ));
        assert!(matches!(
            auth.register_with_password("nope", "secret1").await,
            Err(AuthError::InvalidEmail(_))
        ));

        auth.register_with_password("a@x.com", "secret1").await.unwrap();
        assert!(matches!(
            auth.register_with_password("a@x.com", "other").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }
}
