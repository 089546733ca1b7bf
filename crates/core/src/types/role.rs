//! Role names.
//!
//! A role is identified by its name everywhere it travels: in the store, in
//! session claims, and in policy requirements. Comparison is exact and
//! case-sensitive, so `"admin"` does not satisfy a requirement for `"Admin"`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`RoleName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleNameError {
    #[error("role name cannot be empty")]
    Empty,
    #[error("role name must be at most {max} characters")]
    TooLong { max: usize },
    #[error("role name cannot have leading or trailing whitespace")]
    Untrimmed,
}

/// The name of a role, such as `Admin` or `ReadOnly`.
///
/// ```
/// use ticketdesk_core::RoleName;
///
/// let admin = RoleName::parse("Admin").unwrap();
/// assert_eq!(admin, RoleName::admin());
/// assert_ne!(RoleName::parse("admin").unwrap(), RoleName::admin());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Maximum length of a role name.
    pub const MAX_LENGTH: usize = 64;

    pub const ADMIN: &'static str = "Admin";
    pub const USER: &'static str = "User";
    pub const MODERATOR: &'static str = "Moderator";
    pub const READ_ONLY: &'static str = "ReadOnly";

    /// Parse a `RoleName` from a string.
    ///
    /// # Errors
    ///
    /// Returns a [`RoleNameError`] if the name is empty, too long, or carries
    /// surrounding whitespace.
    pub fn parse(s: &str) -> Result<Self, RoleNameError> {
        if s.is_empty() {
            return Err(RoleNameError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(RoleNameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.trim() != s {
            return Err(RoleNameError::Untrimmed);
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn admin() -> Self {
        Self(Self::ADMIN.to_owned())
    }

    #[must_use]
    pub fn user() -> Self {
        Self(Self::USER.to_owned())
    }

    #[must_use]
    pub fn moderator() -> Self {
        Self(Self::MODERATOR.to_owned())
    }

    #[must_use]
    pub fn read_only() -> Self {
        Self(Self::READ_ONLY.to_owned())
    }

    /// Returns the role name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoleName {
    type Err = RoleNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoleName {
    type Error = RoleNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoleName> for String {
    fn from(role: RoleName) -> Self {
        role.0
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for RoleName {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for RoleName {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for RoleName {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
