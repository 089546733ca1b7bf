//! Business logic services.
//!
//! - [`auth`] - Credential verification, password hashing and registration

pub mod auth;
