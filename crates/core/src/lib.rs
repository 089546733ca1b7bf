//! Ticketdesk Core - Shared types library.
//!
//! This crate provides common types used across all Ticketdesk components:
//! - `server` - The ticket-tracking HTTP backend
//! - `cli` - Command-line tools for migrations and operator bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and role names

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
