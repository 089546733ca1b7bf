//! Domain models for the ticket desk.
//!
//! These types are validated domain objects, separate from database row
//! types and from HTTP response bodies.

pub mod role;
pub mod session;
pub mod ticket;
pub mod user;

pub use role::Role;
pub use session::{Principal, SessionPayload};
pub use ticket::{Ticket, TicketDetails, TicketFieldError};
pub use user::{NewUser, User, UserUpdate};
