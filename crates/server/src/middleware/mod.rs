//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added by the binary)
//! 2. CORS (credentialed, configured origins only)
//! 3. `TraceLayer` (request span with a `request_id` field)
//! 4. Request ID
//! 5. Cookie manager (tower-cookies)
//! 6. Authorization gate (route layer on protected groups only)

pub mod gate;
pub mod request_id;
pub mod session;

pub use gate::{CurrentPrincipal, Guard, PolicyError, PolicyTable, Requirement, require_session};
pub use request_id::request_id_middleware;
pub use session::{SESSION_COOKIE, SessionError, SessionIssuer};
