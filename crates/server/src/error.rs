//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry and logged before responding, and the client only ever
//! sees a fixed message for them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::middleware::SessionError;
use crate::models::TicketFieldError;
use crate::services::auth::AuthError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session could not be minted.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller has no acceptable session. Always sent with an empty body.
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Write would break a uniqueness rule.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TicketFieldError> for AppError {
    fn from(err: TicketFieldError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl AppError {
    fn is_server_fault(&self) -> bool {
        match self {
            Self::Database(err) => !matches!(
                err,
                RepositoryError::NotFound | RepositoryError::Conflict(_)
            ),
            Self::Auth(err) => matches!(err, AuthError::Repository(_) | AuthError::PasswordHash),
            Self::Session(_) | Self::Internal(_) => true,
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        if self.is_server_fault() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_))
            | Self::Auth(AuthError::UserAlreadyExists)
            | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Auth(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        if self.is_server_fault() {
            return INTERNAL_MESSAGE.to_owned();
        }
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_owned(),
            Self::Database(RepositoryError::Conflict(msg))
            | Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_owned(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
                AuthError::EmptyPassword => "Password cannot be empty".to_owned(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_owned()
                }
                _ => INTERNAL_MESSAGE.to_owned(),
            },
            _ => String::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        if status == StatusCode::UNAUTHORIZED {
            return status.into_response();
        }
        (status, self.client_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events on this hub with a user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
