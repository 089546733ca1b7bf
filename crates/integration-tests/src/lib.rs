//! Integration tests for Ticketdesk.
//!
//! The full router, middleware stack included, is driven in-process with
//! `tower::ServiceExt::oneshot` over the in-memory store. No database or
//! listening socket is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ticketdesk-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_cookies::cookie::Cookie;
use url::Url;

use ticketdesk_core::{Email, RoleId, RoleName, UserId};
use ticketdesk_server::config::{LogFormat, RegistrationPolicy, ServerConfig};
use ticketdesk_server::db::{IdentityStore, MemoryStore, RepositoryError};
use ticketdesk_server::middleware::SESSION_COOKIE;
use ticketdesk_server::models::{NewUser, Principal, Role, SessionPayload, User, UserUpdate};
use ticketdesk_server::routes::API_PREFIX;
use ticketdesk_server::services::auth::AuthService;
use ticketdesk_server::state::AppState;

/// Session key used by every test app.
const TEST_SESSION_SECRET: &str =
    "q7Vn2#Lk9$Rw4@Tz8!Hb3%Mx6^Pc1&Fj5*Gd0(Ys7)Ue2_Ia9+Ko4=Nr8~Ql3?Wt6";

/// Configuration for an in-process server on the memory store.
#[must_use]
pub fn test_config(registration: RegistrationPolicy) -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("memory://"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 8080,
        base_url: Url::parse("https://api.ticketdesk.test").expect("valid url"),
        allowed_origins: vec![Url::parse("http://localhost:4200").expect("valid url")],
        session_secret: SecretString::from(TEST_SESSION_SECRET),
        registration,
        log_format: LogFormat::Text,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A router plus direct access to the store behind it.
pub struct TestApp {
    router: Router,
    state: AppState,
    store: Arc<MemoryStore>,
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<String>,
    pub body: Bytes,
}

impl TestResponse {
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    /// The session cookie set by this response, parsed with its attributes.
    #[must_use]
    pub fn session_cookie(&self) -> Option<Cookie<'static>> {
        self.set_cookies
            .iter()
            .filter_map(|raw| Cookie::parse(raw.clone()).ok())
            .find(|c| c.name() == SESSION_COOKIE)
    }
}

impl TestApp {
    /// App with `Admin`-gated registration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registration(RegistrationPolicy::AdminOnly)
    }

    #[must_use]
    pub fn with_registration(registration: RegistrationPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::build(registration, store.clone(), store)
    }

    /// App whose identity lookups go to `identity` instead of the memory store.
    #[must_use]
    pub fn with_identity(identity: Arc<dyn IdentityStore>) -> Self {
        Self::build(RegistrationPolicy::AdminOnly, identity, Arc::new(MemoryStore::new()))
    }

    fn build(
        registration: RegistrationPolicy,
        identity: Arc<dyn IdentityStore>,
        store: Arc<MemoryStore>,
    ) -> Self {
        let state = AppState::new(test_config(registration), identity, store.clone())
            .expect("test secret is long enough");
        let router = ticketdesk_server::app(state.clone()).expect("standard policies resolve");
        Self {
            router,
            state,
            store,
        }
    }

    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Send a request to `/api/v1{path}`.
    ///
    /// `cookie` is the `name=value` pair to send in the `Cookie` header.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{API_PREFIX}{path}"));
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("valid request"))
            .await
            .expect("router is infallible");

        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(String::from))
            .collect();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();

        TestResponse {
            status,
            set_cookies,
            body,
        }
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, cookie, None).await
    }

    pub async fn login_response(&self, email: &str, password: &str) -> TestResponse {
        let body = serde_json::json!({ "email": email, "password": password });
        self.request(Method::POST, "/login", None, Some(body)).await
    }

    /// Log in and return the `name=value` pair of the session cookie.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self.login_response(email, password).await;
        assert_eq!(response.status, StatusCode::OK, "login for {email} failed");
        let cookie = response.session_cookie().expect("login sets the session cookie");
        cookie.stripped().to_string()
    }

    /// Create a user directly in the store and grant it the named roles.
    pub async fn seed_user(&self, email: &str, password: &str, roles: &[&str]) -> User {
        let user = AuthService::new(self.store.as_ref())
            .register_with_password(email, password)
            .await
            .expect("seed user");

        for name in roles {
            let name = RoleName::parse(name).expect("valid role name");
            let role = self
                .store
                .find_role_by_name(&name)
                .await
                .expect("store lookup")
                .expect("role is seeded");
            self.store
                .grant_role(user.id, role.id)
                .await
                .expect("grant seeded role");
        }

        self.store
            .find_user_by_id(user.id)
            .await
            .expect("store lookup")
            .expect("user just created")
    }

    /// Seal a session issued at `issued_at` without going through login.
    #[must_use]
    pub fn forge_session(&self, email: &str, roles: &[&str], issued_at: DateTime<Utc>) -> String {
        let principal = Principal {
            email: Email::parse(email).expect("valid email"),
            roles: roles
                .iter()
                .map(|r| RoleName::parse(r).expect("valid role name"))
                .collect(),
        };
        let payload = SessionPayload::issue(principal, issued_at);
        self.state
            .sessions()
            .seal(&payload)
            .expect("payload seals")
            .stripped()
            .to_string()
    }
}

/// An identity store whose backend never answers.
#[derive(Debug, Default)]
pub struct UnavailableStore;

fn unavailable<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl IdentityStore for UnavailableStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        unavailable()
    }

    async fn find_user_by_email(&self, _: &Email) -> Result<Option<User>, RepositoryError> {
        unavailable()
    }

    async fn find_user_by_id(&self, _: UserId) -> Result<Option<User>, RepositoryError> {
        unavailable()
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        unavailable()
    }

    async fn create_user(&self, _: NewUser) -> Result<User, RepositoryError> {
        unavailable()
    }

    async fn update_user(&self, _: UserUpdate) -> Result<User, RepositoryError> {
        unavailable()
    }

    async fn delete_user(&self, _: UserId) -> Result<User, RepositoryError> {
        unavailable()
    }

    async fn find_role_by_id(&self, _: RoleId) -> Result<Option<Role>, RepositoryError> {
        unavailable()
    }

    async fn find_role_by_name(&self, _: &RoleName) -> Result<Option<Role>, RepositoryError> {
        unavailable()
    }

    async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        unavailable()
    }

    async fn create_role(&self, _: RoleName) -> Result<Role, RepositoryError> {
        unavailable()
    }

    async fn update_role(&self, _: Role) -> Result<Role, RepositoryError> {
        unavailable()
    }

    async fn delete_role(&self, _: RoleId) -> Result<Role, RepositoryError> {
        unavailable()
    }

    async fn grant_role(&self, _: UserId, _: RoleId) -> Result<User, RepositoryError> {
        unavailable()
    }

    async fn revoke_role(&self, _: UserId, _: RoleId) -> Result<User, RepositoryError> {
        unavailable()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
