//! Authorization gate tests over the real route table.

use axum::http::{Method, StatusCode};
use chrono::{TimeDelta, Utc};

use ticketdesk_integration_tests::TestApp;

fn assert_rejected(status: StatusCode, body: &[u8]) {
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.is_empty(), "denials carry no body");
}

// =============================================================================
// Policy Matrix
// =============================================================================

#[tokio::test]
async fn test_admin_only_endpoint() {
    let app = TestApp::new();
    let now = Utc::now();

    let admin = app.forge_session("admin@x.com", &["Admin"], now);
    let user = app.forge_session("user@x.com", &["User"], now);
    let reader = app.forge_session("reader@x.com", &["ReadOnly"], now);
    let nobody = app.forge_session("nobody@x.com", &[], now);

    assert_eq!(app.get("/users", Some(&admin)).await.status, StatusCode::OK);

    for cookie in [&user, &reader, &nobody] {
        let response = app.get("/users", Some(cookie)).await;
        assert_rejected(response.status, &response.body);
    }
}

#[tokio::test]
async fn test_union_policy_admits_either_role() {
    let app = TestApp::new();
    let now = Utc::now();
    let ticket = serde_json::json!({
        "cep": "01001-000",
        "cidade": "São Paulo",
        "bairro": "Sé",
        "rua": "Praça da Sé",
        "contribuinte": "Maria",
        "telefone": "11999990000",
        "dataDoPedido": "2024-03-01",
        "statusDoPedido": "Aberto",
        "os": "OS-1"
    });

    for roles in [&["Admin"][..], &["User"][..], &["Admin", "User"][..]] {
        let cookie = app.forge_session("a@x.com", roles, now);
        let response = app
            .request(Method::POST, "/tickets", Some(&cookie), Some(ticket.clone()))
            .await;
        assert_eq!(response.status, StatusCode::OK, "roles {roles:?}");
    }

    let moderator = app.forge_session("m@x.com", &["Moderator"], now);
    let response = app
        .request(Method::POST, "/tickets", Some(&moderator), Some(ticket))
        .await;
    assert_rejected(response.status, &response.body);
}

#[tokio::test]
async fn test_same_path_different_policies() {
    let app = TestApp::new();
    let now = Utc::now();
    let admin = app.forge_session("admin@x.com", &["Admin"], now);
    let user = app.forge_session("user@x.com", &["User"], now);

    // Listing tickets is `User` only; `Admin` alone does not qualify.
    assert_eq!(app.get("/tickets", Some(&user)).await.status, StatusCode::OK);
    let response = app.get("/tickets", Some(&admin)).await;
    assert_rejected(response.status, &response.body);
}

#[tokio::test]
async fn test_role_names_match_exactly() {
    let app = TestApp::new();
    let lowercase = app.forge_session("a@x.com", &["admin"], Utc::now());
    let response = app.get("/users", Some(&lowercase)).await;
    assert_rejected(response.status, &response.body);
}

// =============================================================================
// Session Validity
// =============================================================================

#[tokio::test]
async fn test_missing_and_garbage_cookies_are_rejected() {
    let app = TestApp::new();

    let response = app.get("/users/current", None).await;
    assert_rejected(response.status, &response.body);

    let response = app
        .get("/users/current", Some("ticketdesk_session=bm90LWEtc2Vzc2lvbg"))
        .await;
    assert_rejected(response.status, &response.body);
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let app = TestApp::new();
    let stale = app.forge_session("admin@x.com", &["Admin"], Utc::now() - TimeDelta::hours(25));

    for path in ["/users/current", "/users", "/roles"] {
        let response = app.get(path, Some(&stale)).await;
        assert_rejected(response.status, &response.body);
    }
}

#[tokio::test]
async fn test_session_near_expiry_is_accepted() {
    let app = TestApp::new();
    let aging = app.forge_session(
        "admin@x.com",
        &["Admin"],
        Utc::now() - TimeDelta::hours(23) - TimeDelta::minutes(59),
    );
    assert_eq!(app.get("/users", Some(&aging)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_cookie_from_another_deployment_is_rejected() {
    let app = TestApp::new();
    let other = TestApp::new();
    // Same secret in both test apps, so rebuild one with a different key.
    let foreign = ticketdesk_server::middleware::SessionIssuer::new(
        &secrecy::SecretString::from("Wm4!pX8@".repeat(8)),
        true,
    )
    .expect("64 byte secret");
    let principal = ticketdesk_server::models::Principal {
        email: ticketdesk_core::Email::parse("admin@x.com").expect("valid email"),
        roles: [ticketdesk_core::RoleName::admin()].into_iter().collect(),
    };
    let cookie = foreign
        .issue(principal, Utc::now())
        .expect("issue")
        .stripped()
        .to_string();

    let response = app.get("/users", Some(&cookie)).await;
    assert_rejected(response.status, &response.body);

    // A cookie from an app sharing the key is accepted.
    let shared = other.forge_session("admin@x.com", &["Admin"], Utc::now());
    assert_eq!(app.get("/users", Some(&shared)).await.status, StatusCode::OK);
}

// =============================================================================
// Frozen Claims
// =============================================================================

#[tokio::test]
async fn test_role_grant_applies_at_next_login() {
    let app = TestApp::new();
    let user = app.seed_user("a@x.com", "secret1", &[]).await;
    let before = app.login("a@x.com", "secret1").await;

    let claims = app.get("/users/current", Some(&before)).await.json();
    assert_eq!(claims["roles"], serde_json::json!([]));

    let root = app.forge_session("root@x.com", &["Admin"], Utc::now());
    let granted = app
        .request(Method::POST, &format!("/user/{}/roles/1", user.id), Some(&root), None)
        .await;
    assert_eq!(granted.status, StatusCode::OK);

    // The old session predates the grant.
    let response = app.get("/users", Some(&before)).await;
    assert_rejected(response.status, &response.body);

    let after = app.login("a@x.com", "secret1").await;
    assert_eq!(app.get("/users", Some(&after)).await.status, StatusCode::OK);
    let claims = app.get("/users/current", Some(&after)).await.json();
    assert_eq!(claims["roles"], serde_json::json!(["Admin"]));
}

#[tokio::test]
async fn test_role_revocation_does_not_reach_live_session() {
    let app = TestApp::new();
    let user = app.seed_user("a@x.com", "secret1", &["Admin"]).await;
    let session = app.login("a@x.com", "secret1").await;

    let revoked = app
        .request(
            Method::DELETE,
            &format!("/user/{}/roles/1", user.id),
            Some(&session),
            None,
        )
        .await;
    assert_eq!(revoked.status, StatusCode::OK);
    assert_eq!(revoked.json()["roles"], serde_json::json!([]));

    // Claims were frozen at login.
    assert_eq!(app.get("/users", Some(&session)).await.status, StatusCode::OK);

    let fresh = app.login("a@x.com", "secret1").await;
    let response = app.get("/users", Some(&fresh)).await;
    assert_rejected(response.status, &response.body);
}
