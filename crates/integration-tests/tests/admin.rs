//! Registration, user/role administration and ticket endpoint tests.

use axum::http::{Method, StatusCode};
use chrono::Utc;
use serde_json::json;

use ticketdesk_integration_tests::TestApp;
use ticketdesk_server::config::RegistrationPolicy;

fn admin(app: &TestApp) -> String {
    app.forge_session("root@x.com", &["Admin"], Utc::now())
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_registration_is_admin_gated_by_default() {
    let app = TestApp::new();
    let body = json!({ "email": "a@x.com", "password": "secret1" });

    let anonymous = app
        .request(Method::POST, "/register", None, Some(body.clone()))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let user = app.forge_session("u@x.com", &["User"], Utc::now());
    let as_user = app
        .request(Method::POST, "/register", Some(&user), Some(body.clone()))
        .await;
    assert_eq!(as_user.status, StatusCode::UNAUTHORIZED);

    let created = app
        .request(Method::POST, "/register", Some(&admin(&app)), Some(body))
        .await;
    assert_eq!(created.status, StatusCode::OK);
    let user = created.json();
    assert_eq!(user["email"], "a@x.com");
    assert_eq!(user["isValid"], false);
    assert_eq!(user["roles"], json!([]));
    assert!(user.get("passwordHash").is_none());
    assert!(!created.text().contains("argon2"));

    assert_eq!(app.login_response("a@x.com", "secret1").await.status, StatusCode::OK);
    assert_eq!(
        app.login_response("a@x.com", "secret2").await.status,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_open_registration() {
    let app = TestApp::with_registration(RegistrationPolicy::Open);
    let body = json!({ "email": "a@x.com", "password": "secret1" });

    let created = app
        .request(Method::POST, "/register", None, Some(body.clone()))
        .await;
    assert_eq!(created.status, StatusCode::OK);

    let duplicate = app.request(Method::POST, "/register", None, Some(body)).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_registration_validation() {
    let app = TestApp::with_registration(RegistrationPolicy::Open);

    let empty_password = app
        .request(
            Method::POST,
            "/register",
            None,
            Some(json!({ "email": "a@x.com", "password": "" })),
        )
        .await;
    assert_eq!(empty_password.status, StatusCode::BAD_REQUEST);

    let bad_email = app
        .request(
            Method::POST,
            "/register",
            None,
            Some(json!({ "email": "a@@x.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Users and Role Assignment
// =============================================================================

#[tokio::test]
async fn test_grant_reports_missing_side() {
    let app = TestApp::new();
    let cookie = admin(&app);
    let user = app.seed_user("a@x.com", "secret1", &[]).await;

    let no_user = app
        .request(Method::POST, "/user/999/roles/1", Some(&cookie), None)
        .await;
    assert_eq!(no_user.status, StatusCode::NOT_FOUND);
    assert_eq!(no_user.text(), "User not exist");

    let no_role = app
        .request(
            Method::POST,
            &format!("/user/{}/roles/999", user.id),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(no_role.status, StatusCode::NOT_FOUND);
    assert_eq!(no_role.text(), "Role not exist");
}

#[tokio::test]
async fn test_grant_is_idempotent() {
    let app = TestApp::new();
    let cookie = admin(&app);
    let user = app.seed_user("a@x.com", "secret1", &[]).await;
    let path = format!("/user/{}/roles/2", user.id);

    for _ in 0..2 {
        let response = app.request(Method::POST, &path, Some(&cookie), None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json()["roles"], json!([{ "id": 2, "name": "User" }]));
    }
}

#[tokio::test]
async fn test_user_roles_are_per_user() {
    let app = TestApp::new();
    let cookie = admin(&app);
    let a = app.seed_user("a@x.com", "secret1", &["User"]).await;
    let b = app.seed_user("b@x.com", "secret1", &["Moderator", "ReadOnly"]).await;

    let roles_a = app.get(&format!("/user/{}/roles", a.id), Some(&cookie)).await;
    assert_eq!(roles_a.json(), json!([{ "id": 2, "name": "User" }]));

    let roles_b = app.get(&format!("/user/{}/roles", b.id), Some(&cookie)).await;
    let names: Vec<_> = roles_b.json()
        .as_array()
        .map(|roles| roles.iter().map(|r| r["name"].clone()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec![json!("Moderator"), json!("ReadOnly")]);
}

#[tokio::test]
async fn test_user_crud() {
    let app = TestApp::new();
    let cookie = admin(&app);
    let user = app.seed_user("a@x.com", "secret1", &[]).await;

    let listed = app.get("/users", Some(&cookie)).await.json();
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let updated = app
        .request(
            Method::PUT,
            "/users",
            Some(&cookie),
            Some(json!({ "id": user.id, "email": "a2@x.com", "isValid": true })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["email"], "a2@x.com");
    assert_eq!(updated.json()["isValid"], true);

    // The hash is untouched by updates.
    assert_eq!(app.login_response("a2@x.com", "secret1").await.status, StatusCode::OK);

    let removed = app
        .request(Method::DELETE, &format!("/users/{}", user.id), Some(&cookie), None)
        .await;
    assert_eq!(removed.status, StatusCode::OK);

    let gone = app.get(&format!("/users/{}", user.id), Some(&cookie)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    let again = app
        .request(Method::DELETE, &format!("/users/{}", user.id), Some(&cookie), None)
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_to_taken_email_conflicts() {
    let app = TestApp::new();
    let cookie = admin(&app);
    app.seed_user("a@x.com", "secret1", &[]).await;
    let b = app.seed_user("b@x.com", "secret1", &[]).await;

    let response = app
        .request(
            Method::PUT,
            "/users",
            Some(&cookie),
            Some(json!({ "id": b.id, "email": "a@x.com", "isValid": true })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

// =============================================================================
// Roles
// =============================================================================

#[tokio::test]
async fn test_role_crud() {
    let app = TestApp::new();
    let cookie = admin(&app);

    let seeded = app.get("/roles", Some(&cookie)).await.json();
    assert_eq!(seeded.as_array().map(Vec::len), Some(4));

    let created = app
        .request(Method::POST, "/roles", Some(&cookie), Some(json!({ "name": "Auditor" })))
        .await;
    assert_eq!(created.status, StatusCode::OK);
    let id = created.json()["id"].clone();

    let duplicate = app
        .request(Method::POST, "/roles", Some(&cookie), Some(json!({ "name": "Auditor" })))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let blank = app
        .request(Method::POST, "/roles", Some(&cookie), Some(json!({ "name": "" })))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let renamed = app
        .request(
            Method::PUT,
            "/roles",
            Some(&cookie),
            Some(json!({ "id": id, "name": "Inspector" })),
        )
        .await;
    assert_eq!(renamed.json()["name"], "Inspector");

    let removed = app
        .request(Method::DELETE, &format!("/roles/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    let gone = app.get(&format!("/roles/{id}"), Some(&cookie)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Tickets
// =============================================================================

fn ticket_body() -> serde_json::Value {
    json!({
        "cep": "01001-000",
        "cidade": "São Paulo",
        "bairro": "Sé",
        "rua": "Praça da Sé",
        "contribuinte": "Maria",
        "telefone": "11999990000",
        "dataDoPedido": "2024-03-01",
        "statusDoPedido": "Aberto",
        "os": "OS-1"
    })
}

#[tokio::test]
async fn test_ticket_lifecycle() {
    let app = TestApp::new();
    let user = app.forge_session("u@x.com", &["User"], Utc::now());

    let created = app
        .request(Method::POST, "/tickets", Some(&user), Some(ticket_body()))
        .await;
    assert_eq!(created.status, StatusCode::OK);
    let mut ticket = created.json();
    assert_eq!(ticket["cidade"], "São Paulo");

    ticket["statusDoPedido"] = json!("Fechado");
    let updated = app
        .request(Method::PUT, "/tickets", Some(&user), Some(ticket.clone()))
        .await;
    assert_eq!(updated.status, StatusCode::OK);

    let listed = app.get("/tickets", Some(&user)).await.json();
    assert_eq!(listed, json!([ticket]));

    let path = format!("/tickets/{}", ticket["id"]);
    let removed = app.request(Method::DELETE, &path, Some(&user), None).await;
    assert_eq!(removed.json(), json!(true));
    let again = app.request(Method::DELETE, &path, Some(&user), None).await;
    assert_eq!(again.json(), json!(false));
}

#[tokio::test]
async fn test_ticket_validation_and_missing_update() {
    let app = TestApp::new();
    let user = app.forge_session("u@x.com", &["User"], Utc::now());

    let mut too_long = ticket_body();
    too_long["cep"] = json!("0123456789");
    let response = app
        .request(Method::POST, "/tickets", Some(&user), Some(too_long))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("cep"));

    let mut missing = ticket_body();
    missing["id"] = json!(4242);
    let response = app
        .request(Method::PUT, "/tickets", Some(&user), Some(missing))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
