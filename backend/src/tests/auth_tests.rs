use axum::http::StatusCode;
use axum::http::header;
use axum::http::HeaderName;
use serde_json::Value;
use serde_json::json;

use crate::db;
use crate::tests::support::{PASSWORD, SUPER_ADMIN_EMAIL, bearer, data, message, spawn_app};

fn registration(subdomain: &str, email: &str) -> Value {
    json!({
        "tenantName": "Acme Corp",
        "subdomain": subdomain,
        "adminEmail": email,
        "adminPassword": PASSWORD,
        "adminFullName": "Alice Admin",
    })
}

#[tokio::test]
async fn test_register_tenant_success() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/auth/register-tenant")
        .json(&registration("Acme", "Alice@Acme.test"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Tenant registered successfully");
    assert_eq!(body["data"]["subdomain"], "acme");
    assert_eq!(body["data"]["adminUser"]["email"], "alice@acme.test");
    assert_eq!(body["data"]["adminUser"]["role"], "tenant_admin");
    assert!(body["data"]["adminUser"].get("passwordHash").is_none());

    let tenant_id = body["data"]["tenantId"].as_str().unwrap();
    let tenant = db::get_tenant_by_id(&app.context.db, tenant_id).await.unwrap().unwrap();
    assert_eq!(tenant.subscription_plan, db::SubscriptionPlan::Free);
    assert_eq!(tenant.status, db::TenantStatus::Active);
    assert_eq!((tenant.max_users, tenant.max_projects), (5, 10));

    let logs = db::list_audit_logs_for_entity(&app.context.db, tenant_id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, "REGISTER_TENANT");
}

#[tokio::test]
async fn test_register_tenant_missing_fields() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/auth/register-tenant")
        .json(&json!({ "tenantName": "Acme", "subdomain": "acme" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "All fields are required");
}

#[tokio::test]
async fn test_register_tenant_rejects_invalid_input() {
    let app = spawn_app().await;

    let mut payload = registration("bad_sub!", "alice@acme.test");
    let response = app.server.post("/api/auth/register-tenant").json(&payload).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    payload = registration("acme", "not-an-email");
    let response = app.server.post("/api/auth/register-tenant").json(&payload).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Invalid email address");

    payload = registration("acme", "alice@acme.test");
    payload["adminPassword"] = json!("short");
    let response = app.server.post("/api/auth/register-tenant").json(&payload).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Password must be at least 8 characters");
}

#[tokio::test]
async fn test_register_tenant_duplicate_subdomain_or_email() {
    let app = spawn_app().await;
    app.register_tenant("acme").await;

    let response = app
        .server
        .post("/api/auth/register-tenant")
        .json(&registration("acme", "someone@else.test"))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(message(&response), "Subdomain or email already exists");

    let response = app
        .server
        .post("/api/auth/register-tenant")
        .json(&registration("globex", "admin@acme.test"))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_success() {
    let app = spawn_app().await;
    let tenant = app.register_tenant("acme").await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({
            "email": "ADMIN@acme.test",
            "password": PASSWORD,
            "tenantSubdomain": "acme",
        }))
        .await;

    response.assert_status_ok();
    let body = data(&response);
    assert!(body["token"].is_string());
    assert_eq!(body["expiresIn"], 24 * 60 * 60);
    assert_eq!(body["user"]["id"], tenant.admin_id.as_str());
    assert_eq!(body["user"]["tenantId"], tenant.tenant_id.as_str());
    assert_eq!(body["user"]["role"], "tenant_admin");
}

#[tokio::test]
async fn test_login_by_tenant_id() {
    let app = spawn_app().await;
    let tenant = app.register_tenant("acme").await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({
            "email": tenant.admin_email,
            "password": PASSWORD,
            "tenantId": tenant.tenant_id,
        }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = spawn_app().await;
    app.register_tenant("acme").await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({
            "email": "admin@acme.test",
            "password": "wrong_password",
            "tenantSubdomain": "acme",
        }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(message(&response), "Invalid credentials");

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({
            "email": "nobody@acme.test",
            "password": PASSWORD,
            "tenantSubdomain": "acme",
        }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_missing_fields() {
    let app = spawn_app().await;

    let response = app.server.post("/api/auth/login").json(&json!({ "email": "a@b.test" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Email and password are required");
}

#[tokio::test]
async fn test_tenant_user_must_name_tenant() {
    let app = spawn_app().await;
    app.register_tenant("acme").await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "admin@acme.test", "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Tenant users must login with tenantSubdomain");

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ghost@nowhere.test", "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_unknown_or_suspended_tenant() {
    let app = spawn_app().await;
    let tenant = app.register_tenant("acme").await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "admin@acme.test", "password": PASSWORD, "tenantSubdomain": "nope" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(message(&response), "Tenant not found");

    let root = app.super_admin_token().await;
    app.server
        .put(&format!("/api/tenants/{}", tenant.tenant_id))
        .add_header(header::AUTHORIZATION, bearer(&root))
        .json(&json!({ "status": "suspended" }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "admin@acme.test", "password": PASSWORD, "tenantSubdomain": "acme" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(message(&response), "Tenant is not active");
}

#[tokio::test]
async fn test_super_admin_login() {
    let app = spawn_app().await;
    app.register_tenant("acme").await;
    let token = app.super_admin_token().await;

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body = data(&response);
    assert_eq!(body["email"], SUPER_ADMIN_EMAIL);
    assert_eq!(body["role"], "super_admin");
    assert!(body["tenant"].is_null());

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": SUPER_ADMIN_EMAIL, "password": PASSWORD, "tenantSubdomain": "acme" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Super admin must login without tenantSubdomain");
}

#[tokio::test]
async fn test_me_returns_profile_with_tenant() {
    let app = spawn_app().await;
    let tenant = app.register_tenant("acme").await;

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(header::AUTHORIZATION, bearer(&tenant.admin_token))
        .await;

    response.assert_status_ok();
    let body = data(&response);
    assert_eq!(body["id"], tenant.admin_id.as_str());
    assert_eq!(body["isActive"], true);
    assert_eq!(body["tenant"]["id"], tenant.tenant_id.as_str());
    assert_eq!(body["tenant"]["subdomain"], "acme");
    assert_eq!(body["tenant"]["subscriptionPlan"], "free");
    assert_eq!(body["tenant"]["maxProjects"], 10);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = spawn_app().await;

    let response = app.server.get("/api/auth/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(message(&response), "No token provided");

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(header::AUTHORIZATION, "Bearer invalid_token")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(message(&response), "Token invalid or expired");
}

#[tokio::test]
async fn test_token_of_deleted_user_is_rejected() {
    let app = spawn_app().await;
    let tenant = app.register_tenant("acme").await;
    let (member_id, member_token) = app.add_member(&tenant, "bob").await;

    db::delete_user(&app.context.db, &member_id).await.unwrap();

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(header::AUTHORIZATION, bearer(&member_token))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(message(&response), "Invalid token");
}

#[tokio::test]
async fn test_deactivated_user_token_is_forbidden() {
    let app = spawn_app().await;
    let tenant = app.register_tenant("acme").await;
    let (member_id, member_token) = app.add_member(&tenant, "bob").await;

    app.server
        .put(&format!("/api/users/{member_id}"))
        .add_header(header::AUTHORIZATION, bearer(&tenant.admin_token))
        .json(&json!({ "isActive": false }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .get("/api/auth/me")
        .add_header(header::AUTHORIZATION, bearer(&member_token))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(message(&response), "Account inactive");

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "bob@acme.test", "password": PASSWORD, "tenantSubdomain": "acme" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_records_audit_entry() {
    let app = spawn_app().await;
    let tenant = app.register_tenant("acme").await;

    let response = app
        .server
        .post("/api/auth/logout")
        .add_header(header::AUTHORIZATION, bearer(&tenant.admin_token))
        .add_header(HeaderName::from_static("x-forwarded-for"), "203.0.113.7, 10.0.0.1")
        .await;

    response.assert_status_ok();
    assert_eq!(message(&response), "Logged out successfully");

    let logs = db::list_audit_logs_for_entity(&app.context.db, &tenant.admin_id).await.unwrap();
    let logout = logs.iter().find(|log| log.action == "LOGOUT").unwrap();
    assert_eq!(logout.entity_type.as_deref(), Some("auth"));
    assert_eq!(logout.tenant_id.as_deref(), Some(tenant.tenant_id.as_str()));
    assert_eq!(logout.user_id.as_deref(), Some(tenant.admin_id.as_str()));
    assert_eq!(logout.ip_address.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let response = app.server.get("/api/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = spawn_app().await;
    app.server.get("/api/does-not-exist").await.assert_status(StatusCode::NOT_FOUND);
}
