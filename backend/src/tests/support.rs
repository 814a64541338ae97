use axum::http::StatusCode;
use axum::http::header;
use axum_test::{TestResponse, TestServer};
use serde_json::Value;
use serde_json::json;

use crate::app;
use crate::auth;
use crate::cfg;
use crate::core;
use crate::db;

pub const PASSWORD: &str = "correct-horse-battery";
pub const SUPER_ADMIN_EMAIL: &str = "root@platform.test";

pub struct TestApp {
    pub server: TestServer,
    pub context: core::ArcContext,
}

/// Identity of a freshly registered tenant and its admin.
pub struct RegisteredTenant {
    pub tenant_id: String,
    pub subdomain: String,
    pub admin_id: String,
    pub admin_email: String,
    pub admin_token: String,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(cfg::AppSettings::default()).await
}

pub async fn spawn_app_with(mut settings: cfg::AppSettings) -> TestApp {
    // a single connection keeps the in-memory database alive and shared
    settings.database = cfg::DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        run_migrations_on_startup: true,
    };

    let db = core::create_db_context(&settings.database).await.unwrap();
    app::run_migrations(&db).await.unwrap();

    let jwt = auth::JwtContext::new(&settings.jwt, "test__secret__key__for__jwt__testing").unwrap();
    let context = core::Context::new(db, jwt, settings);
    let server = TestServer::new(app::create_router(context.clone())).unwrap();
    TestApp { server, context }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn data(response: &TestResponse) -> Value {
    response.json::<Value>()["data"].clone()
}

pub fn message(response: &TestResponse) -> String {
    response.json::<Value>()["message"].as_str().unwrap_or_default().to_string()
}

impl TestApp {
    pub async fn register_tenant(&self, subdomain: &str) -> RegisteredTenant {
        let admin_email = format!("admin@{subdomain}.test");
        let response = self
            .server
            .post("/api/auth/register-tenant")
            .json(&json!({
                "tenantName": format!("{subdomain} Inc"),
                "subdomain": subdomain,
                "adminEmail": admin_email,
                "adminPassword": PASSWORD,
                "adminFullName": format!("{subdomain} Admin"),
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body = data(&response);
        let tenant_id = body["tenantId"].as_str().unwrap().to_string();
        let admin_id = body["adminUser"]["id"].as_str().unwrap().to_string();
        let admin_token = self.login(&admin_email, PASSWORD, Some(subdomain)).await;

        RegisteredTenant { tenant_id, subdomain: subdomain.to_string(), admin_id, admin_email, admin_token }
    }

    pub async fn login(&self, email: &str, password: &str, subdomain: Option<&str>) -> String {
        let mut payload = json!({ "email": email, "password": password });
        if let Some(subdomain) = subdomain {
            payload["tenantSubdomain"] = json!(subdomain);
        }

        let response = self.server.post("/api/auth/login").json(&payload).await;
        response.assert_status_ok();
        data(&response)["token"].as_str().unwrap().to_string()
    }

    /// Super admins are only created out of band, so tests insert one directly.
    pub async fn super_admin_token(&self) -> String {
        if db::get_super_admin_by_email(&self.context.db, SUPER_ADMIN_EMAIL).await.unwrap().is_none() {
            let password_hash = auth::hash_password(PASSWORD).unwrap();
            let new_user = db::NewUser {
                tenant_id: None,
                email: SUPER_ADMIN_EMAIL.to_string(),
                password_hash,
                full_name: "Platform Root".to_string(),
                role: db::Role::SuperAdmin,
            };
            db::insert_user(&self.context.db, new_user).await.unwrap();
        }
        self.login(SUPER_ADMIN_EMAIL, PASSWORD, None).await
    }

    /// Creates a plain member in the tenant and returns `(user_id, token)`.
    pub async fn add_member(&self, tenant: &RegisteredTenant, name: &str) -> (String, String) {
        let email = format!("{name}@{}.test", tenant.subdomain);
        let response = self
            .server
            .post(&format!("/api/tenants/{}/users", tenant.tenant_id))
            .add_header(header::AUTHORIZATION, bearer(&tenant.admin_token))
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "fullName": name,
                "role": "user",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let user_id = data(&response)["id"].as_str().unwrap().to_string();
        let token = self.login(&email, PASSWORD, Some(&tenant.subdomain)).await;
        (user_id, token)
    }

    pub async fn create_project(&self, token: &str, name: &str) -> String {
        let response = self
            .server
            .post("/api/projects")
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&json!({ "name": name }))
            .await;
        response.assert_status(StatusCode::CREATED);
        data(&response)["id"].as_str().unwrap().to_string()
    }

    pub async fn create_task(&self, token: &str, project_id: &str, payload: Value) -> TestResponse {
        self.server
            .post(&format!("/api/projects/{project_id}/tasks"))
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&payload)
            .await
    }
}
