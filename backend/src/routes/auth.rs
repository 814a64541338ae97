use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::auth::{self, Principal, TenantSnapshot};
use crate::core::{self, ApiError, ApiResponse, AppJson, ArcContext};
use crate::db::{self, NewTenant, NewUser, Role, SubscriptionPlan, TenantStatus, User};
use crate::services::audit::{self, AuditAction, AuditEntry, ClientIp};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTenantRequest {
    pub tenant_name: Option<String>,
    pub subdomain: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_full_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredAdmin {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredTenant {
    pub tenant_id: String,
    pub subdomain: String,
    pub admin_user: RegisteredAdmin,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub tenant_subdomain: Option<String>,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub tenant: Option<TenantSnapshot>,
}

/// Creates a tenant and its first tenant admin in one transaction.
pub async fn register_tenant(
    State(context): State<ArcContext>,
    ip: ClientIp,
    AppJson(request): AppJson<RegisterTenantRequest>,
) -> Result<(StatusCode, ApiResponse<RegisteredTenant>), ApiError> {
    const ALL_REQUIRED: &str = "All fields are required";
    let tenant_name = core::required(request.tenant_name.as_deref(), ALL_REQUIRED)?;
    let subdomain = core::required(request.subdomain.as_deref(), ALL_REQUIRED)?.to_lowercase();
    let admin_email = core::required(request.admin_email.as_deref(), ALL_REQUIRED)?;
    let admin_full_name = core::required(request.admin_full_name.as_deref(), ALL_REQUIRED)?;
    let admin_password = request
        .admin_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation(ALL_REQUIRED))?;

    core::validate_subdomain(&subdomain)?;
    let admin_email = core::normalize_email(&admin_email)?;
    core::validate_password(&admin_password)?;

    let password_hash = auth::hash_password_blocking(admin_password).await?;
    let tenancy = &context.settings.tenancy;

    let mut tx = context.db.begin().await.map_err(core::DbError::from)?;

    let subdomain_taken = db::get_tenant_by_subdomain(&mut *tx, &subdomain).await?.is_some();
    if subdomain_taken || db::email_exists(&mut *tx, &admin_email).await? {
        return Err(ApiError::conflict("Subdomain or email already exists"));
    }

    let tenant = db::insert_tenant(
        &mut *tx,
        NewTenant {
            name: tenant_name,
            subdomain,
            status: TenantStatus::Active,
            subscription_plan: SubscriptionPlan::Free,
            max_users: tenancy.default_max_users,
            max_projects: tenancy.default_max_projects,
        },
    )
    .await?;

    let admin = db::insert_user(
        &mut *tx,
        NewUser {
            tenant_id: Some(tenant.id.clone()),
            email: admin_email,
            password_hash,
            full_name: admin_full_name,
            role: Role::TenantAdmin,
        },
    )
    .await?;

    tx.commit().await.map_err(core::DbError::from)?;
    tracing::info!(tenant_id = %tenant.id, subdomain = %tenant.subdomain, "Tenant registered");

    audit::record(
        &context.db,
        AuditEntry {
            action: AuditAction::RegisterTenant,
            entity_id: &tenant.id,
            tenant_id: Some(&tenant.id),
            user_id: Some(&admin.id),
            ip_address: ip.0.as_deref(),
        },
    )
    .await;

    let data = RegisteredTenant {
        tenant_id: tenant.id,
        subdomain: tenant.subdomain,
        admin_user: RegisteredAdmin {
            id: admin.id,
            email: admin.email,
            full_name: admin.full_name,
            role: admin.role,
        },
    };
    Ok((StatusCode::CREATED, ApiResponse::ok(data).with_message("Tenant registered successfully")))
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid credentials")
}

/// Resolves the account a login request refers to, without checking the password.
async fn resolve_login_user(context: &ArcContext, request: &LoginRequest, email: &str) -> Result<User, ApiError> {
    let subdomain = request.tenant_subdomain.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let tenant_id = request.tenant_id.as_deref().map(str::trim).filter(|s| !s.is_empty());

    if subdomain.is_none() && tenant_id.is_none() {
        if let Some(user) = db::get_super_admin_by_email(&context.db, email).await? {
            return if user.is_active { Ok(user) } else { Err(invalid_credentials()) };
        }
        if db::email_exists(&context.db, email).await? {
            return Err(ApiError::validation("Tenant users must login with tenantSubdomain"));
        }
        return Err(invalid_credentials());
    }

    let tenant = match subdomain {
        Some(subdomain) => db::get_tenant_by_subdomain(&context.db, &subdomain.to_lowercase()).await?,
        None => db::get_tenant_by_id(&context.db, tenant_id.unwrap_or_default()).await?,
    }
    .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    if tenant.status != TenantStatus::Active {
        return Err(ApiError::forbidden("Tenant is not active"));
    }

    match db::get_user_in_tenant_by_email(&context.db, &tenant.id, email).await? {
        Some(user) if user.is_active => Ok(user),
        Some(_) => Err(invalid_credentials()),
        None if db::get_super_admin_by_email(&context.db, email).await?.is_some() => {
            Err(ApiError::validation("Super admin must login without tenantSubdomain"))
        }
        None => Err(invalid_credentials()),
    }
}

pub async fn login(
    State(context): State<ArcContext>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let user = resolve_login_user(&context, &request, &email).await?;

    if !auth::verify_password_blocking(request.password, user.password_hash.clone()).await? {
        tracing::warn!(user_id = %user.id, "Invalid password");
        return Err(invalid_credentials());
    }

    let token = auth::generate_access_token(&context.jwt, &user.id, user.tenant_id.as_deref(), user.role)?;
    tracing::info!(user_id = %user.id, tenant_id = ?user.tenant_id, role = %user.role, "User logged in");

    Ok(ApiResponse::ok(LoginResponse {
        user: PublicUser {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            tenant_id: user.tenant_id,
        },
        token,
        expires_in: context.jwt.access_token_expiry,
    }))
}

#[allow(clippy::unused_async)]
pub async fn me(principal: Principal) -> ApiResponse<Profile> {
    ApiResponse::ok(Profile {
        id: principal.id,
        email: principal.email,
        full_name: principal.full_name,
        role: principal.role,
        is_active: true,
        tenant: principal.tenant,
    })
}

/// Tokens are stateless; logout only leaves an audit trail.
pub async fn logout(State(context): State<ArcContext>, principal: Principal, ip: ClientIp) -> ApiResponse<()> {
    audit::record(&context.db, AuditEntry::by(&principal, &ip, AuditAction::Logout, &principal.id)).await;
    tracing::info!(user_id = %principal.id, "Logout");
    ApiResponse::message("Logged out successfully")
}
