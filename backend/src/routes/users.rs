use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::auth::{self, Principal};
use crate::core::{self, ApiError, ApiResponse, AppJson, ArcContext, Page, PageRequest};
use crate::db::{self, NewUser, Role, User, UserChanges, UserFilter, parse_optional};
use crate::services::audit::{self, AuditAction, AuditEntry, ClientIp};
use crate::services::quota;

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub role: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// Tenant admins add `user` accounts to their own tenant, within the user quota.
pub async fn create_user(
    State(context): State<ArcContext>,
    principal: Principal,
    ip: ClientIp,
    Path(tenant_id): Path<String>,
    AppJson(request): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, ApiResponse<User>), ApiError> {
    if principal.tenant_id.as_deref() != Some(tenant_id.as_str()) {
        return Err(ApiError::forbidden("Not authorized"));
    }

    let role = parse_optional::<Role>(request.role.as_deref(), "Invalid role")
        .map_err(ApiError::validation)?
        .unwrap_or(Role::User);
    match role {
        Role::SuperAdmin => return Err(ApiError::forbidden("Cannot create super admin")),
        Role::TenantAdmin => return Err(ApiError::forbidden("Only super admin can create tenant admins")),
        Role::User => {}
    }

    let email = core::normalize_email(&core::required(request.email.as_deref(), "Email is required")?)?;
    let full_name = core::required(request.full_name.as_deref(), "Full name is required")?;
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("Password is required"))?;
    core::validate_password(&password)?;

    if db::get_user_in_tenant_by_email(&context.db, &tenant_id, &email).await?.is_some() {
        return Err(ApiError::conflict("Email already exists in this tenant"));
    }

    let password_hash = auth::hash_password_blocking(password).await?;
    let user = quota::create_user(
        &context.db,
        NewUser { tenant_id: Some(tenant_id.clone()), email, password_hash, full_name, role },
    )
    .await?;

    audit::record(&context.db, AuditEntry::by(&principal, &ip, AuditAction::CreateUser, &user.id)).await;
    Ok((StatusCode::CREATED, ApiResponse::ok(user).with_message("User created successfully")))
}

pub async fn list_users(
    State(context): State<ArcContext>,
    principal: Principal,
    Path(tenant_id): Path<String>,
    Query(query): Query<ListUsersQuery>,
) -> Result<ApiResponse<Page<User>>, ApiError> {
    auth::ensure_tenant_scope(&principal, &tenant_id).map_err(|denied| denied.forbidden("Unauthorized access"))?;

    let page = PageRequest::from_query(query.page.as_deref(), query.limit.as_deref(), DEFAULT_PAGE_SIZE);
    let filter = UserFilter {
        role: parse_optional::<Role>(query.role.as_deref(), "Invalid role").map_err(ApiError::validation)?,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };

    let (users, total) = db::list_tenant_users(&context.db, &tenant_id, &filter, page).await?;
    Ok(ApiResponse::ok(Page::new(users, total, page)))
}

pub async fn update_user(
    State(context): State<ArcContext>,
    principal: Principal,
    ip: ClientIp,
    Path(user_id): Path<String>,
    AppJson(request): AppJson<UpdateUserRequest>,
) -> Result<ApiResponse<User>, ApiError> {
    let changes = UserChanges {
        full_name: request
            .full_name
            .map(|name| core::required(Some(name.as_str()), "Full name cannot be empty"))
            .transpose()?,
        role: parse_optional::<Role>(request.role.as_deref(), "Invalid role").map_err(ApiError::validation)?,
        is_active: request.is_active,
    };

    let target = db::get_user_by_id(&context.db, &user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    auth::authorize_user_update(&principal, &target, &changes)?;

    if changes.full_name.is_none() && changes.role.is_none() && changes.is_active.is_none() {
        return Err(ApiError::validation("No valid fields to update"));
    }

    if auth::removes_active_tenant_admin(&target, &changes) {
        let tenant_id = target.tenant_id.as_deref().unwrap_or_default();
        // count-then-update; concurrent demotions of the last two admins can still race
        if db::count_active_tenant_admins(&context.db, tenant_id).await? <= 1 {
            return Err(ApiError::forbidden("Tenant must have at least one tenant admin"));
        }
    }

    let user = db::update_user(&context.db, &target.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    audit::record(&context.db, AuditEntry::by(&principal, &ip, AuditAction::UpdateUser, &user.id)).await;
    Ok(ApiResponse::ok(user).with_message("User updated successfully"))
}

pub async fn delete_user(
    State(context): State<ArcContext>,
    principal: Principal,
    ip: ClientIp,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    if principal.id == user_id {
        return Err(ApiError::forbidden("Cannot delete self"));
    }

    let target = db::get_user_by_id(&context.db, &user_id)
        .await?
        .filter(|user| user.tenant_id.is_some() && user.tenant_id == principal.tenant_id)
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if target.role == Role::TenantAdmin && target.is_active {
        let tenant_id = target.tenant_id.as_deref().unwrap_or_default();
        if db::count_active_tenant_admins(&context.db, tenant_id).await? <= 1 {
            return Err(ApiError::forbidden("Cannot delete the last tenant admin"));
        }
    }

    if !db::delete_user(&context.db, &target.id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    audit::record(&context.db, AuditEntry::by(&principal, &ip, AuditAction::DeleteUser, &target.id)).await;
    Ok(ApiResponse::message("User deleted successfully"))
}
