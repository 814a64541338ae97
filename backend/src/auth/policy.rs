use serde::Deserialize;
use thiserror::Error;

use crate::auth::Principal;
use crate::core::ApiError;
use crate::db::{Project, Role, SubscriptionPlan, TenantStatus, TenantUpdate, User, UserChanges, parse_optional};

/// Outcome of a failed tenant-scope check. The endpoint picks 403 or 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("access denied")]
pub struct AccessDenied;

impl AccessDenied {
    pub fn forbidden(self, message: &str) -> ApiError {
        ApiError::forbidden(message)
    }

    pub fn not_found(self, message: &str) -> ApiError {
        ApiError::not_found(message)
    }
}

/// Same tenant, or a super admin.
pub fn ensure_tenant_scope(principal: &Principal, tenant_id: &str) -> Result<(), AccessDenied> {
    if principal.is_super_admin() || principal.tenant_id.as_deref() == Some(tenant_id) {
        Ok(())
    } else {
        Err(AccessDenied)
    }
}

/// Tenant of the caller; principals without one (super admins) are denied.
pub fn require_tenant(principal: &Principal) -> Result<&str, AccessDenied> {
    principal.tenant_id.as_deref().ok_or(AccessDenied)
}

#[must_use]
pub fn can_modify_project(principal: &Principal, project: &Project) -> bool {
    principal.is_tenant_admin() || project.created_by.as_deref() == Some(principal.id.as_str())
}

/// Body of `PUT /tenants/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUpdateFields {
    pub name: Option<String>,
    pub status: Option<String>,
    pub subscription_plan: Option<String>,
    pub max_users: Option<i64>,
    pub max_projects: Option<i64>,
}

fn non_empty_name(name: Option<String>) -> Result<Option<String>, ApiError> {
    match name.map(|n| n.trim().to_string()) {
        Some(n) if n.is_empty() => Err(ApiError::validation("Tenant name cannot be empty")),
        other => Ok(other),
    }
}

fn positive_limit(value: Option<i64>, field: &str) -> Result<Option<i64>, ApiError> {
    match value {
        Some(v) if v < 1 => Err(ApiError::validation(format!("{field} must be a positive integer"))),
        other => Ok(other),
    }
}

/// Turns a tenant update request into the variant the caller's role permits.
pub fn build_tenant_update(
    principal: &Principal,
    tenant_id: &str,
    fields: TenantUpdateFields,
) -> Result<TenantUpdate, ApiError> {
    match principal.role {
        Role::SuperAdmin => {
            let update = TenantUpdate::SuperAdmin {
                name: non_empty_name(fields.name)?,
                status: parse_optional::<TenantStatus>(fields.status.as_deref(), "Invalid tenant status")
                    .map_err(ApiError::validation)?,
                subscription_plan: parse_optional::<SubscriptionPlan>(
                    fields.subscription_plan.as_deref(),
                    "Invalid subscription plan",
                )
                .map_err(ApiError::validation)?,
                max_users: positive_limit(fields.max_users, "maxUsers")?,
                max_projects: positive_limit(fields.max_projects, "maxProjects")?,
            };
            let empty = TenantUpdate::SuperAdmin {
                name: None,
                status: None,
                subscription_plan: None,
                max_users: None,
                max_projects: None,
            };
            if update == empty {
                return Err(ApiError::validation("No valid fields to update"));
            }
            Ok(update)
        }
        Role::TenantAdmin if principal.tenant_id.as_deref() == Some(tenant_id) => {
            let restricted = fields.status.is_some()
                || fields.subscription_plan.is_some()
                || fields.max_users.is_some()
                || fields.max_projects.is_some();
            if restricted {
                return Err(ApiError::forbidden("Tenant admin can only update name"));
            }
            let name = non_empty_name(fields.name)?.ok_or_else(|| ApiError::validation("No valid fields to update"))?;
            Ok(TenantUpdate::TenantAdmin { name })
        }
        Role::TenantAdmin | Role::User => Err(ApiError::forbidden("Unauthorized access")),
    }
}

/// Checks who may apply `changes` to `target`. The last-admin rule needs a
/// database count and is checked separately with [`removes_active_tenant_admin`].
pub fn authorize_user_update(principal: &Principal, target: &User, changes: &UserChanges) -> Result<(), ApiError> {
    if principal.tenant_id != target.tenant_id {
        return Err(ApiError::not_found("User not found"));
    }

    let is_self = principal.id == target.id;
    if !is_self && !principal.is_tenant_admin() {
        return Err(ApiError::forbidden("Not authorized"));
    }

    if (changes.role.is_some() || changes.is_active.is_some()) && !principal.is_tenant_admin() {
        return Err(ApiError::forbidden("Only tenant_admin can update role or status"));
    }

    if changes.role == Some(Role::SuperAdmin) {
        return Err(ApiError::forbidden("Cannot assign super_admin role"));
    }

    Ok(())
}

/// Whether the change would take an active tenant admin out of that role or deactivate it.
#[must_use]
pub fn removes_active_tenant_admin(target: &User, changes: &UserChanges) -> bool {
    let is_active_admin = target.role == Role::TenantAdmin && target.is_active;
    let demoted = changes.role.is_some_and(|role| role != Role::TenantAdmin);
    let deactivated = changes.is_active == Some(false);
    is_active_admin && (demoted || deactivated)
}
