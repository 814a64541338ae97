use std::convert::Infallible;
use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::auth::Principal;
use crate::core::DbContext;
use crate::db::{self, NewAuditLog};

/// Mutating actions recorded in `audit_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    RegisterTenant,
    Logout,
    UpdateTenant,
    CreateUser,
    UpdateUser,
    DeleteUser,
    CreateProject,
    UpdateProject,
    DeleteProject,
    CreateTask,
    UpdateTask,
    UpdateTaskStatus,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RegisterTenant => "REGISTER_TENANT",
            Self::Logout => "LOGOUT",
            Self::UpdateTenant => "UPDATE_TENANT",
            Self::CreateUser => "CREATE_USER",
            Self::UpdateUser => "UPDATE_USER",
            Self::DeleteUser => "DELETE_USER",
            Self::CreateProject => "CREATE_PROJECT",
            Self::UpdateProject => "UPDATE_PROJECT",
            Self::DeleteProject => "DELETE_PROJECT",
            Self::CreateTask => "CREATE_TASK",
            Self::UpdateTask => "UPDATE_TASK",
            Self::UpdateTaskStatus => "UPDATE_TASK_STATUS",
        }
    }

    #[must_use]
    pub const fn entity_type(self) -> &'static str {
        match self {
            Self::RegisterTenant | Self::UpdateTenant => "tenant",
            Self::Logout => "auth",
            Self::CreateUser | Self::UpdateUser | Self::DeleteUser => "user",
            Self::CreateProject | Self::UpdateProject | Self::DeleteProject => "project",
            Self::CreateTask | Self::UpdateTask | Self::UpdateTaskStatus => "task",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub action: AuditAction,
    pub entity_id: &'a str,
    pub tenant_id: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub ip_address: Option<&'a str>,
}

impl<'a> AuditEntry<'a> {
    /// Entry attributed to the caller, in the caller's tenant.
    #[must_use]
    pub fn by(principal: &'a Principal, ip: &'a ClientIp, action: AuditAction, entity_id: &'a str) -> Self {
        Self {
            action,
            entity_id,
            tenant_id: principal.tenant_id.as_deref(),
            user_id: Some(principal.id.as_str()),
            ip_address: ip.0.as_deref(),
        }
    }

    #[must_use]
    pub const fn in_tenant(mut self, tenant_id: &'a str) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }
}

/// Appends one audit row. Failures are logged and never reach the caller.
pub async fn record(db: &DbContext, entry: AuditEntry<'_>) {
    tracing::info!(
        event_type = "audit",
        action = %entry.action,
        entity_type = entry.action.entity_type(),
        entity_id = entry.entity_id,
        tenant_id = ?entry.tenant_id,
        user_id = ?entry.user_id,
        "Audit event");

    let row = NewAuditLog {
        tenant_id: entry.tenant_id.map(str::to_string),
        user_id: entry.user_id.map(str::to_string),
        action: entry.action.as_str().to_string(),
        entity_type: entry.action.entity_type().to_string(),
        entity_id: entry.entity_id.to_string(),
        ip_address: entry.ip_address.map(str::to_string),
    };

    if let Err(e) = db::insert_audit_log(db, row).await {
        tracing::warn!(action = %entry.action, entity_id = entry.entity_id, error = %e, "Failed to write audit log");
    }
}

/// Client address as reported by a reverse proxy, if any.
#[derive(Clone, Debug, Default)]
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_client_ip(&parts.headers)))
    }
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`.
#[must_use]
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded.or_else(real_ip).map(str::to_string)
}
