use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;

use crate::auth;
use crate::core::{ApiError, ArcContext};
use crate::db::{self, Role, SubscriptionPlan, TenantStatus, UserWithTenant};

/// Tenant row as seen when the request was authenticated.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSnapshot {
    pub id: String,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub max_users: i64,
    pub max_projects: i64,
}

/// The authenticated caller. Every authorization decision is made from this value.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: String,
    pub tenant_id: Option<String>,
    pub role: Role,
    pub email: String,
    pub full_name: String,
    pub tenant: Option<TenantSnapshot>,
}

impl Principal {
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    #[must_use]
    pub fn is_tenant_admin(&self) -> bool {
        self.role == Role::TenantAdmin
    }
}

impl From<UserWithTenant> for Principal {
    fn from(user: UserWithTenant) -> Self {
        let UserWithTenant {
            id,
            email,
            full_name,
            role,
            tenant_id,
            tenant_name,
            tenant_subdomain,
            tenant_status,
            tenant_subscription_plan,
            tenant_max_users,
            tenant_max_projects,
            ..
        } = user;

        let tenant = match (
            tenant_id.clone(),
            tenant_name,
            tenant_subdomain,
            tenant_status,
            tenant_subscription_plan,
            tenant_max_users,
            tenant_max_projects,
        ) {
            (Some(id), Some(name), Some(subdomain), Some(status), Some(subscription_plan), Some(max_users), Some(max_projects)) => {
                Some(TenantSnapshot { id, name, subdomain, status, subscription_plan, max_users, max_projects })
            }
            _ => None,
        };

        Self { id, tenant_id, role, email, full_name, tenant }
    }
}

/// Verifies the bearer token, reloads the user and stores a [`Principal`] in the request extensions.
pub async fn authenticate(
    State(context): State<ArcContext>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = auth::decode_access_token_from_headers(&context.jwt, request.headers())?;

    let user = db::get_user_with_tenant(&context.db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;

    if !user.is_active {
        tracing::warn!(user_id = %user.id, "Inactive account attempted to use a token");
        return Err(ApiError::forbidden("Account inactive"));
    }

    let principal = Principal::from(user);
    tracing::debug!(
        user_id = %principal.id,
        tenant_id = ?principal.tenant_id,
        role = %principal.role,
        "Authenticated request");

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("No token provided"))
    }
}
