use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::Principal;
use crate::core::ApiError;
use crate::db::Role;

pub const SUPER_ADMIN: &[Role] = &[Role::SuperAdmin];
pub const TENANT_ADMIN: &[Role] = &[Role::TenantAdmin];
pub const ADMINS: &[Role] = &[Role::SuperAdmin, Role::TenantAdmin];

/// Route layer admitting only the listed roles. Must run after `authenticate`.
///
/// ```ignore
/// get(handler).route_layer(middleware::from_fn_with_state(guard::SUPER_ADMIN, guard::require_roles))
/// ```
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

    if !allowed.contains(&principal.role) {
        tracing::warn!(
            user_id = %principal.id,
            role = %principal.role,
            path = %request.uri().path(),
            "Role not permitted for route");
        return Err(ApiError::forbidden("Insufficient permissions"));
    }

    Ok(next.run(request).await)
}
