use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, patch, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{self, guard};
use crate::core;
use crate::routes;

/// All endpoints live under `/api`; everything except registration, login and health requires a bearer token.
pub fn create_router(context: core::ArcContext) -> Router {
    let super_admin = || middleware::from_fn_with_state(guard::SUPER_ADMIN, guard::require_roles);
    let tenant_admin = || middleware::from_fn_with_state(guard::TENANT_ADMIN, guard::require_roles);
    let admins = || middleware::from_fn_with_state(guard::ADMINS, guard::require_roles);

    let public_routes = Router::new()
        .route("/auth/register-tenant", post(routes::auth::register_tenant))
        .route("/auth/login", post(routes::auth::login))
        .route("/health", get(routes::health::health_check));

    let protected_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/tenants", get(routes::tenants::list_tenants).route_layer(super_admin()))
        .route(
            "/tenants/{id}",
            get(routes::tenants::get_tenant).put(routes::tenants::update_tenant),
        )
        .route(
            "/tenants/{id}/users",
            post(routes::users::create_user)
                .route_layer(tenant_admin())
                .merge(get(routes::users::list_users).route_layer(admins())),
        )
        .route(
            "/users/{id}",
            put(routes::users::update_user).merge(delete(routes::users::delete_user).route_layer(tenant_admin())),
        )
        .route(
            "/projects",
            post(routes::projects::create_project).get(routes::projects::list_projects),
        )
        .route(
            "/projects/{id}",
            put(routes::projects::update_project).delete(routes::projects::delete_project),
        )
        .route(
            "/projects/{id}/tasks",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route("/tasks/{id}", put(routes::tasks::update_task))
        .route("/tasks/{id}/status", patch(routes::tasks::update_task_status))
        .route_layer(middleware::from_fn_with_state(context.clone(), auth::authenticate));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(context)
}
