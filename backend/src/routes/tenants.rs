use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::auth::{self, Principal, TenantUpdateFields};
use crate::core::{ApiError, ApiResponse, AppJson, ArcContext, Page, PageRequest};
use crate::db::{self, SubscriptionPlan, Tenant, TenantFilter, TenantStats, TenantStatus, TenantSummary, parse_optional};
use crate::services::audit::{self, AuditAction, AuditEntry, ClientIp};

const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTenantsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub subscription_plan: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TenantDetails {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub stats: TenantStats,
}

pub async fn list_tenants(
    State(context): State<ArcContext>,
    Query(query): Query<ListTenantsQuery>,
) -> Result<ApiResponse<Page<TenantSummary>>, ApiError> {
    let page = PageRequest::from_query(query.page.as_deref(), query.limit.as_deref(), DEFAULT_PAGE_SIZE);
    let filter = TenantFilter {
        status: parse_optional::<TenantStatus>(query.status.as_deref(), "Invalid tenant status")
            .map_err(ApiError::validation)?,
        subscription_plan: parse_optional::<SubscriptionPlan>(
            query.subscription_plan.as_deref(),
            "Invalid subscription plan",
        )
        .map_err(ApiError::validation)?,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };

    let (tenants, total) = db::list_tenants(&context.db, &filter, page).await?;
    Ok(ApiResponse::ok(Page::new(tenants, total, page)))
}

pub async fn get_tenant(
    State(context): State<ArcContext>,
    principal: Principal,
    Path(tenant_id): Path<String>,
) -> Result<ApiResponse<TenantDetails>, ApiError> {
    auth::ensure_tenant_scope(&principal, &tenant_id).map_err(|denied| denied.forbidden("Unauthorized access"))?;

    let tenant = db::get_tenant_by_id(&context.db, &tenant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;
    let stats = db::get_tenant_stats(&context.db, &tenant.id).await?;

    Ok(ApiResponse::ok(TenantDetails { tenant, stats }))
}

pub async fn update_tenant(
    State(context): State<ArcContext>,
    principal: Principal,
    ip: ClientIp,
    Path(tenant_id): Path<String>,
    AppJson(fields): AppJson<TenantUpdateFields>,
) -> Result<ApiResponse<Tenant>, ApiError> {
    let update = auth::build_tenant_update(&principal, &tenant_id, fields)?;

    let tenant = db::update_tenant(&context.db, &tenant_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    audit::record(
        &context.db,
        AuditEntry::by(&principal, &ip, AuditAction::UpdateTenant, &tenant.id).in_tenant(&tenant.id),
    )
    .await;

    Ok(ApiResponse::ok(tenant).with_message("Tenant updated successfully"))
}
