use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor};

use crate::core::{DbContext, DbError, PageRequest};
use crate::db::{SubscriptionPlan, TenantStatus, contains_pattern};

const TENANT_COLUMNS: &str =
    "id, name, subdomain, status, subscription_plan, max_users, max_projects, created_at, updated_at";

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub max_users: i64,
    pub max_projects: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewTenant {
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub max_users: i64,
    pub max_projects: i64,
}

/// Field set a caller is allowed to change, one variant per role.
#[derive(Debug, PartialEq, Eq)]
pub enum TenantUpdate {
    TenantAdmin {
        name: String,
    },
    SuperAdmin {
        name: Option<String>,
        status: Option<TenantStatus>,
        subscription_plan: Option<SubscriptionPlan>,
        max_users: Option<i64>,
        max_projects: Option<i64>,
    },
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TenantStats {
    pub total_users: i64,
    pub total_projects: i64,
    pub total_tasks: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub id: String,
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub subscription_plan: SubscriptionPlan,
    pub total_users: i64,
    pub total_projects: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Default)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub search: Option<String>,
}

pub async fn get_tenant_by_id(db: &DbContext, id: &str) -> Result<Option<Tenant>, DbError> {
    let tenant = sqlx::query_as::<_, Tenant>(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(tenant)
}

pub async fn get_tenant_by_subdomain<'e>(
    db: impl SqliteExecutor<'e>,
    subdomain: &str,
) -> Result<Option<Tenant>, DbError> {
    let tenant = sqlx::query_as::<_, Tenant>(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE subdomain = ?"))
        .bind(subdomain)
        .fetch_optional(db)
        .await?;
    Ok(tenant)
}

pub async fn insert_tenant<'e>(db: impl SqliteExecutor<'e>, new_tenant: NewTenant) -> Result<Tenant, DbError> {
    let tenant = sqlx::query_as::<_, Tenant>(&format!(
        r"
        INSERT INTO tenants (id, name, subdomain, status, subscription_plan, max_users, max_projects)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {TENANT_COLUMNS}
        "
    ))
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(new_tenant.name)
    .bind(new_tenant.subdomain)
    .bind(new_tenant.status)
    .bind(new_tenant.subscription_plan)
    .bind(new_tenant.max_users)
    .bind(new_tenant.max_projects)
    .fetch_one(db)
    .await?;
    Ok(tenant)
}

/// Applies the update and returns the new row, `None` when the tenant does not exist.
pub async fn update_tenant(db: &DbContext, id: &str, update: &TenantUpdate) -> Result<Option<Tenant>, DbError> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE tenants SET updated_at = CURRENT_TIMESTAMP");
    match update {
        TenantUpdate::TenantAdmin { name } => {
            qb.push(", name = ").push_bind(name);
        }
        TenantUpdate::SuperAdmin { name, status, subscription_plan, max_users, max_projects } => {
            if let Some(name) = name {
                qb.push(", name = ").push_bind(name);
            }
            if let Some(status) = status {
                qb.push(", status = ").push_bind(*status);
            }
            if let Some(plan) = subscription_plan {
                qb.push(", subscription_plan = ").push_bind(*plan);
            }
            if let Some(max_users) = max_users {
                qb.push(", max_users = ").push_bind(*max_users);
            }
            if let Some(max_projects) = max_projects {
                qb.push(", max_projects = ").push_bind(*max_projects);
            }
        }
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(format!(" RETURNING {TENANT_COLUMNS}"));

    let tenant = qb.build_query_as::<Tenant>().fetch_optional(db).await?;
    Ok(tenant)
}

pub async fn get_tenant_stats(db: &DbContext, id: &str) -> Result<TenantStats, DbError> {
    let stats = sqlx::query_as::<_, TenantStats>(
        r"
        SELECT
            (SELECT COUNT(*) FROM users WHERE tenant_id = ?1) AS total_users,
            (SELECT COUNT(*) FROM projects WHERE tenant_id = ?1) AS total_projects,
            (SELECT COUNT(*) FROM tasks WHERE tenant_id = ?1) AS total_tasks
        ",
    )
    .bind(id)
    .fetch_one(db)
    .await?;
    Ok(stats)
}

fn push_tenant_filter<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a TenantFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND t.status = ").push_bind(status);
    }
    if let Some(plan) = filter.subscription_plan {
        qb.push(" AND t.subscription_plan = ").push_bind(plan);
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = contains_pattern(search);
        qb.push(" AND (LOWER(t.name) LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR LOWER(t.subdomain) LIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
}

pub async fn list_tenants(
    db: &DbContext,
    filter: &TenantFilter,
    page: PageRequest,
) -> Result<(Vec<TenantSummary>, i64), DbError> {
    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tenants t");
    push_tenant_filter(&mut count_qb, filter);
    let total = count_qb.build_query_scalar::<i64>().fetch_one(db).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(
        r"
        SELECT
            t.id, t.name, t.subdomain, t.status, t.subscription_plan, t.created_at,
            (SELECT COUNT(*) FROM users u WHERE u.tenant_id = t.id) AS total_users,
            (SELECT COUNT(*) FROM projects p WHERE p.tenant_id = t.id) AS total_projects
        FROM tenants t
        ",
    );
    push_tenant_filter(&mut qb, filter);
    qb.push(" ORDER BY t.created_at DESC, t.rowid DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let tenants = qb.build_query_as::<TenantSummary>().fetch_all(db).await?;

    Ok((tenants, total))
}
