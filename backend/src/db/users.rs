use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor};

use crate::core::{DbContext, DbError, PageRequest};
use crate::db::{Role, SubscriptionPlan, TenantStatus, contains_pattern};

const USER_COLUMNS: &str = "id, tenant_id, email, password_hash, full_name, role, is_active, created_at, updated_at";

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub tenant_id: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewUser {
    pub tenant_id: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
}

/// A user joined with its (optional) tenant, as loaded by the request authenticator.
#[derive(Debug, FromRow)]
pub struct UserWithTenant {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    pub tenant_subdomain: Option<String>,
    pub tenant_status: Option<TenantStatus>,
    pub tenant_subscription_plan: Option<SubscriptionPlan>,
    pub tenant_max_users: Option<i64>,
    pub tenant_max_projects: Option<i64>,
}

#[derive(Debug, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub search: Option<String>,
}

pub async fn get_user_by_id(db: &DbContext, id: &str) -> Result<Option<User>, DbError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn get_user_with_tenant(db: &DbContext, id: &str) -> Result<Option<UserWithTenant>, DbError> {
    let user = sqlx::query_as::<_, UserWithTenant>(
        r"
        SELECT
            u.id, u.email, u.full_name, u.role, u.is_active,
            t.id AS tenant_id,
            t.name AS tenant_name,
            t.subdomain AS tenant_subdomain,
            t.status AS tenant_status,
            t.subscription_plan AS tenant_subscription_plan,
            t.max_users AS tenant_max_users,
            t.max_projects AS tenant_max_projects
        FROM users u
        LEFT JOIN tenants t ON t.id = u.tenant_id
        WHERE u.id = ?
        ",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn get_super_admin_by_email(db: &DbContext, email: &str) -> Result<Option<User>, DbError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ? AND role = 'super_admin' AND tenant_id IS NULL"
    ))
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn get_user_in_tenant_by_email<'e>(
    db: impl SqliteExecutor<'e>,
    tenant_id: &str,
    email: &str,
) -> Result<Option<User>, DbError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE tenant_id = ? AND email = ?"))
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

/// Whether any account, in any tenant, already uses this email.
pub async fn email_exists<'e>(db: impl SqliteExecutor<'e>, email: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

pub async fn insert_user<'e>(db: impl SqliteExecutor<'e>, new_user: NewUser) -> Result<User, DbError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r"
        INSERT INTO users (id, tenant_id, email, password_hash, full_name, role, is_active)
        VALUES (?, ?, ?, ?, ?, ?, TRUE)
        RETURNING {USER_COLUMNS}
        "
    ))
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(new_user.tenant_id)
    .bind(new_user.email)
    .bind(new_user.password_hash)
    .bind(new_user.full_name)
    .bind(new_user.role)
    .fetch_one(db)
    .await?;
    Ok(user)
}

/// Inserts the user only while its tenant is below `max_users`, in a single statement.
/// Returns `None` when the quota is exhausted (or the user has no tenant).
pub async fn insert_user_within_quota(db: &DbContext, new_user: NewUser) -> Result<Option<User>, DbError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r"
        INSERT INTO users (id, tenant_id, email, password_hash, full_name, role, is_active)
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, TRUE
        WHERE (SELECT COUNT(*) FROM users WHERE tenant_id = ?2)
            < (SELECT max_users FROM tenants WHERE id = ?2)
        RETURNING {USER_COLUMNS}
        "
    ))
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(new_user.tenant_id)
    .bind(new_user.email)
    .bind(new_user.password_hash)
    .bind(new_user.full_name)
    .bind(new_user.role)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn count_active_tenant_admins(db: &DbContext, tenant_id: &str) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE tenant_id = ? AND role = 'tenant_admin' AND is_active = TRUE",
    )
    .bind(tenant_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}

pub async fn update_user(db: &DbContext, id: &str, changes: UserChanges) -> Result<Option<User>, DbError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r"
        UPDATE users
        SET full_name = COALESCE(?, full_name),
            role = COALESCE(?, role),
            is_active = COALESCE(?, is_active),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        RETURNING {USER_COLUMNS}
        "
    ))
    .bind(changes.full_name)
    .bind(changes.role)
    .bind(changes.is_active)
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn delete_user(db: &DbContext, id: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?").bind(id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}

fn push_user_filter<'a>(qb: &mut QueryBuilder<'a, Sqlite>, tenant_id: &'a str, filter: &'a UserFilter) {
    qb.push(" WHERE tenant_id = ").push_bind(tenant_id);
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role);
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = contains_pattern(search);
        qb.push(" AND (LOWER(email) LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR LOWER(full_name) LIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }
}

pub async fn list_tenant_users(
    db: &DbContext,
    tenant_id: &str,
    filter: &UserFilter,
    page: PageRequest,
) -> Result<(Vec<User>, i64), DbError> {
    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
    push_user_filter(&mut count_qb, tenant_id, filter);
    let total = count_qb.build_query_scalar::<i64>().fetch_one(db).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
    push_user_filter(&mut qb, tenant_id, filter);
    qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let users = qb.build_query_as::<User>().fetch_all(db).await?;

    Ok((users, total))
}
