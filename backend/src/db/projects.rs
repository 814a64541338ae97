use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::core::{DbContext, DbError, PageRequest};
use crate::db::{ProjectStatus, contains_pattern};

const PROJECT_COLUMNS: &str = "id, tenant_id, name, description, status, created_by, created_at, updated_at";

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewProject {
    pub tenant_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: String,
}

/// `description: Some(None)` clears the column.
#[derive(Debug, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
}

impl ProjectChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }
}

#[derive(Debug, FromRow)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: Option<String>,
    pub creator_name: Option<String>,
    pub task_count: i64,
    pub completed_task_count: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub search: Option<String>,
}

/// Inserts the project only while the tenant is below `max_projects`, in a single statement.
/// Returns `None` when the quota is exhausted.
pub async fn insert_project_within_quota(db: &DbContext, new_project: NewProject) -> Result<Option<Project>, DbError> {
    let project = sqlx::query_as::<_, Project>(&format!(
        r"
        INSERT INTO projects (id, tenant_id, name, description, status, created_by)
        SELECT ?1, ?2, ?3, ?4, ?5, ?6
        WHERE (SELECT COUNT(*) FROM projects WHERE tenant_id = ?2)
            < (SELECT max_projects FROM tenants WHERE id = ?2)
        RETURNING {PROJECT_COLUMNS}
        "
    ))
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(new_project.tenant_id)
    .bind(new_project.name)
    .bind(new_project.description)
    .bind(new_project.status)
    .bind(new_project.created_by)
    .fetch_optional(db)
    .await?;
    Ok(project)
}

pub async fn get_project_by_id(db: &DbContext, id: &str) -> Result<Option<Project>, DbError> {
    let project = sqlx::query_as::<_, Project>(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(project)
}

pub async fn update_project(db: &DbContext, id: &str, changes: ProjectChanges) -> Result<Option<Project>, DbError> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE projects SET updated_at = CURRENT_TIMESTAMP");
    if let Some(name) = changes.name {
        qb.push(", name = ").push_bind(name);
    }
    if let Some(description) = changes.description {
        qb.push(", description = ").push_bind(description);
    }
    if let Some(status) = changes.status {
        qb.push(", status = ").push_bind(status);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(format!(" RETURNING {PROJECT_COLUMNS}"));

    let project = qb.build_query_as::<Project>().fetch_optional(db).await?;
    Ok(project)
}

/// Deletes the project and its tasks atomically. Returns the number of tasks removed.
pub async fn delete_project_with_tasks(db: &DbContext, id: &str) -> Result<u64, DbError> {
    let mut tx = db.begin().await?;

    let tasks = sqlx::query("DELETE FROM tasks WHERE project_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(tasks.rows_affected())
}

fn push_project_filter<'a>(qb: &mut QueryBuilder<'a, Sqlite>, tenant_id: &'a str, filter: &'a ProjectFilter) {
    qb.push(" WHERE p.tenant_id = ").push_bind(tenant_id);
    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status);
    }
    if let Some(search) = filter.search.as_deref() {
        qb.push(" AND LOWER(p.name) LIKE ")
            .push_bind(contains_pattern(search))
            .push(r" ESCAPE '\'");
    }
}

pub async fn list_projects(
    db: &DbContext,
    tenant_id: &str,
    filter: &ProjectFilter,
    page: PageRequest,
) -> Result<(Vec<ProjectSummary>, i64), DbError> {
    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM projects p");
    push_project_filter(&mut count_qb, tenant_id, filter);
    let total = count_qb.build_query_scalar::<i64>().fetch_one(db).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(
        r"
        SELECT
            p.id, p.name, p.description, p.status, p.created_by, p.created_at,
            u.full_name AS creator_name,
            (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count,
            (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id AND t.status = 'completed') AS completed_task_count
        FROM projects p
        LEFT JOIN users u ON u.id = p.created_by
        ",
    );
    push_project_filter(&mut qb, tenant_id, filter);
    qb.push(" ORDER BY p.created_at DESC, p.rowid DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let projects = qb.build_query_as::<ProjectSummary>().fetch_all(db).await?;

    Ok((projects, total))
}
