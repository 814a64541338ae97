use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::core::{DbContext, DbError, PageRequest};
use crate::db::{TaskPriority, TaskStatus, contains_pattern};

const TASK_COLUMNS: &str =
    "id, tenant_id, project_id, title, description, status, priority, assigned_to, due_date, created_at, updated_at";

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub tenant_id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct NewTask {
    pub tenant_id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Outer `None` leaves a column untouched, `Some(None)` clears a nullable column.
#[derive(Debug, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, FromRow)]
pub struct TaskWithAssignee {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub assignee_id: Option<String>,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
}

#[derive(Debug, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
    pub search: Option<String>,
}

pub async fn insert_task(db: &DbContext, new_task: NewTask) -> Result<Task, DbError> {
    let task = sqlx::query_as::<_, Task>(&format!(
        r"
        INSERT INTO tasks (id, tenant_id, project_id, title, description, status, priority, assigned_to, due_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {TASK_COLUMNS}
        "
    ))
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(new_task.tenant_id)
    .bind(new_task.project_id)
    .bind(new_task.title)
    .bind(new_task.description)
    .bind(new_task.status)
    .bind(new_task.priority)
    .bind(new_task.assigned_to)
    .bind(new_task.due_date)
    .fetch_one(db)
    .await?;
    Ok(task)
}

/// Looks a task up inside one tenant; tasks of other tenants are reported as missing.
pub async fn get_task_in_tenant(db: &DbContext, id: &str, tenant_id: &str) -> Result<Option<Task>, DbError> {
    let task = sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND tenant_id = ?"))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?;
    Ok(task)
}

pub async fn update_task(db: &DbContext, id: &str, changes: TaskChanges) -> Result<Option<Task>, DbError> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE tasks SET updated_at = CURRENT_TIMESTAMP");
    if let Some(title) = changes.title {
        qb.push(", title = ").push_bind(title);
    }
    if let Some(description) = changes.description {
        qb.push(", description = ").push_bind(description);
    }
    if let Some(status) = changes.status {
        qb.push(", status = ").push_bind(status);
    }
    if let Some(priority) = changes.priority {
        qb.push(", priority = ").push_bind(priority);
    }
    if let Some(assigned_to) = changes.assigned_to {
        qb.push(", assigned_to = ").push_bind(assigned_to);
    }
    if let Some(due_date) = changes.due_date {
        qb.push(", due_date = ").push_bind(due_date);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(format!(" RETURNING {TASK_COLUMNS}"));

    let task = qb.build_query_as::<Task>().fetch_optional(db).await?;
    Ok(task)
}

fn push_task_filter<'a>(
    qb: &mut QueryBuilder<'a, Sqlite>,
    tenant_id: &'a str,
    project_id: &'a str,
    filter: &'a TaskFilter,
) {
    qb.push(" WHERE t.tenant_id = ")
        .push_bind(tenant_id)
        .push(" AND t.project_id = ")
        .push_bind(project_id);
    if let Some(status) = filter.status {
        qb.push(" AND t.status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND t.priority = ").push_bind(priority);
    }
    if let Some(assigned_to) = filter.assigned_to.as_deref() {
        qb.push(" AND t.assigned_to = ").push_bind(assigned_to);
    }
    if let Some(search) = filter.search.as_deref() {
        qb.push(" AND LOWER(t.title) LIKE ")
            .push_bind(contains_pattern(search))
            .push(r" ESCAPE '\'");
    }
}

pub async fn list_project_tasks(
    db: &DbContext,
    tenant_id: &str,
    project_id: &str,
    filter: &TaskFilter,
    page: PageRequest,
) -> Result<(Vec<TaskWithAssignee>, i64), DbError> {
    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tasks t");
    push_task_filter(&mut count_qb, tenant_id, project_id, filter);
    let total = count_qb.build_query_scalar::<i64>().fetch_one(db).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(
        r"
        SELECT
            t.id, t.project_id, t.title, t.description, t.status, t.priority, t.due_date, t.created_at,
            u.id AS assignee_id,
            u.full_name AS assignee_name,
            u.email AS assignee_email
        FROM tasks t
        LEFT JOIN users u ON u.id = t.assigned_to
        ",
    );
    push_task_filter(&mut qb, tenant_id, project_id, filter);
    qb.push(" ORDER BY t.created_at DESC, t.rowid DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let tasks = qb.build_query_as::<TaskWithAssignee>().fetch_all(db).await?;

    Ok((tasks, total))
}
