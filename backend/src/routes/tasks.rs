use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::auth::{self, Principal};
use crate::core::{self, ApiError, ApiResponse, AppJson, ArcContext, Page, PageRequest, deserialize_some};
use crate::db::{
    self, NewTask, Task, TaskChanges, TaskFilter, TaskPriority, TaskStatus, TaskWithAssignee, parse_optional,
};
use crate::services::audit::{self, AuditAction, AuditEntry, ClientIp};

const DEFAULT_PAGE_SIZE: i64 = 50;
const FOREIGN_PROJECT: &str = "Project does not belong to your tenant";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<String>,
}

/// Absent fields stay unchanged; `null` clears `description`, `assignedTo` and `dueDate`.
/// An empty `dueDate` string also clears it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListItem {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<Assignee>,
    pub due_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

impl From<TaskWithAssignee> for TaskListItem {
    fn from(row: TaskWithAssignee) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            assigned_to: row.assignee_id.map(|id| Assignee {
                id,
                full_name: row.assignee_name,
                email: row.assignee_email,
            }),
            due_date: row.due_date,
            created_at: row.created_at,
        }
    }
}

fn tenant_context(principal: &Principal) -> Result<&str, ApiError> {
    auth::require_tenant(principal).map_err(|denied| denied.forbidden("Tenant context required"))
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the date.
fn parse_due_date(value: &str) -> Result<NaiveDate, ApiError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| ApiError::validation("Invalid due date"))
}

async fn ensure_project_in_tenant(context: &ArcContext, tenant_id: &str, project_id: &str) -> Result<(), ApiError> {
    let project = db::get_project_by_id(&context.db, project_id).await?;
    match project {
        Some(project) if project.tenant_id == tenant_id => Ok(()),
        _ => Err(ApiError::forbidden(FOREIGN_PROJECT)),
    }
}

async fn ensure_assignee_in_tenant(context: &ArcContext, tenant_id: &str, user_id: &str) -> Result<(), ApiError> {
    let user = db::get_user_by_id(&context.db, user_id).await?;
    match user {
        Some(user) if user.tenant_id.as_deref() == Some(tenant_id) => Ok(()),
        _ => Err(ApiError::validation("Assigned user not in same tenant")),
    }
}

pub async fn create_task(
    State(context): State<ArcContext>,
    principal: Principal,
    ip: ClientIp,
    Path(project_id): Path<String>,
    AppJson(request): AppJson<CreateTaskRequest>,
) -> Result<(StatusCode, ApiResponse<Task>), ApiError> {
    let tenant_id = tenant_context(&principal)?;
    let title = core::required(request.title.as_deref(), "Task title is required")?;
    let priority = parse_optional::<TaskPriority>(request.priority.as_deref(), "Invalid priority")
        .map_err(ApiError::validation)?
        .unwrap_or(TaskPriority::Medium);
    let status = parse_optional::<TaskStatus>(request.status.as_deref(), "Invalid task status")
        .map_err(ApiError::validation)?
        .unwrap_or(TaskStatus::Todo);
    let due_date = request
        .due_date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(parse_due_date)
        .transpose()?;
    let assigned_to = request.assigned_to.filter(|id| !id.trim().is_empty());

    ensure_project_in_tenant(&context, tenant_id, &project_id).await?;
    if let Some(assignee) = assigned_to.as_deref() {
        ensure_assignee_in_tenant(&context, tenant_id, assignee).await?;
    }

    let task = db::insert_task(
        &context.db,
        NewTask {
            tenant_id: tenant_id.to_string(),
            project_id,
            title,
            description: request.description,
            status,
            priority,
            assigned_to,
            due_date,
        },
    )
    .await?;

    audit::record(&context.db, AuditEntry::by(&principal, &ip, AuditAction::CreateTask, &task.id)).await;
    Ok((StatusCode::CREATED, ApiResponse::ok(task)))
}

pub async fn list_tasks(
    State(context): State<ArcContext>,
    principal: Principal,
    Path(project_id): Path<String>,
    Query(query): Query<ListTasksQuery>,
) -> Result<ApiResponse<Page<TaskListItem>>, ApiError> {
    let tenant_id = tenant_context(&principal)?;
    ensure_project_in_tenant(&context, tenant_id, &project_id).await?;

    let page = PageRequest::from_query(query.page.as_deref(), query.limit.as_deref(), DEFAULT_PAGE_SIZE);
    let filter = TaskFilter {
        status: parse_optional::<TaskStatus>(query.status.as_deref(), "Invalid task status")
            .map_err(ApiError::validation)?,
        priority: parse_optional::<TaskPriority>(query.priority.as_deref(), "Invalid priority")
            .map_err(ApiError::validation)?,
        assigned_to: query.assigned_to.filter(|id| !id.trim().is_empty()),
        search: query.search.filter(|s| !s.trim().is_empty()),
    };

    let (rows, total) = db::list_project_tasks(&context.db, tenant_id, &project_id, &filter, page).await?;
    let items = rows.into_iter().map(TaskListItem::from).collect();
    Ok(ApiResponse::ok(Page::new(items, total, page)))
}

pub async fn update_task_status(
    State(context): State<ArcContext>,
    principal: Principal,
    ip: ClientIp,
    Path(task_id): Path<String>,
    AppJson(request): AppJson<UpdateTaskStatusRequest>,
) -> Result<ApiResponse<Task>, ApiError> {
    let tenant_id = tenant_context(&principal)?;
    let status = parse_optional::<TaskStatus>(request.status.as_deref(), "Invalid task status")
        .map_err(ApiError::validation)?
        .ok_or_else(|| ApiError::validation("Invalid task status"))?;

    let task = db::get_task_in_tenant(&context.db, &task_id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Task does not belong to your tenant"))?;

    let changes = TaskChanges { status: Some(status), ..Default::default() };
    let task = db::update_task(&context.db, &task.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    audit::record(&context.db, AuditEntry::by(&principal, &ip, AuditAction::UpdateTaskStatus, &task.id)).await;
    Ok(ApiResponse::ok(task))
}

pub async fn update_task(
    State(context): State<ArcContext>,
    principal: Principal,
    ip: ClientIp,
    Path(task_id): Path<String>,
    AppJson(request): AppJson<UpdateTaskRequest>,
) -> Result<ApiResponse<Task>, ApiError> {
    let tenant_id = tenant_context(&principal)?;
    let task = db::get_task_in_tenant(&context.db, &task_id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    let changes = TaskChanges {
        title: request
            .title
            .map(|title| core::required(Some(title.as_str()), "Task title cannot be empty"))
            .transpose()?,
        description: request.description,
        status: parse_optional::<TaskStatus>(request.status.as_deref(), "Invalid task status")
            .map_err(ApiError::validation)?,
        priority: parse_optional::<TaskPriority>(request.priority.as_deref(), "Invalid priority")
            .map_err(ApiError::validation)?,
        assigned_to: request.assigned_to,
        due_date: request
            .due_date
            .map(|date| {
                date.as_deref()
                    .filter(|d| !d.trim().is_empty())
                    .map(parse_due_date)
                    .transpose()
            })
            .transpose()?,
    };

    if let Some(Some(assignee)) = changes.assigned_to.as_ref() {
        ensure_assignee_in_tenant(&context, tenant_id, assignee).await?;
    }

    let task = db::update_task(&context.db, &task.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    audit::record(&context.db, AuditEntry::by(&principal, &ip, AuditAction::UpdateTask, &task.id)).await;
    Ok(ApiResponse::ok(task).with_message("Task updated successfully"))
}
