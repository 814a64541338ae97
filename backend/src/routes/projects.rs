use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::auth::{self, Principal};
use crate::core::{self, ApiError, ApiResponse, AppJson, ArcContext, Page, PageRequest, deserialize_some};
use crate::db::{self, NewProject, Project, ProjectChanges, ProjectFilter, ProjectStatus, ProjectSummary, parse_optional};
use crate::services::audit::{self, AuditAction, AuditEntry, ClientIp};
use crate::services::quota;

const DEFAULT_PAGE_SIZE: i64 = 20;
const INVALID_STATUS: &str = "Invalid project status";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreator {
    pub id: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: Option<ProjectCreator>,
    pub task_count: i64,
    pub completed_task_count: i64,
    pub created_at: NaiveDateTime,
}

impl From<ProjectSummary> for ProjectListItem {
    fn from(row: ProjectSummary) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            status: row.status,
            created_by: row.created_by.map(|id| ProjectCreator { id, full_name: row.creator_name }),
            task_count: row.task_count,
            completed_task_count: row.completed_task_count,
            created_at: row.created_at,
        }
    }
}

fn tenant_context(principal: &Principal) -> Result<&str, ApiError> {
    auth::require_tenant(principal).map_err(|denied| denied.forbidden("Tenant context required"))
}

/// Loads a project the caller may modify: foreign projects are reported missing.
async fn load_modifiable_project(
    context: &ArcContext,
    principal: &Principal,
    project_id: &str,
) -> Result<Project, ApiError> {
    let project = db::get_project_by_id(&context.db, project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    auth::ensure_tenant_scope(principal, &project.tenant_id)
        .map_err(|denied| denied.not_found("Project not found"))?;

    if !auth::can_modify_project(principal, &project) {
        return Err(ApiError::forbidden("Not authorized"));
    }
    Ok(project)
}

pub async fn create_project(
    State(context): State<ArcContext>,
    principal: Principal,
    ip: ClientIp,
    AppJson(request): AppJson<CreateProjectRequest>,
) -> Result<(StatusCode, ApiResponse<Project>), ApiError> {
    let tenant_id = tenant_context(&principal)?;
    let name = core::required(request.name.as_deref(), "Project name is required")?;
    let status = parse_optional::<ProjectStatus>(request.status.as_deref(), INVALID_STATUS)
        .map_err(ApiError::validation)?
        .unwrap_or(ProjectStatus::Active);

    let project = quota::create_project(
        &context.db,
        NewProject {
            tenant_id: tenant_id.to_string(),
            name,
            description: request.description,
            status,
            created_by: principal.id.clone(),
        },
    )
    .await?;

    audit::record(&context.db, AuditEntry::by(&principal, &ip, AuditAction::CreateProject, &project.id)).await;
    Ok((StatusCode::CREATED, ApiResponse::ok(project)))
}

pub async fn list_projects(
    State(context): State<ArcContext>,
    principal: Principal,
    Query(query): Query<ListProjectsQuery>,
) -> Result<ApiResponse<Page<ProjectListItem>>, ApiError> {
    let tenant_id = tenant_context(&principal)?;
    let page = PageRequest::from_query(query.page.as_deref(), query.limit.as_deref(), DEFAULT_PAGE_SIZE);
    let filter = ProjectFilter {
        status: parse_optional::<ProjectStatus>(query.status.as_deref(), INVALID_STATUS)
            .map_err(ApiError::validation)?,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };

    let (rows, total) = db::list_projects(&context.db, tenant_id, &filter, page).await?;
    let items = rows.into_iter().map(ProjectListItem::from).collect();
    Ok(ApiResponse::ok(Page::new(items, total, page)))
}

pub async fn update_project(
    State(context): State<ArcContext>,
    principal: Principal,
    ip: ClientIp,
    Path(project_id): Path<String>,
    AppJson(request): AppJson<UpdateProjectRequest>,
) -> Result<ApiResponse<Project>, ApiError> {
    tenant_context(&principal)?;
    let changes = ProjectChanges {
        name: request
            .name
            .map(|name| core::required(Some(name.as_str()), "Project name cannot be empty"))
            .transpose()?,
        description: request.description,
        status: parse_optional::<ProjectStatus>(request.status.as_deref(), INVALID_STATUS)
            .map_err(ApiError::validation)?,
    };

    let project = load_modifiable_project(&context, &principal, &project_id).await?;
    if changes.is_empty() {
        return Err(ApiError::validation("No valid fields to update"));
    }

    let project = db::update_project(&context.db, &project.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    audit::record(&context.db, AuditEntry::by(&principal, &ip, AuditAction::UpdateProject, &project.id)).await;
    Ok(ApiResponse::ok(project).with_message("Project updated successfully"))
}

pub async fn delete_project(
    State(context): State<ArcContext>,
    principal: Principal,
    ip: ClientIp,
    Path(project_id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    tenant_context(&principal)?;
    let project = load_modifiable_project(&context, &principal, &project_id).await?;

    let removed_tasks = db::delete_project_with_tasks(&context.db, &project.id).await?;
    tracing::info!(project_id = %project.id, removed_tasks, "Project deleted");

    audit::record(&context.db, AuditEntry::by(&principal, &ip, AuditAction::DeleteProject, &project.id)).await;
    Ok(ApiResponse::message("Project deleted successfully"))
}
