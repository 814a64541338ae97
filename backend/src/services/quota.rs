use crate::core::{ApiError, DbContext};
use crate::db::{self, NewProject, NewUser, Project, User};

/// Per-tenant limits enforced at insert time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Users,
    Projects,
}

impl Quota {
    #[must_use]
    pub const fn exceeded_message(self) -> &'static str {
        match self {
            Self::Users => "Subscription user limit reached",
            Self::Projects => "Project limit reached",
        }
    }

    fn exceeded(self, tenant_id: &str) -> ApiError {
        tracing::warn!(tenant_id, quota = ?self, "Tenant quota exhausted");
        ApiError::forbidden(self.exceeded_message())
    }
}

pub async fn create_project(db: &DbContext, new_project: NewProject) -> Result<Project, ApiError> {
    let tenant_id = new_project.tenant_id.clone();
    db::insert_project_within_quota(db, new_project)
        .await?
        .ok_or_else(|| Quota::Projects.exceeded(&tenant_id))
}

pub async fn create_user(db: &DbContext, new_user: NewUser) -> Result<User, ApiError> {
    let tenant_id = new_user.tenant_id.clone().unwrap_or_default();
    db::insert_user_within_quota(db, new_user)
        .await?
        .ok_or_else(|| Quota::Users.exceeded(&tenant_id))
}
