use serde::{Deserialize, Serialize};

/// Limits applied to tenants created through self-service registration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TenancySettings {
    #[serde(default)]
    pub default_max_users: i64,

    #[serde(default)]
    pub default_max_projects: i64,
}

impl Default for TenancySettings {
    fn default() -> Self {
        Self {
            default_max_users: 5,
            default_max_projects: 10,
        }
    }
}
