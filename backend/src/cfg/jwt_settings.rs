use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JwtSettings {
    /// When empty, a secret is generated once and kept in `.jwt_secret`.
    #[serde(default)]
    pub secret: String,

    #[serde(default)]
    pub access_token_expiry: i64, // In seconds
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_token_expiry: 24 * 60 * 60, // 24 hours
        }
    }
}
