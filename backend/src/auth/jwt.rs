use std::fs;

use axum::http;
use chrono::Utc;
use jsonwebtoken as jwt;
use rand::TryRngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cfg;
use crate::db::Role;

type TryRngError = <rand::rngs::OsRng as rand::TryRngCore>::Error;

#[rustfmt::skip]
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT token")]
    EncodingFailed(jwt::errors::Error),

    #[error("Failed to decode JWT token")]
    DecodingFailed(jwt::errors::Error),

    #[error("File system operation failed")]
    FileSystemOperationFailed { #[from] source: std::io::Error },

    #[error("Random number generation operation failed")]
    RngOperationFailed { source: TryRngError },

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid authorization header")]
    InvalidAuthorizationHeader,
}

impl JwtError {
    #[must_use]
    pub const fn status_code(&self) -> http::StatusCode {
        match self {
            Self::EncodingFailed(_) | Self::FileSystemOperationFailed { .. } | Self::RngOperationFailed { .. } => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::DecodingFailed(_) | Self::TokenExpired | Self::InvalidToken | Self::InvalidAuthorizationHeader => {
                http::StatusCode::UNAUTHORIZED
            }
        }
    }

    #[rustfmt::skip]
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::EncodingFailed(_) | Self::FileSystemOperationFailed { .. } | Self::RngOperationFailed { .. } => "Internal server error",
            Self::DecodingFailed(_) | Self::InvalidToken | Self::TokenExpired => "Token invalid or expired",
            Self::InvalidAuthorizationHeader => "No token provided",
        }
    }
}

#[derive(Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AccessTokenClaims {
    pub sub: String,               // Subject (user ID)
    pub tenant_id: Option<String>, // None for super admins
    pub role: Role,
    pub exp: i64,                  // Expiration time
    pub iat: i64,                  // Issued at
    pub jti: String,               // JWT ID (unique identifier)
    pub token_type: TokenType,
}

#[derive(Clone)]
pub struct JwtContext {
    pub encoding_key: jwt::EncodingKey,
    pub decoding_key: jwt::DecodingKey,
    pub validation: jwt::Validation,
    pub access_token_expiry: i64,
}

impl JwtContext {
    pub fn new(settings: &cfg::JwtSettings, secret: &str) -> Result<Self, JwtError> {
        let encoding_key = jwt::EncodingKey::from_secret(secret.as_ref());
        let decoding_key = jwt::DecodingKey::from_secret(secret.as_ref());
        let mut validation = jwt::Validation::new(jwt::Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            access_token_expiry: settings.access_token_expiry,
        })
    }

    /// Uses the configured secret, or the persisted/generated one when none is configured.
    pub fn from_settings(settings: &cfg::JwtSettings) -> Result<Self, JwtError> {
        if settings.secret.trim().is_empty() {
            Self::new(settings, &get_jwt_secret()?)
        } else {
            Self::new(settings, settings.secret.trim())
        }
    }
}

/// Generate a new access token
pub fn generate_access_token(
    ctx: &JwtContext,
    user_id: &str,
    tenant_id: Option<&str>,
    role: Role,
) -> Result<String, JwtError> {
    let now = Utc::now().timestamp();
    let header = jwt::Header::new(jwt::Algorithm::HS256);
    let claims = AccessTokenClaims {
        sub: user_id.to_string(),
        tenant_id: tenant_id.map(str::to_string),
        role,
        exp: now + ctx.access_token_expiry,
        iat: now,
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Access,
    };
    jwt::encode(&header, &claims, &ctx.encoding_key).map_err(JwtError::EncodingFailed)
}

pub fn decode_access_token_from_headers(
    ctx: &JwtContext,
    headers: &http::HeaderMap,
) -> Result<AccessTokenClaims, JwtError> {
    let token = extract_bearer_token(headers)?;
    decode_access_token(ctx, token)
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer_token(headers: &http::HeaderMap) -> Result<&str, JwtError> {
    let auth_header = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(JwtError::InvalidAuthorizationHeader)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(JwtError::InvalidAuthorizationHeader)
}

/// Validate and decode an access token
pub fn decode_access_token(ctx: &JwtContext, token: &str) -> Result<AccessTokenClaims, JwtError> {
    let token_data = jwt::decode::<AccessTokenClaims>(token, &ctx.decoding_key, &ctx.validation)?;
    let valid = token_data.claims.token_type == TokenType::Access;
    valid.then_some(token_data.claims).ok_or(JwtError::InvalidToken)
}

/// Loads or creates a JWT secret
pub fn get_jwt_secret() -> Result<String, JwtError> {
    // check persisted secret file
    let secret_file_path = cfg::AppSettings::get_config_path().join(".jwt_secret");
    if let Ok(file_secret) = fs::read_to_string(&secret_file_path) {
        let trimmed_secret = file_secret.trim();
        if trimmed_secret.len() >= 32 {
            return Ok(trimmed_secret.to_string());
        }
    }

    if let Some(parent) = &secret_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let new_secret = generate_secure_secret()?;
    fs::write(&secret_file_path, &new_secret)?;

    // Set file permissions to be readable only by owner (Unix-like systems)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&secret_file_path)?.permissions();
        perms.set_mode(0o600); // rw-------
        fs::set_permissions(&secret_file_path, perms)?;
    }

    tracing::info!("Generated new JWT secret in {}", secret_file_path.to_string_lossy());
    Ok(new_secret)
}

/// Generates a cryptographically secure random secret
fn generate_secure_secret() -> Result<String, JwtError> {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| JwtError::RngOperationFailed { source: e })?;
    Ok(hex::encode(bytes))
}

/// Maps jsonwebtoken errors to our custom `JwtError` type
#[allow(clippy::match_same_arms)]
impl From<jwt::errors::Error> for JwtError {
    fn from(e: jwt::errors::Error) -> Self {
        match e.kind() {
            jwt::errors::ErrorKind::ExpiredSignature => Self::TokenExpired,
            jwt::errors::ErrorKind::InvalidToken => Self::InvalidToken,
            jwt::errors::ErrorKind::Json(_) => Self::InvalidToken,
            _ => Self::DecodingFailed(e),
        }
    }
}
