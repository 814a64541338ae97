use axum::http;
use axum::http::HeaderValue;

use crate::auth::*;
use crate::cfg;
use crate::db::Role;

const TENANT_ID: &str = "7d0c8f64-31c6-4b5e-9a43-2f5d6b8c1e90";
const USER_ID: &str = "5b1f2e0a-8c7d-4e3f-a9b6-0c1d2e3f4a5b";

fn create_test_context() -> JwtContext {
    let settings = cfg::JwtSettings {
        secret: String::new(),
        access_token_expiry: 3600,
    };
    JwtContext::new(&settings, "test_secret_key_for_jwt_testing").unwrap()
}

#[test]
fn test_generate_access_token_success() {
    let ctx = create_test_context();
    let token = generate_access_token(&ctx, USER_ID, Some(TENANT_ID), Role::User).unwrap();

    // header.payload.signature
    assert_eq!(token.split('.').count(), 3);
}

#[test]
fn test_decode_access_token_success() {
    let ctx = create_test_context();
    let token = generate_access_token(&ctx, USER_ID, Some(TENANT_ID), Role::TenantAdmin).unwrap();
    let claims = decode_access_token(&ctx, &token).unwrap();

    assert_eq!(claims.sub, USER_ID);
    assert_eq!(claims.tenant_id.as_deref(), Some(TENANT_ID));
    assert_eq!(claims.role, Role::TenantAdmin);
    assert_eq!(claims.token_type, TokenType::Access);
    assert_eq!(claims.exp - claims.iat, 3600);
    assert!(!claims.jti.is_empty());
}

#[test]
fn test_super_admin_token_has_no_tenant() {
    let ctx = create_test_context();
    let token = generate_access_token(&ctx, USER_ID, None, Role::SuperAdmin).unwrap();
    let claims = decode_access_token(&ctx, &token).unwrap();

    assert!(claims.tenant_id.is_none());
    assert_eq!(claims.role, Role::SuperAdmin);
}

#[test]
fn test_decode_access_token_wrong_secret() {
    let settings = cfg::JwtSettings {
        secret: String::new(),
        access_token_expiry: 3600,
    };
    let wrong_ctx = JwtContext::new(&settings, "wrong_secret_for_testing_1234567890").unwrap();
    let ctx = create_test_context();

    let token = generate_access_token(&ctx, USER_ID, None, Role::User).unwrap();
    let result = decode_access_token(&wrong_ctx, &token);
    assert!(matches!(result.unwrap_err(), JwtError::DecodingFailed(_)));
}

#[test]
fn test_decode_invalid_token() {
    let ctx = create_test_context();
    let result = decode_access_token(&ctx, "invalid.token.format");
    assert!(matches!(result.unwrap_err(), JwtError::DecodingFailed(_)));
}

#[test]
fn test_decode_malformed_token() {
    let ctx = create_test_context();
    let result = decode_access_token(&ctx, "not_a_jwt_token");
    assert!(matches!(result.unwrap_err(), JwtError::InvalidToken));
}

#[test]
fn test_token_expiry() {
    use chrono::Utc;
    use jsonwebtoken as jwt;
    use uuid::Uuid;

    let ctx = create_test_context();

    // issued two hours ago, expired one hour ago
    let expired_time = Utc::now().timestamp() - 3600;
    let header = jwt::Header::new(jwt::Algorithm::HS256);
    let expired_claims = AccessTokenClaims {
        sub: USER_ID.to_string(),
        tenant_id: Some(TENANT_ID.to_string()),
        role: Role::User,
        exp: expired_time,
        iat: expired_time - 3600,
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Access,
    };
    let expired_token = jwt::encode(&header, &expired_claims, &ctx.encoding_key).unwrap();

    let result = decode_access_token(&ctx, &expired_token);
    assert!(matches!(result.unwrap_err(), JwtError::TokenExpired));
    assert_eq!(JwtError::TokenExpired.status_code(), http::StatusCode::UNAUTHORIZED);
}

#[test]
fn test_extract_bearer_token() {
    let mut headers = http::HeaderMap::new();
    assert!(matches!(extract_bearer_token(&headers), Err(JwtError::InvalidAuthorizationHeader)));

    headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
    assert!(matches!(extract_bearer_token(&headers), Err(JwtError::InvalidAuthorizationHeader)));

    headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
    assert!(matches!(extract_bearer_token(&headers), Err(JwtError::InvalidAuthorizationHeader)));

    headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
    assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
}

#[test]
fn test_decode_access_token_from_headers() {
    let ctx = create_test_context();
    let token = generate_access_token(&ctx, USER_ID, Some(TENANT_ID), Role::User).unwrap();

    let mut headers = http::HeaderMap::new();
    headers.insert(
        http::header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );

    let claims = decode_access_token_from_headers(&ctx, &headers).unwrap();
    assert_eq!(claims.sub, USER_ID);
}

#[test]
fn test_missing_header_reports_no_token() {
    assert_eq!(JwtError::InvalidAuthorizationHeader.public_message(), "No token provided");
    assert_eq!(JwtError::InvalidToken.public_message(), "Token invalid or expired");
}
