use crate::core::ApiError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Trimmed value, or a validation error when it is missing or blank.
pub fn required(value: Option<&str>, message: &str) -> Result<String, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::validation(message))
}

/// Trimmed, lowercased email with a minimal shape check.
pub fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace) => {
            Ok(email)
        }
        _ => Err(ApiError::validation("Invalid email address")),
    }
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// 3 to 63 characters of `[a-z0-9-]`, not starting or ending with `-`.
pub fn validate_subdomain(subdomain: &str) -> Result<(), ApiError> {
    let valid_chars = subdomain
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    let valid = (3..=63).contains(&subdomain.len())
        && valid_chars
        && !subdomain.starts_with('-')
        && !subdomain.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(
            "Subdomain must be 3-63 lowercase letters, digits or hyphens and cannot start or end with a hyphen",
        ))
    }
}
