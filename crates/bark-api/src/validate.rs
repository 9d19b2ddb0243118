use bark_db::Database;
use bark_types::api::SignUpRequest;

use crate::error::{ApiError, FieldError};

/// Signup validation. All violated rules are collected into one 422
/// response instead of failing on the first.
pub fn validate_sign_up(db: &Database, req: &SignUpRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if !is_valid_email(&req.email) {
        errors.push(FieldError::new("email", "Please enter a valid Email!"));
    } else if db.get_user_by_email(req.email.trim())?.is_some() {
        errors.push(FieldError::new("email", "E-Mail address already exists!"));
    }

    if req.username.trim().is_empty() {
        errors.push(FieldError::new("username", "Please enter a valid username!"));
    } else if db.get_user_by_username(req.username.trim())?.is_some() {
        errors.push(FieldError::new("username", "Username already exists!"));
    }

    if req.password.trim().len() < 6 {
        errors.push(FieldError::new("password", "Please enter a valid password!"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// Trims and enforces a minimum length on free-text content fields.
pub fn require_content(content: &str, min_len: usize, message: &str) -> Result<String, ApiError> {
    let trimmed = content.trim();
    if trimmed.chars().count() < min_len {
        return Err(ApiError::Validation(vec![FieldError::new(
            "content", message,
        )]));
    }
    Ok(trimmed.to_string())
}

fn is_valid_email(raw: &str) -> bool {
    let raw = raw.trim();
    if raw.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
