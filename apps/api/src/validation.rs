//! Structural validation of request fields. Every failure is a 400.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

fn invalid(message: String) -> AppError {
    AppError::Validation(message)
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_email(field: &str, value: &str) -> Result<(), AppError> {
    require_non_empty(field, value)?;
    if !email_regex().is_match(value) {
        return Err(invalid(format!("{field} must be a valid email address")));
    }
    Ok(())
}

pub fn validate_password(field: &str, value: &str) -> Result<(), AppError> {
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(invalid(format!(
            "{field} must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_non_negative(field: &str, value: i32) -> Result<(), AppError> {
    if value < 0 {
        return Err(invalid(format!("{field} must not be negative")));
    }
    Ok(())
}

pub fn validate_salary_range(
    min_field: &str,
    min: i32,
    max_field: &str,
    max: i32,
) -> Result<(), AppError> {
    validate_non_negative(min_field, min)?;
    validate_non_negative(max_field, max)?;
    if min > max {
        return Err(invalid(format!(
            "{min_field} must not be greater than {max_field}"
        )));
    }
    Ok(())
}

/// Validates each entry and rejects empty skill names.
pub fn validate_skills<'a>(
    field: &str,
    skills: impl IntoIterator<Item = &'a str>,
) -> Result<(), AppError> {
    if skills.into_iter().any(|s| s.trim().is_empty()) {
        return Err(invalid(format!("{field} must not contain empty skills")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_format() {
        assert!(validate_email("email", "a@b.c").is_ok());
        assert!(validate_email("email", "jane.doe+jobs@example.co.uk").is_ok());
        assert!(validate_email("email", "").is_err());
        assert!(validate_email("email", "no-at-sign.com").is_err());
        assert!(validate_email("email", "a@b").is_err());
        assert!(validate_email("email", "a b@c.d").is_err());
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(validate_password("password", "123456").is_ok());
        assert!(validate_password("password", "12345").is_err());
    }

    #[test]
    fn test_salary_range() {
        assert!(validate_salary_range("min", 10, "max", 10).is_ok());
        assert!(validate_salary_range("min", 0, "max", 1000).is_ok());
        assert!(validate_salary_range("min", 1000, "max", 10).is_err());
        assert!(validate_salary_range("min", -1, "max", 10).is_err());
    }

    #[test]
    fn test_required_fields() {
        assert!(require_non_empty("title", "Engineer").is_ok());
        assert!(require_non_empty("title", "   ").is_err());
    }

    #[test]
    fn test_skills_must_be_named() {
        assert!(validate_skills("required_skills", ["go", "sql"]).is_ok());
        assert!(validate_skills("required_skills", ["go", " "]).is_err());
    }

    #[test]
    fn test_messages_name_the_field() {
        let err = validate_password("new_password", "1").unwrap_err();
        assert!(err.to_string().contains("new_password"));
    }
}
