use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed name (1-50 Unicode characters).
pub fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 50 {
        return Err(AppError::Validation("Name must be 1-50 characters".into()));
    }
    Ok(())
}

/// Validate a difficulty level (1-5).
pub fn validate_level(level: i32) -> Result<(), AppError> {
    if !(1..=5).contains(&level) {
        return Err(AppError::Validation(
            "Level must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

/// Validate submitted or canonical answer text (non-empty after trimming).
pub fn validate_answer_text(answer: &str) -> Result<(), AppError> {
    if answer.trim().is_empty() {
        return Err(AppError::Validation("Answer must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_bounds() {
        assert!(validate_name("fibonacci").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(51)).is_err());
        assert!(validate_name(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn level_bounds() {
        for level in 1..=5 {
            assert!(validate_level(level).is_ok());
        }
        assert!(validate_level(0).is_err());
        assert!(validate_level(6).is_err());
    }

    #[test]
    fn answer_must_have_content() {
        assert!(validate_answer_text("42").is_ok());
        assert!(validate_answer_text(" \n").is_err());
    }
}
