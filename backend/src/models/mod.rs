// src/models/mod.rs

pub mod analytics;
pub mod attempt;
pub mod category;
pub mod exam;
pub mod user;

/// Rejects strings that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("must_not_be_blank"));
    }
    Ok(())
}
