use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::errors::AppError;

pub const MIN_DESCRIPTION_LEN: usize = 5;
pub const MAX_VOTING_LOGIC_LEN: usize = 2_000;

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("UUID pattern is valid")
});

/// Validate a proposal title: non-empty after trimming.
pub fn validate_title(title: &str) -> Option<String> {
    if title.trim().is_empty() {
        return Some("Title is required".to_string());
    }
    None
}

/// Validate a proposal description: at least 5 characters after trimming.
pub fn validate_description(description: &str) -> Option<String> {
    let len = description.trim().chars().count();
    if len == 0 {
        return Some("Description is required".to_string());
    }
    if len < MIN_DESCRIPTION_LEN {
        return Some(format!(
            "Description must be at least {MIN_DESCRIPTION_LEN} characters long"
        ));
    }
    None
}

/// Validate an optional vote rationale (empty is OK).
pub fn validate_voting_logic(value: &str) -> Option<String> {
    if value.trim().chars().count() > MAX_VOTING_LOGIC_LEN {
        return Some(format!("Voting logic must be at most {MAX_VOTING_LOGIC_LEN} characters"));
    }
    None
}

/// Validate an approval percentage: finite and within 0..=100.
pub fn validate_percent(value: f64) -> Option<String> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Some("percent_approval must be between 0 and 100".to_string());
    }
    None
}

pub fn is_uuid(value: &str) -> bool {
    UUID_RE.is_match(value)
}

/// Parse an id from a path, query or body. `what` names it in the error,
/// e.g. "proposal" -> "Invalid proposal ID format".
pub fn parse_id(value: &str, what: &str) -> Result<Uuid, AppError> {
    if !is_uuid(value) {
        return Err(AppError::Validation(format!("Invalid {what} ID format")));
    }
    Uuid::parse_str(value).map_err(|_| AppError::Validation(format!("Invalid {what} ID format")))
}

/// Turn the first validation message, if any, into an error.
pub fn check(errors: impl IntoIterator<Item = Option<String>>) -> Result<(), AppError> {
    match errors.into_iter().flatten().next() {
        Some(msg) => Err(AppError::Validation(msg)),
        None => Ok(()),
    }
}
