//! Input validation helpers
//!
//! Centralized text length limits, applied before anything is written.

use super::error::{CommerceError, CommerceResult};

// ── Text length limits ──────────────────────────────────────────────

/// Customer names, product names
pub const MAX_NAME_LEN: usize = 200;

/// Notes, cancellation reasons, gift messages
pub const MAX_NOTE_LEN: usize = 500;

/// Phone numbers, tracking numbers, carrier names, user ids
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Address lines
pub const MAX_ADDRESS_LEN: usize = 500;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> CommerceResult<()> {
    if value.trim().is_empty() {
        return Err(CommerceError::validation(format!(
            "{field} must not be empty"
        )));
    }
    if value.len() > max_len {
        return Err(CommerceError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> CommerceResult<()> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(CommerceError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Trim + lowercase; all email keys are stored in this form
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: `local@domain.tld`, no whitespace
pub fn validate_email(email: &str, field: &str) -> CommerceResult<()> {
    validate_required_text(email, field, MAX_EMAIL_LEN)?;
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(CommerceError::validation(format!(
            "{field} is not a valid email address"
        )));
    }
    Ok(())
}

pub fn validate_optional_email(email: &Option<String>, field: &str) -> CommerceResult<()> {
    match email {
        Some(e) => validate_email(e, field),
        None => Ok(()),
    }
}
