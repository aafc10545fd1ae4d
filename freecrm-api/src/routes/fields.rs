/// Field rules shared by the request bodies
///
/// Optional text fields follow the PATCH convention of the models: a missing
/// field is left alone and an empty string clears it. The rules below accept
/// a blank value for that reason and only check what is actually written.

use serde::{Deserialize, Deserializer};
use validator::{ValidateEmail, ValidationError};

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Names and titles must contain something other than whitespace
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "This field is required"));
    }
    Ok(())
}

/// Email check that lets a blank value through
pub fn validate_email_or_blank(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || value.validate_email() {
        return Ok(());
    }
    Err(invalid("email", "Invalid email address"))
}

/// Phone numbers: digits, `+`, `-`, spaces and parentheses
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let ok = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')') || c.is_whitespace());
    if ok {
        return Ok(());
    }
    Err(invalid("phone", "Invalid phone number"))
}

/// Tells an explicit `null` apart from a missing field
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// missing gives `None`, `null` gives `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
