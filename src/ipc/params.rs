//! Readers for request params. Each fails with a `ValidationError` before any
//! store access.

use serde_json::Value;

use crate::error::ValidationError;
use crate::model::{Department, Semester};

pub fn required_str<'a>(params: &'a Value, key: &'static str) -> Result<&'a str, ValidationError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or(ValidationError::Missing(key))
}

/// Enrollment is matched verbatim, so it is not trimmed here.
pub fn enrollment(params: &Value) -> Result<&str, ValidationError> {
    required_str(params, "enrollment")
}

pub fn department(params: &Value) -> Result<Department, ValidationError> {
    required_str(params, "department")?.parse()
}

/// Accepts `3` or `"3"`.
pub fn semester(params: &Value) -> Result<Semester, ValidationError> {
    let value = match params.get("semester") {
        None | Some(Value::Null) => return Err(ValidationError::Missing("semester")),
        Some(Value::Number(n)) => n.as_i64().ok_or(ValidationError::NotAnInteger("semester"))?,
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(ValidationError::Missing("semester"))
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::NotAnInteger("semester"))?,
        Some(_) => return Err(ValidationError::NotAnInteger("semester")),
    };
    Semester::new(value)
}
