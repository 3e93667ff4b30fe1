//! Response normalization
//!
//! The API returns loosely-typed JSON. These helpers turn the few shapes the
//! client cares about into typed results.

use serde_json::Value;

use super::error::{ApiError, ApiResult};

/// Interpret the `success` field of a boolean endpoint response.
///
/// `true` and `"true"` map to `Ok(true)`, `false` and `"false"` map to
/// `Ok(false)`. Every other value, including a missing field, is an
/// `InvalidSuccess` error.
pub fn bool_response(response: &Value) -> ApiResult<bool> {
    let success = response.get("success").cloned().unwrap_or(Value::Null);
    match &success {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        _ => Err(ApiError::InvalidSuccess(success)),
    }
}

/// Take `field` out of an object response, `None` if absent or null
pub fn extract_field(mut response: Value, field: &str) -> Option<Value> {
    match response.get_mut(field).map(Value::take) {
        Some(Value::Null) | None => None,
        found => found,
    }
}

/// Find the id of the search result whose username equals `username`,
/// ignoring case
pub fn find_user_match(results: &Value, username: &str) -> ApiResult<String> {
    let entries = results.as_array().ok_or_else(|| {
        ApiError::InvalidResponse(format!("expected an array of users, got {}", results))
    })?;

    let wanted = fold_case(username);
    for entry in entries {
        let candidate =
            entry.get("username").and_then(Value::as_str).ok_or(ApiError::MissingField("username"))?;
        if fold_case(candidate) == wanted {
            return match entry.get("id") {
                Some(Value::String(id)) => Ok(id.clone()),
                Some(Value::Number(id)) => Ok(id.to_string()),
                _ => Err(ApiError::MissingField("id")),
            };
        }
    }

    Err(ApiError::UserNotFound(username.to_string()))
}

/// Lowercase `s` and expand the characters whose case-insensitive form
/// differs from their lowercase form
fn fold_case(s: &str) -> String {
    s.to_lowercase().chars().fold(String::with_capacity(s.len()), |mut folded, c| {
        match c {
            'ß' => folded.push_str("ss"),
            'ς' => folded.push('σ'),
            _ => folded.push(c),
        }
        folded
    })
}
