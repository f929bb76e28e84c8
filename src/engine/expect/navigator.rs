use serde_json::Value;

use crate::domain::error::MatchError;
use crate::domain::rules::json_type_name;

/// Descends one literal segment into `value`.
///
/// Objects are indexed by key; arrays by a decimal index. Anything else,
/// or a key that is not present, is a navigation failure.
pub fn step<'a>(key: &str, value: &'a Value) -> Result<&'a Value, MatchError> {
    tracing::trace!(key, actual = json_type_name(value), "navigating literal segment");
    let found = match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    };
    found.ok_or_else(|| navigation_error(key, value))
}

fn navigation_error(key: &str, value: &Value) -> MatchError {
    MatchError::PathNavigation {
        key: key.to_string(),
        actual: json_type_name(value),
        value: value.clone(),
    }
}
