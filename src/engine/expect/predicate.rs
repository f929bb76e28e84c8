use regex::Regex;
use serde_json::{Number, Value};

use crate::domain::error::MatchError;
use crate::domain::rules::{TypeSpec, json_type_name};

/// Leaf check applied once a path has resolved to concrete value(s).
pub trait TerminalPredicate {
    fn check(&self, expected: &Value, actual: &Value) -> Result<(), MatchError>;
}

/// Value expectation: subset matching for objects, element-wise for arrays.
///
/// `{"$regex": "..."}` matches string values against a pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueMatch;

/// Type expectation: a type name (`integer`, `array_of_strings`, `date?`)
/// or an object of key to type name.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMatch;

impl TerminalPredicate for ValueMatch {
    fn check(&self, expected: &Value, actual: &Value) -> Result<(), MatchError> {
        match_value(expected, actual, "$")
    }
}

impl TerminalPredicate for TypeMatch {
    fn check(&self, expected: &Value, actual: &Value) -> Result<(), MatchError> {
        match_type(expected, actual, "$")
    }
}

fn match_value(expected: &Value, actual: &Value, location: &str) -> Result<(), MatchError> {
    if let Some(pattern) = regex_pattern(expected) {
        let regex = Regex::new(pattern).map_err(|error| {
            failure(format!("invalid regex `{pattern}` at {location}: {error}"), actual)
        })?;
        return match actual.as_str() {
            Some(text) if regex.is_match(text) => Ok(()),
            _ => Err(failure(
                format!("expected {actual} at {location} to match /{pattern}/"),
                actual,
            )),
        };
    }

    match (expected, actual) {
        (Value::Object(expected_map), Value::Object(actual_map)) => {
            for (key, expected_value) in expected_map {
                let child = format!("{location}.{key}");
                match actual_map.get(key) {
                    Some(actual_value) => match_value(expected_value, actual_value, &child)?,
                    None => {
                        return Err(failure(
                            format!("expected key `{child}` to be present"),
                            actual,
                        ));
                    }
                }
            }
            Ok(())
        }
        (Value::Array(expected_items), Value::Array(actual_items)) => {
            if actual_items.len() < expected_items.len() {
                return Err(failure(
                    format!(
                        "expected at least {} elements at {location}, got {}",
                        expected_items.len(),
                        actual_items.len()
                    ),
                    actual,
                ));
            }
            for (index, (expected_item, actual_item)) in
                expected_items.iter().zip(actual_items).enumerate()
            {
                match_value(expected_item, actual_item, &format!("{location}[{index}]"))?;
            }
            Ok(())
        }
        (Value::Number(left), Value::Number(right)) if numbers_equal(left, right) => Ok(()),
        _ if expected == actual => Ok(()),
        _ => Err(failure(
            format!("expected {expected} at {location}, got {actual}"),
            actual,
        )),
    }
}

fn match_type(expected: &Value, actual: &Value, location: &str) -> Result<(), MatchError> {
    match expected {
        Value::String(name) => {
            let spec: TypeSpec = name
                .parse()
                .map_err(|reason: String| failure(format!("{reason} at {location}"), actual))?;
            if spec.matches(actual) {
                Ok(())
            } else {
                Err(failure(
                    format!(
                        "expected {location} to be of type {spec}, got {}",
                        json_type_name(actual)
                    ),
                    actual,
                ))
            }
        }
        Value::Object(expected_map) => {
            let Some(actual_map) = actual.as_object() else {
                return Err(failure(
                    format!(
                        "expected {location} to be an object, got {}",
                        json_type_name(actual)
                    ),
                    actual,
                ));
            };
            for (key, expected_type) in expected_map {
                let child = format!("{location}.{key}");
                match actual_map.get(key) {
                    Some(actual_value) => match_type(expected_type, actual_value, &child)?,
                    None if accepts_absent(expected_type) => {}
                    None => {
                        return Err(failure(
                            format!("expected key `{child}` to be present"),
                            actual,
                        ));
                    }
                }
            }
            Ok(())
        }
        other => Err(failure(
            format!("unsupported type expectation {other} at {location}"),
            actual,
        )),
    }
}

fn accepts_absent(expected_type: &Value) -> bool {
    expected_type
        .as_str()
        .and_then(|name| name.parse::<TypeSpec>().ok())
        .is_some_and(|spec| spec.nullable)
}

fn regex_pattern(expected: &Value) -> Option<&str> {
    let map = expected.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("$regex")?.as_str()
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return left == right;
    }
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return left == right;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

fn failure(message: String, actual: &Value) -> MatchError {
    MatchError::Predicate {
        message,
        actual: actual.clone(),
    }
}
