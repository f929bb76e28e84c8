use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::request::HttpMethod;
use crate::util::time::is_rfc3339;

/// Rule file schema for the `check` command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CheckRules {
    #[serde(default)]
    pub request: Option<RequestRule>,
    #[serde(default)]
    pub expectations: Vec<ExpectationRule>,
}

/// Request issued before expectations run when no recorded response is given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RequestRule {
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Send `body` verbatim instead of JSON-encoding it.
    #[serde(default)]
    pub nonjson: bool,
}

/// One expectation entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExpectationRule {
    pub kind: ExpectKind,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub optional: bool,
    pub expected: Value,
}

/// Which data source and terminal predicate an expectation uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpectKind {
    Json,
    JsonTypes,
    Header,
    HeaderTypes,
    Status,
}

impl ExpectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonTypes => "json_types",
            Self::Header => "header",
            Self::HeaderTypes => "header_types",
            Self::Status => "status",
        }
    }
}

/// Expected JSON value type for a type expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    String,
    Integer,
    Float,
    Number,
    Boolean,
    Null,
    Array,
    Object,
    Date,
    ArrayOf(Box<ValueType>),
}

impl ValueType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
            Self::Float => value.is_f64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Null => value.is_null(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Date => value.as_str().is_some_and(is_rfc3339),
            Self::ArrayOf(inner) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| inner.matches(item))),
        }
    }

    fn parse_base(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "integer" | "int" => Self::Integer,
            "float" => Self::Float,
            "number" => Self::Number,
            "boolean" | "bool" => Self::Boolean,
            "null" => Self::Null,
            "array" => Self::Array,
            "object" | "hash" => Self::Object,
            "date" => Self::Date,
            _ => return None,
        })
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => formatter.write_str("string"),
            Self::Integer => formatter.write_str("integer"),
            Self::Float => formatter.write_str("float"),
            Self::Number => formatter.write_str("number"),
            Self::Boolean => formatter.write_str("boolean"),
            Self::Null => formatter.write_str("null"),
            Self::Array => formatter.write_str("array"),
            Self::Object => formatter.write_str("object"),
            Self::Date => formatter.write_str("date"),
            Self::ArrayOf(inner) => write!(formatter, "array_of_{inner}s"),
        }
    }
}

/// Type name with an optional `?` suffix (`integer?`) accepting null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub value_type: ValueType,
    pub nullable: bool,
}

impl TypeSpec {
    pub fn matches(&self, value: &Value) -> bool {
        (self.nullable && value.is_null()) || self.value_type.matches(value)
    }
}

impl FromStr for TypeSpec {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let (name, nullable) = match trimmed.strip_suffix('?') {
            Some(name) => (name, true),
            None => (trimmed, false),
        };

        let value_type = match name.strip_prefix("array_of_") {
            Some(element) => {
                let singular = element.strip_suffix('s').unwrap_or(element);
                ValueType::parse_base(singular).map(|inner| ValueType::ArrayOf(Box::new(inner)))
            }
            None => ValueType::parse_base(name),
        }
        .ok_or_else(|| format!("unknown type `{input}`"))?;

        Ok(Self {
            value_type,
            nullable,
        })
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.value_type)?;
        if self.nullable {
            formatter.write_str("?")?;
        }
        Ok(())
    }
}

/// Runtime kind name of a JSON value, used in failure messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
