use serde_json::{Value, json};

use crate::domain::error::{ContextFrame, MatchError, TestFailure};
use crate::domain::path::Path;
use crate::engine::expect::predicate::TerminalPredicate;
use crate::engine::expect::resolver::{FailurePolicy, Resolver};

/// Positional arguments of an expectation call.
///
/// With a path, the expected value applies at that path; without one it
/// applies to the whole data source.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectArgs {
    path: Option<String>,
    optional: bool,
    expected: Value,
}

impl ExpectArgs {
    pub fn whole(expected: Value) -> Self {
        Self {
            path: None,
            optional: false,
            expected,
        }
    }

    pub fn at(path: impl Into<String>, expected: Value) -> Self {
        Self {
            path: Some(path.into()),
            optional: false,
            expected,
        }
    }

    /// Marks the path optional: `null` branches pass vacuously.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn expected(&self) -> &Value {
        &self.expected
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Arguments as the caller passed them, for failure context.
    /// Optional calls carry a trailing `{"optional": true}`.
    pub fn to_value(&self) -> Value {
        let mut items = Vec::with_capacity(3);
        if let Some(path) = &self.path {
            items.push(Value::String(path.clone()));
        }
        items.push(self.expected.clone());
        if self.optional {
            items.push(json!({"optional": true}));
        }
        Value::Array(items)
    }
}

/// Runs one expectation against `data` and normalizes any failure into a
/// [`TestFailure`] carrying the call arguments and the failing element.
pub fn invoke(
    data: &Value,
    args: &ExpectArgs,
    predicate: &dyn TerminalPredicate,
    policy: FailurePolicy,
) -> Result<(), TestFailure> {
    let outcome = match &args.path {
        Some(raw) => parse_path(raw, args.optional).and_then(|path| {
            let terminal = |actual: &Value| predicate.check(&args.expected, actual);
            Resolver::new(&terminal).with_policy(policy).resolve(&path, data)
        }),
        None => predicate.check(&args.expected, data),
    };

    outcome.map_err(|error| enrich(error, args))
}

fn parse_path(raw: &str, optional: bool) -> Result<Path, MatchError> {
    if optional {
        Path::parse_optional(raw)
    } else {
        Path::parse(raw)
    }
}

fn enrich(error: MatchError, args: &ExpectArgs) -> TestFailure {
    tracing::debug!(kind = error.kind(), "expectation failed");
    let element = error.element().cloned();
    let failure = TestFailure::from(error).with_frame(ContextFrame::Arguments(args.to_value()));
    match element {
        Some(element) => failure.with_frame(ContextFrame::Element(element)),
        None => failure,
    }
}
