use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Failures raised while resolving a path expression against a value tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// Raw path contained an empty `..` segment.
    #[error("invalid path `{path}`, contains '..'")]
    InvalidPath { path: String },

    /// A literal segment could not be resolved against the current value.
    #[error("expected {actual}\nto be an object with property `{key}`")]
    PathNavigation {
        key: String,
        actual: &'static str,
        value: Value,
    },

    /// A quantifier segment found something other than an array or object.
    #[error("expected `{path}` to be array or object, got {actual}")]
    Expectation {
        path: String,
        actual: &'static str,
        value: Value,
    },

    /// `*` quantifier: at least one element failed; carries the most recent failure.
    #[error("{failed} of {total} elements in `{path}` did not match: {last}")]
    AllFailed {
        path: String,
        total: usize,
        failed: usize,
        last: Box<MatchError>,
    },

    /// `*` quantifier under [`FailurePolicy::CollectAll`](crate::engine::expect::FailurePolicy).
    #[error(
        "{} of {total} elements in `{path}` did not match:{}",
        count_failures(.failures),
        render_failures(.failures)
    )]
    AllFailures {
        path: String,
        total: usize,
        failures: Vec<MatchError>,
    },

    /// `?` quantifier: no element matched.
    #[error("expected at least one of {element_count} elements in `{path}` to match, 0 matched")]
    NoneMatched {
        path: String,
        element_count: usize,
        failure_count: usize,
        elements: Value,
    },

    /// Terminal predicate rejected a resolved value.
    #[error("{message}")]
    Predicate { message: String, actual: Value },
}

impl MatchError {
    /// The data element the failure points at, following nested quantifier failures.
    pub fn element(&self) -> Option<&Value> {
        match self {
            Self::InvalidPath { .. } => None,
            Self::PathNavigation { value, .. } | Self::Expectation { value, .. } => Some(value),
            Self::Predicate { actual, .. } => Some(actual),
            Self::AllFailed { last, .. } => last.element(),
            Self::AllFailures { failures, .. } => failures.last().and_then(MatchError::element),
            Self::NoneMatched { elements, .. } => Some(elements),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } => "invalid_path",
            Self::PathNavigation { .. } => "path_navigation",
            Self::Expectation { .. } => "expectation",
            Self::AllFailed { .. } | Self::AllFailures { .. } => "quantifier_all",
            Self::NoneMatched { .. } => "quantifier_one",
            Self::Predicate { .. } => "predicate",
        }
    }
}

fn count_failures(failures: &[MatchError]) -> usize {
    failures.len()
}

fn render_failures(failures: &[MatchError]) -> String {
    failures
        .iter()
        .map(|failure| format!("\n  - {failure}"))
        .collect()
}

/// Context attached to a [`TestFailure`] by the layers it passed through.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextFrame {
    /// Arguments of the expectation call, rendered as a JSON array.
    Arguments(Value),
    /// The data element that failed.
    Element(Value),
    /// Request/response dump added by diagnostic capture.
    Diagnostics(String),
}

impl fmt::Display for ContextFrame {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arguments(args) => write!(formatter, "expect arguments: {args}"),
            Self::Element(element) => write!(formatter, "failed element: {element}"),
            Self::Diagnostics(dump) => formatter.write_str(dump),
        }
    }
}

/// Outward-facing assertion failure.
///
/// Layers push context frames in order; the message is assembled only by
/// `Display`.
#[derive(Debug, Clone, PartialEq)]
pub struct TestFailure {
    reason: String,
    cause: Option<MatchError>,
    frames: Vec<ContextFrame>,
}

impl TestFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            cause: None,
            frames: Vec::new(),
        }
    }

    pub fn with_frame(mut self, frame: ContextFrame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn cause(&self) -> Option<&MatchError> {
        self.cause.as_ref()
    }

    pub fn frames(&self) -> &[ContextFrame] {
        &self.frames
    }

    pub fn has_diagnostics(&self) -> bool {
        self.frames
            .iter()
            .any(|frame| matches!(frame, ContextFrame::Diagnostics(_)))
    }
}

impl From<MatchError> for TestFailure {
    fn from(error: MatchError) -> Self {
        Self {
            reason: error.to_string(),
            cause: Some(error),
            frames: Vec::new(),
        }
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.reason)?;
        for frame in &self.frames {
            write!(formatter, "\n{frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TestFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
