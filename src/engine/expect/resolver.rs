use serde_json::Value;

use crate::domain::error::MatchError;
use crate::domain::path::{Path, PathSegment, Quantifier};
use crate::domain::rules::json_type_name;
use crate::engine::expect::navigator;

/// Terminal check applied to every value a path resolves to.
pub type Terminal<'a> = dyn Fn(&Value) -> Result<(), MatchError> + 'a;

/// How a `*` quantifier reports failing elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Report only the most recent failing element.
    #[default]
    MostRecent,
    /// Report every failing element.
    CollectAll,
}

/// Walks a [`Path`] over a value tree and applies the terminal check at
/// each resolved leaf, aggregating per-element outcomes for quantifiers.
pub struct Resolver<'a> {
    terminal: &'a Terminal<'a>,
    policy: FailurePolicy,
}

impl<'a> Resolver<'a> {
    pub fn new(terminal: &'a Terminal<'a>) -> Self {
        Self {
            terminal,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn resolve(&self, path: &Path, value: &Value) -> Result<(), MatchError> {
        let segments = path.segments();
        let mut current = value;

        for (index, segment) in segments.iter().enumerate() {
            if path.is_optional() && current.is_null() {
                tracing::debug!(%path, index, "optional path reached null, skipping");
                return Ok(());
            }

            match segment {
                PathSegment::Literal(key) => {
                    current = navigator::step(key, current)?;
                }
                PathSegment::Wildcard(quantifier) => {
                    let elements = container_elements(path, current)?;
                    let terminal = index + 1 == segments.len();
                    tracing::debug!(
                        %path,
                        quantifier = quantifier.as_str(),
                        elements = elements.len(),
                        terminal,
                        "resolving quantifier"
                    );

                    let outcome = if terminal {
                        self.aggregate(
                            *quantifier,
                            path,
                            current,
                            elements.into_iter().map(|element| (self.terminal)(element)),
                        )
                    } else {
                        let sub_path = path.sub_path(index);
                        self.aggregate(
                            *quantifier,
                            path,
                            current,
                            elements
                                .into_iter()
                                .map(|element| self.resolve(&sub_path, element)),
                        )
                    };
                    return outcome;
                }
            }
        }

        (self.terminal)(current)
    }

    fn aggregate(
        &self,
        quantifier: Quantifier,
        path: &Path,
        container: &Value,
        outcomes: impl Iterator<Item = Result<(), MatchError>>,
    ) -> Result<(), MatchError> {
        let mut total = 0;
        let mut failed = 0;
        let mut last_failure = None;
        let mut failures = Vec::new();

        // Every element is visited; there is no short-circuit on failure.
        for outcome in outcomes {
            total += 1;
            if let Err(error) = outcome {
                failed += 1;
                if quantifier == Quantifier::All && self.policy == FailurePolicy::CollectAll {
                    failures.push(error);
                } else {
                    last_failure = Some(error);
                }
            }
        }

        match quantifier {
            Quantifier::All if failed == 0 => Ok(()),
            Quantifier::All => match (self.policy, last_failure) {
                (FailurePolicy::MostRecent, Some(last)) => Err(MatchError::AllFailed {
                    path: path.to_string(),
                    total,
                    failed,
                    last: Box::new(last),
                }),
                _ => Err(MatchError::AllFailures {
                    path: path.to_string(),
                    total,
                    failures,
                }),
            },
            Quantifier::One if failed == total => Err(MatchError::NoneMatched {
                path: path.to_string(),
                element_count: total,
                failure_count: failed,
                elements: container.clone(),
            }),
            Quantifier::One => Ok(()),
        }
    }
}

/// Resolves `path` against `value` with the default failure policy.
pub fn resolve(path: &Path, value: &Value, terminal: &Terminal<'_>) -> Result<(), MatchError> {
    Resolver::new(terminal).resolve(path, value)
}

/// Elements a quantifier ranges over: array items, or object values.
fn container_elements<'v>(path: &Path, value: &'v Value) -> Result<Vec<&'v Value>, MatchError> {
    match value {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(map) => Ok(map.values().collect()),
        other => Err(MatchError::Expectation {
            path: path.to_string(),
            actual: json_type_name(other),
            value: other.clone(),
        }),
    }
}
