use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Report produced by the `check` command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckReport {
    pub matched: bool,
    pub failure_count: usize,
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn from_results(results: Vec<CheckResult>) -> Self {
        let failure_count = results.iter().filter(|result| !result.passed).count();
        Self {
            matched: failure_count == 0,
            failure_count,
            results,
        }
    }
}

/// Outcome of one expectation entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckResult {
    pub index: usize,
    pub kind: String,
    pub args: Value,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
