use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};

use crate::adapters::Transport;
use crate::config::Config;
use crate::domain::error::TestFailure;
use crate::domain::report::{CheckReport, CheckResult};
use crate::domain::request::RequestOptions;
use crate::domain::rules::{CheckRules, ExpectKind, ExpectationRule, RequestRule};
use crate::engine::expect::{ExpectArgs, FailurePolicy};
use crate::engine::session::ApiSession;
use crate::io::{self, HttpResponse, IoError};

/// Input arguments for check command execution API.
#[derive(Debug, Clone)]
pub struct CheckCommandArgs {
    pub rules: PathBuf,
    pub response: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub strict: bool,
}

/// Structured command response that carries exit-code mapping and JSON payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckCommandResponse {
    pub exit_code: i32,
    pub payload: Value,
}

#[derive(Debug)]
enum CommandError {
    InputUsage(String),
    Internal(String),
}

/// One expectation after its rule entry has been validated.
enum Planned {
    Json(ExpectArgs),
    JsonTypes(ExpectArgs),
    Header(ExpectArgs),
    HeaderTypes(ExpectArgs),
    Status(u16),
}

impl Planned {
    fn args_value(&self) -> Value {
        match self {
            Self::Json(args) | Self::JsonTypes(args) | Self::Header(args) | Self::HeaderTypes(args) => {
                args.to_value()
            }
            Self::Status(status) => json!([status]),
        }
    }

    fn run<T>(&self, session: &ApiSession<T>) -> Result<(), TestFailure> {
        match self {
            Self::Json(args) => session.expect_json(args),
            Self::JsonTypes(args) => session.expect_json_types(args),
            Self::Header(args) => session.expect_header(args),
            Self::HeaderTypes(args) => session.expect_header_types(args),
            Self::Status(status) => session.expect_status(*status),
        }
    }
}

pub fn run<T: Transport>(args: &CheckCommandArgs, transport: T) -> CheckCommandResponse {
    match execute(args, transport) {
        Ok(report) => report_response(report),
        Err(CommandError::InputUsage(message)) => error_response("input_usage_error", message, 3),
        Err(CommandError::Internal(message)) => error_response("internal_error", message, 1),
    }
}

fn error_response(error: &str, message: String, exit_code: i32) -> CheckCommandResponse {
    CheckCommandResponse {
        exit_code,
        payload: json!({
            "error": error,
            "message": message,
            "code": exit_code,
            "details": {"command": "check"},
        }),
    }
}

fn report_response(report: CheckReport) -> CheckCommandResponse {
    let exit_code = if report.matched { 0 } else { 2 };
    match serde_json::to_value(&report) {
        Ok(payload) => CheckCommandResponse { exit_code, payload },
        Err(_) => error_response(
            "internal_error",
            "failed to serialize check report".to_string(),
            1,
        ),
    }
}

fn execute<T: Transport>(
    args: &CheckCommandArgs,
    transport: T,
) -> Result<CheckReport, CommandError> {
    let config = load_config(args)?;
    let rules = load_rules(args)?;
    let planned = rules
        .expectations
        .iter()
        .enumerate()
        .map(|(index, rule)| plan(index, rule))
        .collect::<Result<Vec<_>, _>>()?;

    let policy = if args.strict {
        FailurePolicy::CollectAll
    } else {
        FailurePolicy::default()
    };
    let mut session = ApiSession::new(config, transport).with_policy(policy);

    match (&args.response, &rules.request) {
        (Some(path), _) => session.load_response(load_response(path)?),
        (None, Some(request)) => {
            let options = request_options(request);
            session
                .request(request.method, &request.url, &options)
                .map_err(|error| CommandError::InputUsage(format!("request failed: {error}")))?;
        }
        (None, None) => {
            return Err(CommandError::InputUsage(
                "rules must define a `request` block unless --response is given".to_string(),
            ));
        }
    }

    let results = planned
        .iter()
        .enumerate()
        .map(|(index, expectation)| {
            let outcome = session.guard(|session| expectation.run(session));
            let kind = rules.expectations[index].kind.as_str().to_string();
            let args = expectation.args_value();
            match outcome {
                Ok(()) => CheckResult {
                    index,
                    kind,
                    args,
                    passed: true,
                    message: None,
                },
                Err(captured) => {
                    tracing::debug!(index, kind = kind.as_str(), "expectation failed");
                    CheckResult {
                        index,
                        kind,
                        args,
                        passed: false,
                        message: Some(captured.into_failure().to_string()),
                    }
                }
            }
        })
        .collect();

    Ok(CheckReport::from_results(results))
}

fn plan(index: usize, rule: &ExpectationRule) -> Result<Planned, CommandError> {
    let args = || {
        let args = match &rule.path {
            Some(path) => ExpectArgs::at(path.clone(), rule.expected.clone()),
            None => ExpectArgs::whole(rule.expected.clone()),
        };
        if rule.optional { args.optional() } else { args }
    };

    Ok(match rule.kind {
        ExpectKind::Json => Planned::Json(args()),
        ExpectKind::JsonTypes => Planned::JsonTypes(args()),
        ExpectKind::Header => Planned::Header(args()),
        ExpectKind::HeaderTypes => Planned::HeaderTypes(args()),
        ExpectKind::Status => {
            if rule.path.is_some() {
                return Err(CommandError::InputUsage(format!(
                    "expectation {index}: status expectations do not take a path"
                )));
            }
            let status = rule
                .expected
                .as_u64()
                .and_then(|status| u16::try_from(status).ok())
                .ok_or_else(|| {
                    CommandError::InputUsage(format!(
                        "expectation {index}: status must be an integer HTTP status code"
                    ))
                })?;
            Planned::Status(status)
        }
    })
}

fn request_options(request: &RequestRule) -> RequestOptions {
    let mut options = request
        .headers
        .iter()
        .fold(RequestOptions::new(), |options, (name, value)| {
            options.header(name.clone(), value.clone())
        });
    if let Some(body) = &request.body {
        options = if request.nonjson {
            match body {
                Value::String(text) => options.raw(text.clone()),
                other => options.raw(other.to_string()),
            }
        } else {
            options.json(body.clone())
        };
    }
    options
}

fn load_config(args: &CheckCommandArgs) -> Result<Config, CommandError> {
    match &args.config {
        Some(path) => {
            Config::load(path).map_err(|error| CommandError::InputUsage(error.to_string()))
        }
        None => Ok(Config::default()),
    }
}

fn load_rules(args: &CheckCommandArgs) -> Result<CheckRules, CommandError> {
    let format = io::resolve_input_format(&args.rules).map_err(|err| {
        CommandError::InputUsage(format!(
            "unable to resolve rules format from `{}`: {err}",
            args.rules.display()
        ))
    })?;
    let file = File::open(&args.rules).map_err(|err| {
        CommandError::InputUsage(format!(
            "failed to open rules file `{}`: {err}",
            args.rules.display()
        ))
    })?;
    let value = io::reader::read_value(file, format).map_err(map_io_error)?;
    if !value.is_object() {
        return Err(CommandError::InputUsage(
            "rules file must contain exactly one object".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|err| CommandError::InputUsage(format!("invalid rules schema: {err}")))
}

fn load_response(path: &Path) -> Result<HttpResponse, CommandError> {
    let raw = fs::read(path).map_err(|err| {
        CommandError::InputUsage(format!(
            "failed to read response file `{}`: {err}",
            path.display()
        ))
    })?;
    HttpResponse::parse_raw(&raw).map_err(|err| CommandError::InputUsage(err.to_string()))
}

fn map_io_error(error: IoError) -> CommandError {
    match error {
        IoError::Io(source) => CommandError::Internal(source.to_string()),
        other => CommandError::InputUsage(other.to_string()),
    }
}
