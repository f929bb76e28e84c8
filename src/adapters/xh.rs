use std::process::{Command, Stdio};

use thiserror::Error;

use crate::adapters::Transport;
use crate::config::XH_BIN_ENV;
use crate::domain::request::PreparedRequest;
use crate::io::HttpResponse;

#[derive(Debug, Error)]
pub enum XhError {
    #[error("`xh` is not available in PATH")]
    Unavailable,
    #[error("failed to spawn xh: {0}")]
    Spawn(std::io::Error),
    #[error("xh execution failed: {0}")]
    Execution(String),
    #[error("failed to parse xh response: {0}")]
    Parse(String),
}

/// Transport that drives the `xh` CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XhTransport {
    bin: String,
}

impl XhTransport {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Uses `EXPECTQ_XH_BIN` when set, `xh` from PATH otherwise.
    pub fn from_env() -> Self {
        Self::new(std::env::var(XH_BIN_ENV).unwrap_or_else(|_| "xh".to_string()))
    }
}

impl Transport for XhTransport {
    type Error = XhError;

    fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, XhError> {
        tracing::debug!(
            bin = self.bin.as_str(),
            method = request.method.as_str(),
            url = request.url.as_str(),
            "dispatching request through xh"
        );
        let output = match Command::new(&self.bin)
            .args(build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child.wait_with_output().map_err(XhError::Spawn)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(XhError::Unavailable);
            }
            Err(error) => return Err(XhError::Spawn(error)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8(output.stderr)
                .unwrap_or_else(|_| "failed to decode xh stderr".to_string());
            return Err(XhError::Execution(stderr.trim().to_string()));
        }

        HttpResponse::parse_raw(&output.stdout).map_err(|error| XhError::Parse(error.to_string()))
    }
}

/// Command-line arguments for one request. User input is passed as
/// separate arguments, never through a shell.
pub fn build_args(request: &PreparedRequest) -> Vec<String> {
    let mut args = vec![
        "--ignore-stdin".to_string(),
        "--pretty=none".to_string(),
        "--print=hb".to_string(),
    ];
    if request.follow_redirects {
        args.push("--follow".to_string());
    }
    if let Some(proxy) = &request.proxy {
        args.push(format!("--proxy=all:{proxy}"));
    }
    if let Some(timeout) = request.timeout_secs {
        args.push(format!("--timeout={timeout}"));
    }

    args.push(request.method.as_str().to_string());
    args.push(request.url.clone());
    for (name, value) in &request.headers {
        args.push(format!("{name}:{value}"));
    }
    if let Some(payload) = &request.payload {
        args.push("--raw".to_string());
        args.push(payload.clone());
    }
    args
}
