use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::io::Read;

use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::error::TestFailure;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Failure decoding a response body into a JSON value tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("api request returned invalid json: {0}")]
    InvalidJson(String),
    #[error("failed to decompress gzip body: {0}")]
    Gzip(String),
}

impl From<DecodeError> for TestFailure {
    fn from(error: DecodeError) -> Self {
        TestFailure::new(error.to_string())
    }
}

/// Failure parsing a raw `HTTP/x.y status` + headers + body response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse http response: {0}")]
pub struct ResponseParseError(String);

/// Received HTTP response with a lazily decoded, memoized JSON body.
#[derive(Debug)]
pub struct HttpResponse {
    status: u16,
    /// Lowercased header names; repeated headers joined with `, `.
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
    json: OnceCell<Result<Value, DecodeError>>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: Vec<u8>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self {
            status,
            headers,
            body,
            json: OnceCell::new(),
        }
    }

    /// Parses a raw response as printed by `xh --print=hb` or recorded to a file.
    pub fn parse_raw(raw: &[u8]) -> Result<Self, ResponseParseError> {
        let (head, body) = split_head_and_body(raw);
        let head = std::str::from_utf8(head)
            .map_err(|error| ResponseParseError(format!("head is not valid UTF-8: {error}")))?;

        let mut lines = head.lines();
        let status_line = lines
            .next()
            .ok_or_else(|| ResponseParseError("missing HTTP status line".to_string()))?;
        let status = parse_status_line(status_line)?;

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (name, value) = trimmed
                .split_once(':')
                .ok_or_else(|| ResponseParseError(format!("invalid header line `{trimmed}`")))?;
            let key = name.trim().to_ascii_lowercase();
            if key.is_empty() {
                return Err(ResponseParseError("header name cannot be empty".to_string()));
            }
            let value = value.trim().to_string();
            headers
                .entry(key)
                .and_modify(|existing| {
                    if !existing.is_empty() {
                        existing.push_str(", ");
                    }
                    existing.push_str(value.as_str());
                })
                .or_insert(value);
        }

        Ok(Self::new(status, headers, body.to_vec()))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Headers as a flat JSON object, the data source for header expectations.
    pub fn headers_value(&self) -> Value {
        Value::Object(
            self.headers
                .iter()
                .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                .collect::<Map<String, Value>>(),
        )
    }

    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .is_some_and(|value| value.contains("application/json"))
    }

    /// Body bytes with transport gzip compression reversed.
    ///
    /// Bodies already decompressed by the transport are passed through even
    /// when `content-encoding: gzip` is still declared.
    pub fn decoded_body(&self) -> Result<Cow<'_, [u8]>, DecodeError> {
        let gzipped = self
            .header("content-encoding")
            .is_some_and(|value| value.to_ascii_lowercase().contains("gzip"));
        if !gzipped || !self.body.starts_with(&GZIP_MAGIC) {
            return Ok(Cow::Borrowed(&self.body));
        }

        let mut decoded = Vec::new();
        GzDecoder::new(self.body.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|error| DecodeError::Gzip(error.to_string()))?;
        Ok(Cow::Owned(decoded))
    }

    pub fn body_text(&self) -> String {
        match self.decoded_body() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::from_utf8_lossy(&self.body).into_owned(),
        }
    }

    /// Decoded JSON body. Decoding runs at most once per response.
    pub fn json_body(&self) -> Result<&Value, DecodeError> {
        self.json
            .get_or_init(|| {
                tracing::debug!(bytes = self.body.len(), "decoding response body");
                let bytes = self.decoded_body()?;
                serde_json::from_slice(&bytes)
                    .map_err(|error| DecodeError::InvalidJson(error.to_string()))
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

fn split_head_and_body(raw: &[u8]) -> (&[u8], &[u8]) {
    let earliest = [&b"\r\n\r\n"[..], &b"\n\n"[..]]
        .into_iter()
        .filter_map(|separator| {
            raw.windows(separator.len())
                .position(|window| window == separator)
                .map(|position| (position, separator.len()))
        })
        .min();
    match earliest {
        Some((position, len)) => (&raw[..position], &raw[position + len..]),
        None => (raw, &[]),
    }
}

fn parse_status_line(status_line: &str) -> Result<u16, ResponseParseError> {
    let mut tokens = status_line.split_ascii_whitespace();
    let http_version = tokens
        .next()
        .ok_or_else(|| ResponseParseError("missing HTTP version in status line".to_string()))?;
    if !http_version.starts_with("HTTP/") {
        return Err(ResponseParseError(format!(
            "status line must start with HTTP version, got `{status_line}`"
        )));
    }
    let status_raw = tokens
        .next()
        .ok_or_else(|| ResponseParseError("missing status code in status line".to_string()))?;
    status_raw
        .parse::<u16>()
        .map_err(|_| ResponseParseError(format!("invalid status code `{status_raw}`")))
}
