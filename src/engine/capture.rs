use std::fmt;

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use thiserror::Error;

use crate::domain::error::{ContextFrame, TestFailure};
use crate::domain::request::{HttpMethod, PreparedRequest};
use crate::io::HttpResponse;
use crate::util::time::{diagnostic_timestamp, now_local};

/// One request/response pair observed by a session.
#[derive(Debug)]
pub struct Exchange {
    /// `None` when the response was loaded rather than requested.
    pub request: Option<PreparedRequest>,
    pub response: HttpResponse,
}

/// Anything that may hold the most recent exchange.
pub trait ExchangeSource {
    fn exchange(&self) -> Option<&Exchange>;
}

/// Error returned by [`guard`].
#[derive(Debug, Error)]
pub enum Captured<E> {
    /// No response was available; the original error, untouched.
    #[error("{0}")]
    Unobserved(E),
    /// The original failure enriched with the request/response dump.
    #[error("{0}")]
    Failure(TestFailure),
}

impl<E: Into<TestFailure>> Captured<E> {
    pub fn into_failure(self) -> TestFailure {
        match self {
            Self::Unobserved(error) => error.into(),
            Self::Failure(failure) => failure,
        }
    }
}

/// Runs `action`; on failure, attaches a dump of the subject's last
/// exchange when one exists and passes the error through unchanged
/// otherwise.
pub fn guard<S, R, E>(
    subject: &mut S,
    action: impl FnOnce(&mut S) -> Result<R, E>,
) -> Result<R, Captured<E>>
where
    S: ExchangeSource,
    E: Into<TestFailure>,
{
    action(subject).map_err(|error| match subject.exchange() {
        Some(exchange) => {
            let dump = render_exchange(exchange, &now_local());
            Captured::Failure(error.into().with_frame(ContextFrame::Diagnostics(dump)))
        }
        None => Captured::Unobserved(error),
    })
}

/// Human-readable dump of an exchange, starting with a `TIME:` line.
pub fn render_exchange<Tz: TimeZone>(exchange: &Exchange, now: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    let mut dump = format!("TIME: {}\n", diagnostic_timestamp(now));
    if let Some(request) = &exchange.request {
        dump.push_str(&render_request(request));
    }
    dump.push_str(&render_response(exchange));
    dump
}

fn render_request(request: &PreparedRequest) -> String {
    format!(
        "REQUEST: {} {}\n  HEADERS:\n{}\n  PAYLOAD:\n{}\n",
        request.method,
        request.url,
        pretty(&request.headers),
        request.payload.as_deref().unwrap_or_default()
    )
}

fn render_response(exchange: &Exchange) -> String {
    let response = &exchange.response;
    let mut section = format!(
        "RESPONSE: {}\n  HEADERS:\n{}\n",
        response.status(),
        pretty(response.headers())
    );

    let is_head = exchange
        .request
        .as_ref()
        .is_some_and(|request| request.method == HttpMethod::Head);
    if is_head {
        return section;
    }

    match response.json_body() {
        Ok(body) if response.is_json() => {
            section.push_str(&format!("  JSON_BODY\n{}\n", pretty(body)));
        }
        _ => section.push_str(&format!("  BODY\n{}\n", response.body_text())),
    }
    section
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "<serialization-error>".to_string())
}
