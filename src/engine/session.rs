use std::collections::BTreeMap;

use serde_json::Value;

use crate::adapters::Transport;
use crate::config::Config;
use crate::domain::error::{ContextFrame, TestFailure};
use crate::domain::request::{HttpMethod, PreparedRequest, RequestBody, RequestOptions};
use crate::engine::capture::{self, Captured, Exchange, ExchangeSource};
use crate::engine::expect::{ExpectArgs, FailurePolicy, TerminalPredicate, TypeMatch, ValueMatch};
use crate::io::HttpResponse;

const JSON_CONTENT_TYPE: &str = "application/json";

/// API test session: issues requests, keeps the last exchange, and runs
/// expectations against its body and headers.
pub struct ApiSession<T> {
    config: Config,
    transport: T,
    policy: FailurePolicy,
    exchange: Option<Exchange>,
}

impl<T: Transport> ApiSession<T> {
    pub fn new(config: Config, transport: T) -> Self {
        Self {
            config,
            transport,
            policy: FailurePolicy::default(),
            exchange: None,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the request exactly as it will be sent.
    pub fn prepare(&self, method: HttpMethod, url: &str, options: &RequestOptions) -> PreparedRequest {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), JSON_CONTENT_TYPE.to_string());
        for (name, value) in &self.config.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }

        let body = options.body.as_ref().filter(|_| method.sends_body());
        if matches!(body, Some(RequestBody::Raw(_)))
            && headers.get("content-type").map(String::as_str) == Some(JSON_CONTENT_TYPE)
        {
            headers.remove("content-type");
        }
        for (name, value) in &options.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }

        let payload = body.map(|body| match body {
            RequestBody::Json(value) => value.to_string(),
            RequestBody::Raw(text) => text.clone(),
        });

        PreparedRequest {
            method,
            url: self.config.resolve_url(url),
            headers,
            payload,
            proxy: self.config.proxy.clone(),
            follow_redirects: self.config.follow_redirects,
            timeout_secs: self.config.timeout_secs,
        }
    }

    /// Sends a request and records the exchange. Any status code is a
    /// response; only transport failures are errors.
    pub fn request(
        &mut self,
        method: HttpMethod,
        url: &str,
        options: &RequestOptions,
    ) -> Result<&HttpResponse, T::Error> {
        let prepared = self.prepare(method, url, options);
        // A new request invalidates the previous exchange and its decoded body.
        self.exchange = None;
        let response = self.transport.send(&prepared)?;
        tracing::debug!(
            method = prepared.method.as_str(),
            url = prepared.url.as_str(),
            status = response.status(),
            "recorded exchange"
        );
        let exchange = self.exchange.insert(Exchange {
            request: Some(prepared),
            response,
        });
        Ok(&exchange.response)
    }

    pub fn get(&mut self, url: &str, options: &RequestOptions) -> Result<&HttpResponse, T::Error> {
        self.request(HttpMethod::Get, url, options)
    }

    pub fn post(&mut self, url: &str, options: &RequestOptions) -> Result<&HttpResponse, T::Error> {
        self.request(HttpMethod::Post, url, options)
    }

    pub fn put(&mut self, url: &str, options: &RequestOptions) -> Result<&HttpResponse, T::Error> {
        self.request(HttpMethod::Put, url, options)
    }

    pub fn patch(&mut self, url: &str, options: &RequestOptions) -> Result<&HttpResponse, T::Error> {
        self.request(HttpMethod::Patch, url, options)
    }

    pub fn delete(&mut self, url: &str, options: &RequestOptions) -> Result<&HttpResponse, T::Error> {
        self.request(HttpMethod::Delete, url, options)
    }

    pub fn head(&mut self, url: &str, options: &RequestOptions) -> Result<&HttpResponse, T::Error> {
        self.request(HttpMethod::Head, url, options)
    }

    pub fn options(&mut self, url: &str, options: &RequestOptions) -> Result<&HttpResponse, T::Error> {
        self.request(HttpMethod::Options, url, options)
    }
}

impl<T> ApiSession<T> {
    /// Records a response obtained elsewhere (for example a recorded file).
    pub fn load_response(&mut self, response: HttpResponse) {
        self.exchange = Some(Exchange {
            request: None,
            response,
        });
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.exchange.as_ref().map(|exchange| &exchange.response)
    }

    pub fn json_body(&self) -> Result<&Value, TestFailure> {
        Ok(self.require_response()?.json_body()?)
    }

    pub fn expect_json(&self, args: &ExpectArgs) -> Result<(), TestFailure> {
        let body = self.body_for(args)?;
        self.run(body, args, &ValueMatch)
    }

    pub fn expect_json_types(&self, args: &ExpectArgs) -> Result<(), TestFailure> {
        let body = self.body_for(args)?;
        self.run(body, args, &TypeMatch)
    }

    /// Header names match case-insensitively in the path and in the keys
    /// of a whole-source expected object.
    pub fn expect_header(&self, args: &ExpectArgs) -> Result<(), TestFailure> {
        let headers = self.require_response()?.headers_value();
        self.run(&headers, &header_args(args), &ValueMatch)
    }

    pub fn expect_header_types(&self, args: &ExpectArgs) -> Result<(), TestFailure> {
        let headers = self.require_response()?.headers_value();
        self.run(&headers, &header_args(args), &TypeMatch)
    }

    pub fn expect_status(&self, expected: u16) -> Result<(), TestFailure> {
        let actual = self.require_response()?.status();
        if actual == expected {
            Ok(())
        } else {
            Err(TestFailure::new(format!("expected status {expected}, got {actual}"))
                .with_frame(ContextFrame::Arguments(Value::Array(vec![Value::from(expected)]))))
        }
    }

    /// Runs `action` under diagnostic capture: a failure raised after a
    /// response exists carries the request/response dump.
    pub fn guard<R, E>(
        &mut self,
        action: impl FnOnce(&mut Self) -> Result<R, E>,
    ) -> Result<R, Captured<E>>
    where
        E: Into<TestFailure>,
    {
        capture::guard(self, action)
    }

    fn run(
        &self,
        data: &Value,
        args: &ExpectArgs,
        predicate: &dyn TerminalPredicate,
    ) -> Result<(), TestFailure> {
        crate::engine::expect::invoke(data, args, predicate, self.policy)
    }

    fn body_for(&self, args: &ExpectArgs) -> Result<&Value, TestFailure> {
        self.json_body()
            .map_err(|failure| failure.with_frame(ContextFrame::Arguments(args.to_value())))
    }

    fn require_response(&self) -> Result<&HttpResponse, TestFailure> {
        self.response()
            .ok_or_else(|| TestFailure::new("no response available; issue a request first"))
    }
}

/// Response header names are stored lowercased; fold the caller's names to match.
fn header_args(args: &ExpectArgs) -> ExpectArgs {
    let folded = match args.path() {
        Some(path) => ExpectArgs::at(path.to_ascii_lowercase(), args.expected().clone()),
        None => ExpectArgs::whole(lowercase_keys(args.expected())),
    };
    if args.is_optional() {
        folded.optional()
    } else {
        folded
    }
}

fn lowercase_keys(expected: &Value) -> Value {
    match expected {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

impl<T> ExchangeSource for ApiSession<T> {
    fn exchange(&self) -> Option<&Exchange> {
        self.exchange.as_ref()
    }
}
