use std::cell::RefCell;
use std::collections::BTreeMap;

use expectq::adapters::Transport;
use expectq::config::Config;
use expectq::domain::error::TestFailure;
use expectq::domain::request::{PreparedRequest, RequestOptions};
use expectq::engine::capture::Captured;
use expectq::engine::expect::ExpectArgs;
use expectq::engine::session::ApiSession;
use expectq::io::HttpResponse;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error("scripted transport exhausted")]
struct Exhausted;

/// Returns queued responses in order and keeps every request it saw.
struct Scripted {
    responses: RefCell<Vec<HttpResponse>>,
    seen: RefCell<Vec<PreparedRequest>>,
}

impl Scripted {
    fn new(mut responses: Vec<HttpResponse>) -> Self {
        responses.reverse();
        Self {
            responses: RefCell::new(responses),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Transport for Scripted {
    type Error = Exhausted;

    fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, Exhausted> {
        self.seen.borrow_mut().push(request.clone());
        self.responses.borrow_mut().pop().ok_or(Exhausted)
    }
}

fn json_response(status: u16, body: &str) -> HttpResponse {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    HttpResponse::new(status, headers, body.as_bytes().to_vec())
}

fn to_failure(error: Exhausted) -> TestFailure {
    TestFailure::new(error.to_string())
}

#[test]
fn create_then_fetch_flow_passes() {
    let transport = Scripted::new(vec![
        json_response(201, r#"{"id":42}"#),
        json_response(200, r#"{"id":42,"tags":[{"name":"x"},{"name":"y"}]}"#),
    ]);
    let config = Config {
        base_url: Some("https://api.example.test".to_string()),
        ..Config::default()
    };
    let mut session = ApiSession::new(config, &transport);

    let result = session.guard(|session| {
        session
            .post("/things", &RequestOptions::new().json(json!({"name": "thing"})))
            .map_err(to_failure)?;
        session.expect_status(201)?;
        let id = session.json_body()?["id"].clone();

        session
            .get(&format!("/things/{id}"), &RequestOptions::new())
            .map_err(to_failure)?;
        session.expect_json(&ExpectArgs::at("id", id))?;
        session.expect_json(&ExpectArgs::at("tags.?.name", json!("y")))?;
        session.expect_json_types(&ExpectArgs::at("tags.*.name", json!("string")))
    });
    assert!(result.is_ok(), "{:?}", result.err());

    let seen = transport.seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].payload.as_deref(), Some(r#"{"name":"thing"}"#));
    assert_eq!(seen[1].url, "https://api.example.test/things/42");
    assert_eq!(seen[1].payload, None);
}

#[test]
fn failure_after_second_request_dumps_latest_exchange() {
    let transport = Scripted::new(vec![
        json_response(200, r#"{"step":1}"#),
        json_response(404, r#"{"error":"missing"}"#),
    ]);
    let mut session = ApiSession::new(Config::default(), &transport);

    let result = session.guard(|session| {
        session
            .get("https://api.example.test/first", &RequestOptions::new())
            .map_err(to_failure)?;
        session
            .delete("https://api.example.test/second", &RequestOptions::new())
            .map_err(to_failure)?;
        session.expect_status(204)
    });

    let failure = result.expect_err("status differs").into_failure();
    let message = failure.to_string();
    assert!(message.starts_with("expected status 204, got 404"));
    assert!(message.contains("REQUEST: DELETE https://api.example.test/second"));
    assert!(message.contains("\"error\": \"missing\""));
    assert!(!message.contains("/first"));
}

#[test]
fn invalid_json_body_is_a_failure_with_diagnostics() {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "text/html".to_string());
    let transport = Scripted::new(vec![HttpResponse::new(
        502,
        headers,
        b"<html>bad gateway</html>".to_vec(),
    )]);
    let mut session = ApiSession::new(Config::default(), &transport);

    let result = session.guard(|session| {
        session
            .get("https://api.example.test/", &RequestOptions::new())
            .map_err(to_failure)?;
        session.expect_json(&ExpectArgs::whole(json!({})))
    });

    match result.expect_err("body is html") {
        Captured::Failure(failure) => {
            let message = failure.to_string();
            assert!(message.starts_with("api request returned invalid json"));
            assert!(message.contains("BODY\n<html>bad gateway</html>"));
        }
        Captured::Unobserved(failure) => panic!("missing diagnostics: {failure}"),
    }
}
