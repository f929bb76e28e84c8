use std::io::Cursor;

use expectq::domain::rules::{CheckRules, ExpectKind};
use expectq::io::Format;
use expectq::io::reader::read_value;

#[test]
fn yaml_rules_deserialize_like_json_rules() {
    let yaml = r#"
request:
  method: PATCH
  url: /items/1
  headers:
    x-client: tests
  body: "a=1"
  nonjson: true
expectations:
  - kind: status
    expected: 200
  - kind: json
    path: items.*.id
    optional: true
    expected: 1
"#;
    let value = read_value(Cursor::new(yaml), Format::Yaml).expect("yaml");
    let rules: CheckRules = serde_json::from_value(value).expect("rules");

    let request = rules.request.expect("request");
    assert_eq!(request.method.as_str(), "PATCH");
    assert!(request.nonjson);
    assert_eq!(request.headers.get("x-client").map(String::as_str), Some("tests"));
    assert_eq!(rules.expectations[0].kind, ExpectKind::Status);
    assert!(rules.expectations[1].optional);
}

#[test]
fn unknown_method_is_rejected() {
    let value = read_value(
        Cursor::new(r#"{"request":{"method":"BREW","url":"/"}}"#),
        Format::Json,
    )
    .expect("json");
    assert!(serde_json::from_value::<CheckRules>(value).is_err());
}
