use expectq::domain::error::MatchError;
use expectq::domain::path::Path;
use expectq::engine::expect::{
    ExpectArgs, FailurePolicy, TypeMatch, ValueMatch, invoke, resolve,
};
use serde_json::{Value, json};

fn catalog() -> Value {
    json!({
        "products": [
            {"sku": "a-1", "variants": [{"size": "S", "stock": 0}, {"size": "M", "stock": 3}]},
            {"sku": "b-2", "variants": [{"size": "L", "stock": 5}]},
            {"sku": "c-3", "variants": [], "discontinued": true}
        ],
        "owner": null
    })
}

fn positive_stock(value: &Value) -> Result<(), MatchError> {
    match value.as_i64() {
        Some(stock) if stock > 0 => Ok(()),
        _ => Err(MatchError::Predicate {
            message: format!("expected positive stock, got {value}"),
            actual: value.clone(),
        }),
    }
}

#[test]
fn mixed_quantifiers_express_every_and_some() {
    let path = Path::parse("products.*.variants.?.stock").expect("path");
    let error = resolve(&path, &catalog(), &positive_stock).expect_err("empty variants fail");
    match error {
        MatchError::AllFailed { total, failed, last, .. } => {
            assert_eq!(total, 3);
            assert_eq!(failed, 1);
            assert!(matches!(
                *last,
                MatchError::NoneMatched { element_count: 0, .. }
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let in_stock = json!({"products": [catalog()["products"][0].clone(), catalog()["products"][1].clone()]});
    assert!(resolve(&path, &in_stock, &positive_stock).is_ok());
}

#[test]
fn expectation_calls_cover_value_and_type_matching() {
    let data = catalog();
    let policy = FailurePolicy::default();

    assert!(invoke(&data, &ExpectArgs::at("products.?.sku", json!("b-2")), &ValueMatch, policy).is_ok());
    assert!(
        invoke(
            &data,
            &ExpectArgs::at("products.*", json!({"sku": "string", "variants": "array"})),
            &TypeMatch,
            policy
        )
        .is_ok()
    );
    assert!(
        invoke(
            &data,
            &ExpectArgs::at("owner.?.name", json!("x")).optional(),
            &ValueMatch,
            policy
        )
        .is_ok()
    );

    let failure = invoke(
        &data,
        &ExpectArgs::at("products.?.sku", json!("z-9")),
        &ValueMatch,
        policy,
    )
    .expect_err("no sku matches");
    assert!(
        failure
            .to_string()
            .starts_with("expected at least one of 3 elements in `products.?.sku` to match, 0 matched")
    );
}

#[test]
fn navigation_errors_name_the_missing_property() {
    let failure = invoke(
        &catalog(),
        &ExpectArgs::at("products.*.price", json!(1)),
        &ValueMatch,
        FailurePolicy::default(),
    )
    .expect_err("price is absent");
    assert!(failure.to_string().contains("to be an object with property `price`"));
}

#[test]
fn strict_policy_reports_each_failing_element() {
    let failure = invoke(
        &catalog(),
        &ExpectArgs::at("products.*.sku", json!("a-1")),
        &ValueMatch,
        FailurePolicy::CollectAll,
    )
    .expect_err("two skus differ");
    let message = failure.to_string();
    assert!(message.contains("2 of 3 elements in `products.*.sku` did not match"));
    assert!(message.contains("got \"b-2\""));
    assert!(message.contains("got \"c-3\""));
}
