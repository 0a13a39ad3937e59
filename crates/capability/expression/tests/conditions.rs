use appng_expression::{ExpressionError, ExpressionEvaluator, ParameterSupport, parse};
use std::collections::BTreeMap;

fn parameters(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn reference_params_are_substituted_before_condition() {
    let caller = ParameterSupport::dollar(parameters(&[("selectedId", "3")])).expect("support");
    let person_id = caller.replace("${selectedId}");
    let resolved = parameters(&[("personId", person_id.as_str())]);

    let evaluator = ExpressionEvaluator::with_parameters(&resolved);
    assert!(evaluator.is_true("${not empty personId and personId ge 1}"));
}

#[test]
fn condition_syntax_is_validated() {
    assert!(parse("${a eq}").is_err());
    assert!(parse("${(a or b) and !c}").is_ok());
}

#[test]
fn strict_evaluation_accepts_declared_parameters() {
    let mut evaluator = ExpressionEvaluator::strict();
    evaluator.set_variable("personId", domain::Value::Null);
    assert!(evaluator.evaluate("${personId eq 1}").is_ok());
    assert!(matches!(
        evaluator.evaluate("${personid eq 1}"),
        Err(ExpressionError::UnresolvedVariable(name)) if name == "personid"
    ));
}

#[test]
fn lenient_evaluation_never_fails() {
    let evaluator = ExpressionEvaluator::new();
    assert!(!evaluator.is_true("${a +}"));
    assert!(!evaluator.is_true("${unknown}"));
}
