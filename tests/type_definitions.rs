use std::sync::Arc;

use json_coerce::{
    validate, Constraint, DefinitionError, ErrorKind, Field, Predicate, Registry, Scope, ScopeBuilder,
    TypeExpr, Value,
};
use serde_json::json;

fn ok(ty: &TypeExpr, input: serde_json::Value) -> serde_json::Value {
    validate(ty, &Value::from(input)).unwrap().to_json()
}

fn kind(ty: &TypeExpr, input: serde_json::Value) -> ErrorKind {
    validate(ty, &Value::from(input)).unwrap_err().kind
}

fn positive_even() -> TypeExpr {
    TypeExpr::refine(TypeExpr::int(), [
        Constraint::new("even", Predicate::Even),
        Constraint::new("positive", Predicate::gt(0)),
    ])
}

// ------------------------------ Scenarios ---------------------------------- //

#[test]
fn int_from_string() {
    assert_eq!(ok(&TypeExpr::int(), json!("42")), json!(42));
    assert_eq!(kind(&TypeExpr::int(), json!("bad")), ErrorKind::CoercionFailure);
}

#[test]
fn record_with_optional_age() {
    let person = TypeExpr::record([
        Field::required("name", TypeExpr::string()),
        Field::optional("age", TypeExpr::int()),
    ]);
    assert_eq!(ok(&person, json!({"name": "Alice"})), json!({"name": "Alice"}));

    let err = validate(&person, &Value::from(json!({"age": "30"}))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingRequiredField);
    assert!(err.message.contains("name"));
}

#[test]
fn array_of_ints() {
    let ints = TypeExpr::array(TypeExpr::int());
    assert_eq!(ok(&ints, json!(["1", "2", "3"])), json!([1, 2, 3]));

    let err = validate(&ints, &Value::from(json!(["1", null, "3"]))).unwrap_err();
    assert_eq!(err.path.to_string(), "[1]");
}

#[test]
fn positive_even_refinement() {
    let ty = positive_even();
    assert_eq!(ok(&ty, json!("42")), json!(42));
    assert_eq!(kind(&ty, json!("41")), ErrorKind::RefinementViolation);
    assert_eq!(kind(&ty, json!("-2")), ErrorKind::RefinementViolation);
}

#[test]
fn bool_from_string() {
    assert_eq!(ok(&TypeExpr::bool(), json!("true")), json!(true));
    assert_eq!(ok(&TypeExpr::bool(), json!("false")), json!(false));
    assert!(validate(&TypeExpr::bool(), &Value::from(json!("1"))).is_err());
}

#[test]
fn open_empty_record_drops_everything() {
    let ty = TypeExpr::open_record([]);
    assert_eq!(ok(&ty, json!({"a": 1, "b": "two"})), json!({}));
}

// ------------------------------ Properties --------------------------------- //

#[test]
fn outputs_validate_to_themselves() {
    let cases = [
        (TypeExpr::int(), json!("42")),
        (TypeExpr::float(), json!("2.5")),
        (TypeExpr::datetime(), json!("2024-01-15T10:30:00")),
        (TypeExpr::array(TypeExpr::union([TypeExpr::int(), TypeExpr::string()])), json!(["1", "x"])),
        (positive_even(), json!("8")),
        (
            TypeExpr::open_record([Field::required("n", TypeExpr::nullable(TypeExpr::int()))]),
            json!({"n": null, "junk": true}),
        ),
    ];
    for (ty, input) in cases {
        let first = validate(&ty, &Value::from(input)).unwrap();
        let second = validate(&ty, &first).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn one_bad_element_fails_the_array_wherever_it_sits() {
    let ints = TypeExpr::array(TypeExpr::int());
    for pos in 0..4 {
        let mut items = vec![json!("1"); 4];
        items[pos] = json!("x");
        let err = validate(&ints, &Value::from(json!(items))).unwrap_err();
        assert_eq!(err.path.to_string(), format!("[{pos}]"));
    }
}

#[test]
fn closed_rejects_and_open_drops_unknown_keys() {
    let fields = [Field::required("id", TypeExpr::int())];
    let input = json!({"id": 1, "stray": 2});
    assert_eq!(kind(&TypeExpr::record(fields.clone()), input.clone()), ErrorKind::UnknownField);
    let out = ok(&TypeExpr::open_record(fields), input);
    assert!(out.get("stray").is_none());
}

#[test]
fn bool_and_int_never_mix() {
    assert_eq!(kind(&TypeExpr::int(), json!(true)), ErrorKind::TypeMismatch);
    assert_eq!(kind(&TypeExpr::bool(), json!(1)), ErrorKind::TypeMismatch);
}

// ----------------------------- Scopes & units ------------------------------ //

fn build(defs: &str) -> Result<Arc<Scope>, DefinitionError> {
    let reg = Registry::new();
    reg.load_json("test", defs)
}

#[test]
fn datetime_field_exposes_calendar_parts() {
    let scope = ScopeBuilder::new("events")
        .define("Event", TypeExpr::record([Field::required("at", TypeExpr::datetime())]))
        .unwrap()
        .build()
        .unwrap();
    let event = scope.compile("Event").unwrap();
    let out = event.validate(&Value::from(json!({"at": "2024-01-15T10:30:00"}))).unwrap();
    let at = out.get("at").unwrap();
    assert_eq!(at.year(), Some(2024));
    assert_eq!(at.month(), Some(1));
    assert_eq!(at.hour(), Some(10));
}

#[test]
fn units_with_the_same_type_name_stay_apart() {
    let reg = Registry::new();
    reg.load_json("strict", r#"{ "types": [ { "name": "Person", "type": { "kind": "type_schema",
        "properties": [ { "key": "name", "type": { "kind": "type_ref", "name": "String" } } ] } } ] }"#)
        .unwrap();
    reg.load_json("lenient", r#"{ "types": [ { "name": "Person", "type": { "kind": "type_schema",
        "extras": "ignored",
        "properties": [ { "key": "name", "type": { "kind": "type_ref", "name": "String" } } ] } } ] }"#)
        .unwrap();

    let input = json!({"name": "Alice", "extra": "x"});
    let strict = reg.validator("strict", "Person").unwrap();
    let lenient = reg.validator("lenient", "Person").unwrap();
    assert_eq!(strict.validate_json(&input).unwrap_err().kind, ErrorKind::UnknownField);
    assert_eq!(lenient.validate_json(&input).unwrap(), json!({"name": "Alice"}));
}

#[test]
fn recursive_tree_builds_and_loop_does_not() {
    let scope = build(r#"{ "types": [ { "name": "Tree", "type": { "kind": "type_schema", "properties": [
        { "key": "value", "type": { "kind": "type_ref", "name": "Int" } },
        { "key": "children", "type": { "kind": "array_type", "element": { "kind": "type_ref", "name": "Tree" } } }
    ] } } ] }"#)
    .unwrap();
    let tree = scope.compile("Tree").unwrap();
    let out = tree
        .validate_json(&json!({"value": "1", "children": [{"value": "2", "children": []}]}))
        .unwrap();
    assert_eq!(out, json!({"value": 1, "children": [{"value": 2, "children": []}]}));

    let err = build(r#"{ "types": [ { "name": "Loop", "type": { "kind": "nullable",
        "inner": { "kind": "type_ref", "name": "Loop" } } } ] }"#)
    .unwrap_err();
    assert!(matches!(err, DefinitionError::UnguardedRecursion { .. }), "{err}");
}

#[test]
fn typed_extras_are_coerced() {
    let scores = TypeExpr::record_with_extras([Field::required("name", TypeExpr::string())], TypeExpr::int());
    assert_eq!(
        ok(&scores, json!({"name": "a", "math": "90"})),
        json!({"name": "a", "math": 90})
    );
    let err = validate(&scores, &Value::from(json!({"name": "a", "math": "x"}))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::CoercionFailure);
    assert_eq!(err.path.to_string(), ".math");
}

#[test]
fn validators_are_shared_across_threads() {
    let scope = ScopeBuilder::new("shared")
        .define("Ints", TypeExpr::array(TypeExpr::int()))
        .unwrap()
        .build()
        .unwrap();
    let ints = scope.compile("Ints").unwrap();
    std::thread::scope(|s| {
        for n in 0..4 {
            let ints = &ints;
            s.spawn(move || {
                let out = ints.validate_json(&json!([n.to_string()])).unwrap();
                assert_eq!(out, json!([n]));
            });
        }
    });
}
