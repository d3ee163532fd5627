//! Declarative definition input, as produced by an external parser.
//!
//! ```json
//! { "types": [
//!     { "name": "PosInt",
//!       "type": { "kind": "subtype_constraint",
//!                 "base": { "kind": "type_ref", "name": "Int" },
//!                 "constraints": [ { "label": "positive", "condition": { "op": "gt", "value": 0 } } ] } }
//! ] }
//! ```
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeSyntax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeSyntax {
    /// Primitive name (`Int`, `Datetime`, ...) or a defined type.
    TypeRef { name: String },
    TypeSchema {
        #[serde(default)]
        properties: Vec<PropertySyntax>,
        #[serde(default)]
        extras: ExtrasSyntax,
    },
    SubtypeConstraint {
        base: Box<TypeSyntax>,
        #[serde(default)]
        constraints: Vec<ConstraintSyntax>,
    },
    ArrayType { element: Box<TypeSyntax> },
    UnionType { types: Vec<TypeSyntax> },
    Nullable { inner: Box<TypeSyntax> },
    Literal { values: Vec<serde_json::Value> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySyntax {
    pub key: String,
    #[serde(rename = "type")]
    pub ty: TypeSyntax,
    #[serde(default)]
    pub optional: bool,
}

/// `"closed"` (default), `"ignored"`, or a type for the extra values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtrasSyntax {
    Mode(ExtrasMode),
    Typed(Box<TypeSyntax>),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtrasMode {
    Closed,
    Ignored,
}

impl Default for ExtrasSyntax {
    fn default() -> Self { ExtrasSyntax::Mode(ExtrasMode::Closed) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSyntax {
    #[serde(default)]
    pub label: Option<String>,
    pub condition: PredicateSyntax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PredicateSyntax {
    Gt { value: serde_json::Value },
    Ge { value: serde_json::Value },
    Lt { value: serde_json::Value },
    Le { value: serde_json::Value },
    Eq { value: serde_json::Value },
    Ne { value: serde_json::Value },
    Even,
    Odd,
    MinLength { value: usize },
    MaxLength { value: usize },
    Matches { pattern: String },
    All { of: Vec<PredicateSyntax> },
    Any { of: Vec<PredicateSyntax> },
    Not { pred: Box<PredicateSyntax> },
}

// Shorthands used by tests and by callers building definitions in code.
impl TypeSyntax {
    pub fn named(name: impl Into<String>) -> Self { TypeSyntax::TypeRef { name: name.into() } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_kind() {
        let src = json!({ "types": [
            { "name": "Person", "type": { "kind": "type_schema",
                "properties": [
                    { "key": "name", "type": { "kind": "type_ref", "name": "String" } },
                    { "key": "age", "type": { "kind": "type_ref", "name": "Int" }, "optional": true }
                ],
                "extras": "ignored" } },
            { "name": "Scores", "type": { "kind": "type_schema", "extras": { "kind": "type_ref", "name": "Int" } } },
            { "name": "PosEven", "type": { "kind": "subtype_constraint",
                "base": { "kind": "type_ref", "name": "Int" },
                "constraints": [
                    { "label": "positive", "condition": { "op": "gt", "value": 0 } },
                    { "condition": { "op": "all", "of": [ { "op": "even" }, { "op": "not", "pred": { "op": "eq", "value": 4 } } ] } }
                ] } },
            { "name": "Ints", "type": { "kind": "array_type", "element": { "kind": "type_ref", "name": "Int" } } },
            { "name": "T", "type": { "kind": "union_type", "types": [ { "kind": "type_ref", "name": "Null" } ] } },
            { "name": "N", "type": { "kind": "nullable", "inner": { "kind": "type_ref", "name": "Int" } } },
            { "name": "Mode", "type": { "kind": "literal", "values": ["on", "off"] } }
        ]});
        let defs: Definitions = serde_json::from_value(src).unwrap();
        assert_eq!(defs.types.len(), 7);
        match &defs.types[0].ty {
            TypeSyntax::TypeSchema { properties, extras } => {
                assert!(properties[1].optional);
                assert!(matches!(extras, ExtrasSyntax::Mode(ExtrasMode::Ignored)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&defs.types[1].ty, TypeSyntax::TypeSchema { extras: ExtrasSyntax::Typed(_), .. }));
    }

    #[test]
    fn records_default_to_closed() {
        let t: TypeSyntax = serde_json::from_value(json!({ "kind": "type_schema", "properties": [] })).unwrap();
        assert!(matches!(t, TypeSyntax::TypeSchema { extras: ExtrasSyntax::Mode(ExtrasMode::Closed), .. }));
    }
}
