// Compiled type expressions. No serde here: the declarative input lives in
// `ast` and is lowered into these trees.
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::value::Value;

#[derive(Debug, Clone)]
pub enum TypeExpr {
    Primitive(Kind),
    Literal(Vec<Value>),        // allowed values, tried in order
    Nullable(Box<TypeExpr>),
    Union(Vec<TypeExpr>),       // first match wins; order is semantic
    Array(Box<TypeExpr>),
    Record {
        fields: Vec<Field>,     // declaration order = output order
        extras: Extras,
    },
    Refinement {
        base: Box<TypeExpr>,
        constraints: Vec<Constraint>,
    },
    Reference(String),          // resolved lexically at validation time
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Any,
    DateTime,
    Date,
    Duration,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeExpr,
    pub required: bool,
}

/// What happens to input keys a record does not declare.
#[derive(Debug, Clone, Default)]
pub enum Extras {
    /// Reject them.
    #[default]
    Closed,
    /// Drop them from the output.
    Ignored,
    /// Keep them, each validated against this type.
    Typed(Box<TypeExpr>),
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub label: Option<String>,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp { Gt, Ge, Lt, Le, Eq, Ne }

/// Checks applied to an already coerced value.
#[derive(Clone)]
pub enum Predicate {
    Compare(CmpOp, Value),
    Even,
    Odd,
    MinLength(usize),
    MaxLength(usize),
    Matches(Regex),
    All(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
    Not(Box<Predicate>),
    Custom(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

// ------------------------------ Constructors ------------------------------- //

impl TypeExpr {
    pub fn null() -> Self { TypeExpr::Primitive(Kind::Null) }
    pub fn bool() -> Self { TypeExpr::Primitive(Kind::Bool) }
    pub fn int() -> Self { TypeExpr::Primitive(Kind::Int) }
    pub fn float() -> Self { TypeExpr::Primitive(Kind::Float) }
    pub fn string() -> Self { TypeExpr::Primitive(Kind::String) }
    pub fn any() -> Self { TypeExpr::Primitive(Kind::Any) }
    pub fn datetime() -> Self { TypeExpr::Primitive(Kind::DateTime) }

    pub fn nullable(inner: TypeExpr) -> Self { TypeExpr::Nullable(Box::new(inner)) }
    pub fn array(element: TypeExpr) -> Self { TypeExpr::Array(Box::new(element)) }
    pub fn union(branches: impl IntoIterator<Item = TypeExpr>) -> Self {
        TypeExpr::Union(branches.into_iter().collect())
    }
    pub fn reference(name: impl Into<String>) -> Self { TypeExpr::Reference(name.into()) }

    /// Closed record.
    pub fn record(fields: impl IntoIterator<Item = Field>) -> Self {
        TypeExpr::Record { fields: fields.into_iter().collect(), extras: Extras::Closed }
    }

    /// Record that silently drops undeclared keys.
    pub fn open_record(fields: impl IntoIterator<Item = Field>) -> Self {
        TypeExpr::Record { fields: fields.into_iter().collect(), extras: Extras::Ignored }
    }

    pub fn record_with_extras(fields: impl IntoIterator<Item = Field>, extras: TypeExpr) -> Self {
        TypeExpr::Record {
            fields: fields.into_iter().collect(),
            extras: Extras::Typed(Box::new(extras)),
        }
    }

    pub fn refine(base: TypeExpr, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        TypeExpr::Refinement { base: Box::new(base), constraints: constraints.into_iter().collect() }
    }

    /// Visits every `Reference` name in the tree.
    pub fn for_each_reference<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            TypeExpr::Primitive(_) | TypeExpr::Literal(_) => {}
            TypeExpr::Reference(name) => f(name.as_str()),
            TypeExpr::Nullable(inner) | TypeExpr::Array(inner) => inner.for_each_reference(f),
            TypeExpr::Union(branches) => {
                for b in branches { b.for_each_reference(f); }
            }
            TypeExpr::Record { fields, extras } => {
                for field in fields { field.ty.for_each_reference(f); }
                if let Extras::Typed(t) = extras { t.for_each_reference(f); }
            }
            TypeExpr::Refinement { base, .. } => base.for_each_reference(f),
        }
    }

    /// References reachable without descending into an array element or a
    /// record member. A cycle made only of these would revisit the same input.
    pub fn for_each_unguarded_reference<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            TypeExpr::Reference(name) => f(name.as_str()),
            TypeExpr::Nullable(inner) => inner.for_each_unguarded_reference(f),
            TypeExpr::Union(branches) => {
                for b in branches { b.for_each_unguarded_reference(f); }
            }
            TypeExpr::Refinement { base, .. } => base.for_each_unguarded_reference(f),
            TypeExpr::Primitive(_)
            | TypeExpr::Literal(_)
            | TypeExpr::Array(_)
            | TypeExpr::Record { .. } => {}
        }
    }
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Null => "Null",
            Kind::Bool => "Bool",
            Kind::Int => "Int",
            Kind::Float => "Float",
            Kind::String => "String",
            Kind::Any => "Any",
            Kind::DateTime => "Datetime",
            Kind::Date => "Date",
            Kind::Duration => "Duration",
        }
    }

    /// Names the definition language reserves for primitives.
    pub fn from_name(name: &str) -> Option<Kind> {
        Some(match name {
            "Any" => Kind::Any,
            "Null" => Kind::Null,
            "String" => Kind::String,
            "Int" => Kind::Int,
            "Float" => Kind::Float,
            "Bool" | "Boolean" => Kind::Bool,
            "Datetime" | "DateTime" => Kind::DateTime,
            "Date" => Kind::Date,
            "Duration" => Kind::Duration,
            _ => return None,
        })
    }

    /// Kind a literal member coerces toward.
    pub fn of(value: &Value) -> Kind {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::DateTime(_) => Kind::DateTime,
            Value::Date(_) => Kind::Date,
            Value::Duration(_) => Kind::Duration,
            Value::List(_) | Value::Record(_) => Kind::Any,
        }
    }
}

impl Field {
    pub fn required(name: impl Into<String>, ty: TypeExpr) -> Self {
        Field { name: name.into(), ty, required: true }
    }

    pub fn optional(name: impl Into<String>, ty: TypeExpr) -> Self {
        Field { name: name.into(), ty, required: false }
    }
}

impl Constraint {
    pub fn new(label: impl Into<String>, predicate: Predicate) -> Self {
        Constraint { label: Some(label.into()), predicate }
    }

    pub fn unlabelled(predicate: Predicate) -> Self {
        Constraint { label: None, predicate }
    }

    /// One-word labels name the constraint; longer ones are the whole message.
    pub fn failure_message(&self) -> String {
        match &self.label {
            Some(label) if label.contains(' ') => label.clone(),
            Some(label) => format!("constraint '{label}' failed"),
            None => "constraint failed".to_string(),
        }
    }
}

// ------------------------------- Predicates -------------------------------- //

impl Predicate {
    pub fn gt(v: impl Into<Value>) -> Self { Predicate::Compare(CmpOp::Gt, v.into()) }
    pub fn ge(v: impl Into<Value>) -> Self { Predicate::Compare(CmpOp::Ge, v.into()) }
    pub fn lt(v: impl Into<Value>) -> Self { Predicate::Compare(CmpOp::Lt, v.into()) }
    pub fn le(v: impl Into<Value>) -> Self { Predicate::Compare(CmpOp::Le, v.into()) }

    pub fn custom(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Predicate::Custom(Arc::new(f))
    }

    pub fn eval(&self, v: &Value) -> bool {
        match self {
            Predicate::Compare(op, rhs) => compare(v, rhs).is_some_and(|ord| op.holds(ord)),
            Predicate::Even => v.as_i64().is_some_and(|i| i % 2 == 0),
            Predicate::Odd => v.as_i64().is_some_and(|i| i % 2 != 0),
            Predicate::MinLength(n) => length_of(v).is_some_and(|len| len >= *n),
            Predicate::MaxLength(n) => length_of(v).is_some_and(|len| len <= *n),
            Predicate::Matches(rx) => v.as_str().is_some_and(|s| rx.is_match(s)),
            Predicate::All(ps) => ps.iter().all(|p| p.eval(v)),
            Predicate::AnyOf(ps) => ps.iter().any(|p| p.eval(v)),
            Predicate::Not(p) => !p.eval(v),
            Predicate::Custom(f) => f(v),
        }
    }
}

impl CmpOp {
    fn holds(&self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CmpOp::Gt => ord == Greater,
            CmpOp::Ge => ord != Less,
            CmpOp::Lt => ord == Less,
            CmpOp::Le => ord != Greater,
            CmpOp::Eq => ord == Equal,
            CmpOp::Ne => ord != Equal,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

/// Ordering between comparable kinds; `None` when the kinds don't compare.
fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(std::cmp::Ordering::Equal),
        _ => None,
    }
}

fn length_of(v: &Value) -> Option<usize> {
    match v {
        Value::String(s) => Some(s.chars().count()),
        Value::List(xs) => Some(xs.len()),
        Value::Record(m) => Some(m.len()),
        _ => None,
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare(op, v) => write!(f, "_ {} {v}", op.symbol()),
            Predicate::Even => f.write_str("even"),
            Predicate::Odd => f.write_str("odd"),
            Predicate::MinLength(n) => write!(f, "min_length({n})"),
            Predicate::MaxLength(n) => write!(f, "max_length({n})"),
            Predicate::Matches(rx) => write!(f, "matches({:?})", rx.as_str()),
            Predicate::All(ps) => f.debug_tuple("all").field(ps).finish(),
            Predicate::AnyOf(ps) => f.debug_tuple("any").field(ps).finish(),
            Predicate::Not(p) => f.debug_tuple("not").field(p).finish(),
            Predicate::Custom(_) => f.write_str("<custom>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons_mix_int_and_float() {
        assert!(Predicate::gt(0).eval(&Value::Int(42)));
        assert!(!Predicate::gt(0).eval(&Value::Int(-5)));
        assert!(Predicate::ge(0.5).eval(&Value::Int(1)));
        assert!(Predicate::lt(10).eval(&Value::Float(9.99)));
    }

    #[test]
    fn incomparable_kinds_never_hold() {
        assert!(!Predicate::gt(0).eval(&Value::from("42")));
        assert!(!Predicate::Compare(CmpOp::Ne, Value::Int(1)).eval(&Value::Null));
    }

    #[test]
    fn parity_is_for_integers_only() {
        assert!(Predicate::Even.eval(&Value::Int(42)));
        assert!(Predicate::Odd.eval(&Value::Int(-3)));
        assert!(!Predicate::Even.eval(&Value::Float(2.0)));
    }

    #[test]
    fn lengths_and_patterns() {
        let rx = Regex::new("^[a-z]+$").unwrap();
        assert!(Predicate::Matches(rx).eval(&Value::from("abc")));
        assert!(Predicate::MinLength(2).eval(&Value::List(vec![Value::Null, Value::Null])));
        assert!(!Predicate::MaxLength(2).eval(&Value::from("héllo")));
    }

    #[test]
    fn failure_messages_follow_label_shape() {
        assert_eq!(Constraint::new("positive", Predicate::gt(0)).failure_message(), "constraint 'positive' failed");
        assert_eq!(Constraint::new("must be positive", Predicate::gt(0)).failure_message(), "must be positive");
        assert_eq!(Constraint::unlabelled(Predicate::Even).failure_message(), "constraint failed");
    }

    #[test]
    fn unguarded_references_stop_at_structure() {
        let t = TypeExpr::union([
            TypeExpr::reference("A"),
            TypeExpr::array(TypeExpr::reference("B")),
            TypeExpr::nullable(TypeExpr::reference("C")),
        ]);
        let mut seen = Vec::new();
        t.for_each_unguarded_reference(&mut |n| seen.push(n));
        assert_eq!(seen, ["A", "C"]);
        let mut all = Vec::new();
        t.for_each_reference(&mut |n| all.push(n));
        assert_eq!(all, ["A", "B", "C"]);
    }
}
