//! Validation engine: walks a `TypeExpr` against an input `Value`.
//!
//! - Primitive leaves go through `coerce`.
//! - Composites recurse structurally and rebuild a fresh output value.
//! - The first failure aborts the whole walk; there are no partial results.
//! - The walk is pure. Concurrent calls over one frozen scope need no locks.
use crate::coerce;
use crate::error::{ErrorKind, Path, PathSegment, ValidationError};
use crate::ir::{Extras, Field, Kind, TypeExpr};
use crate::value::{Record, Value};

/// Where `Reference` names are looked up.
///
/// Returns the bound type together with the scope it was found in; the
/// referenced type keeps resolving its own references there (lexically),
/// not in the scope the walk started from.
pub trait Resolve {
    fn resolve(&self, name: &str) -> Option<(&TypeExpr, &dyn Resolve)>;
}

/// Resolves nothing; for self-contained trees.
pub struct NoReferences;

impl Resolve for NoReferences {
    fn resolve(&self, _name: &str) -> Option<(&TypeExpr, &dyn Resolve)> { None }
}

pub fn validate(ty: &TypeExpr, input: &Value) -> Result<Value, ValidationError> {
    validate_in(ty, input, &NoReferences)
}

pub fn validate_in(ty: &TypeExpr, input: &Value, scope: &dyn Resolve) -> Result<Value, ValidationError> {
    Walker { path: Vec::new() }.walk(ty, input, scope)
}

// ------------------------------- Walker ------------------------------------ //

struct Walker {
    path: Vec<PathSegment>,
}

impl Walker {
    fn fail(&self, kind: ErrorKind, message: impl Into<String>) -> ValidationError {
        ValidationError::new(kind, Path(self.path.clone()), message)
    }

    /// Runs `f` one segment deeper; the segment is popped on both outcomes.
    fn descend<T>(
        &mut self,
        seg: PathSegment,
        f: impl FnOnce(&mut Self) -> Result<T, ValidationError>,
    ) -> Result<T, ValidationError> {
        self.path.push(seg);
        let out = f(self);
        self.path.pop();
        out
    }

    fn walk(&mut self, ty: &TypeExpr, input: &Value, scope: &dyn Resolve) -> Result<Value, ValidationError> {
        match ty {
            TypeExpr::Primitive(kind) => coerce::coerce(*kind, input)
                .map_err(|failure| self.fail(failure.kind, failure.message)),

            TypeExpr::Literal(members) => self.walk_literal(members, input),

            TypeExpr::Nullable(inner) => match input {
                Value::Null => Ok(Value::Null),
                _ => self.walk(inner, input, scope),
            },

            TypeExpr::Union(branches) => self.walk_union(branches, input, scope),

            TypeExpr::Array(element) => {
                let Value::List(items) = input else {
                    return Err(self.fail(
                        ErrorKind::TypeMismatch,
                        format!("expected List, got {}", input.describe()),
                    ));
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.descend(PathSegment::Index(i), |w| w.walk(element, item, scope))?);
                }
                Ok(Value::List(out))
            }

            TypeExpr::Record { fields, extras } => self.walk_record(fields, extras, input, scope),

            TypeExpr::Refinement { base, constraints } => {
                // predicates see the coerced value, never the raw input
                let value = self.walk(base, input, scope)?;
                for constraint in constraints {
                    if !constraint.predicate.eval(&value) {
                        return Err(self.fail(ErrorKind::RefinementViolation, constraint.failure_message()));
                    }
                }
                Ok(value)
            }

            TypeExpr::Reference(name) => match scope.resolve(name) {
                Some((target, home)) => self.walk(target, input, home),
                None => Err(self.fail(
                    ErrorKind::UnresolvedReference,
                    format!("unresolved type reference '{name}'"),
                )),
            },
        }
    }

    fn walk_literal(&mut self, members: &[Value], input: &Value) -> Result<Value, ValidationError> {
        for member in members {
            let candidate = match Kind::of(member) {
                Kind::Any => Ok(input.clone()),
                kind => coerce::coerce(kind, input),
            };
            if let Ok(value) = candidate {
                if value == *member {
                    return Ok(value);
                }
            }
        }
        let allowed = serde_json::Value::Array(members.iter().map(Value::to_json).collect());
        Err(self.fail(
            ErrorKind::LiteralMismatch,
            format!("expected one of {allowed}, got {}", input.describe()),
        ))
    }

    fn walk_union(&mut self, branches: &[TypeExpr], input: &Value, scope: &dyn Resolve) -> Result<Value, ValidationError> {
        let mut first_failure: Option<ValidationError> = None;
        for branch in branches {
            match self.walk(branch, input, scope) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                }
            }
        }
        Err(match first_failure {
            Some(first) => self
                .fail(
                    ErrorKind::NoUnionBranchMatched,
                    format!("no union branch matched: {}", first.message),
                )
                .with_cause(first),
            None => self.fail(ErrorKind::NoUnionBranchMatched, "union has no branches"),
        })
    }

    fn walk_record(
        &mut self,
        fields: &[Field],
        extras: &Extras,
        input: &Value,
        scope: &dyn Resolve,
    ) -> Result<Value, ValidationError> {
        let Value::Record(map) = input else {
            return Err(self.fail(
                ErrorKind::TypeMismatch,
                format!("expected Record, got {}", input.describe()),
            ));
        };

        let mut out = Record::with_capacity(fields.len());

        // declared fields, in declaration order
        for field in fields {
            match map.get(&field.name) {
                Some(raw) => {
                    let value = self.descend(PathSegment::Field(field.name.clone()), |w| {
                        w.walk(&field.ty, raw, scope)
                    })?;
                    out.insert(field.name.clone(), value);
                }
                None if field.required => {
                    return Err(self.fail(
                        ErrorKind::MissingRequiredField,
                        format!("missing required field '{}'", field.name),
                    ));
                }
                None => {} // optional and absent: no default materialized
            }
        }

        // undeclared keys, in input order
        let mut undeclared = map
            .iter()
            .filter(|(key, _)| !fields.iter().any(|f| f.name == **key));
        match extras {
            Extras::Ignored => {}
            Extras::Closed => {
                if let Some((key, _)) = undeclared.next() {
                    return Err(self.fail(ErrorKind::UnknownField, format!("unknown field '{key}'")));
                }
            }
            Extras::Typed(extra_ty) => {
                for (key, raw) in undeclared {
                    let value = self.descend(PathSegment::Field(key.clone()), |w| {
                        w.walk(extra_ty, raw, scope)
                    })?;
                    out.insert(key.clone(), value);
                }
            }
        }

        Ok(Value::Record(out))
    }
}

// ------------------------------- Tests ------------------------------------ //
