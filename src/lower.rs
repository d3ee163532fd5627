use std::sync::Arc;

use regex::Regex;

use crate::ast::{ConstraintSyntax, Definitions, ExtrasMode, ExtrasSyntax, PredicateSyntax, TypeSyntax};
use crate::error::DefinitionError;
use crate::ir::{CmpOp, Constraint, Extras, Field, Kind, Predicate, TypeExpr};
use crate::scope::{Scope, ScopeBuilder};
use crate::value::Value;

/// Lowers every definition into `builder` and freezes it.
pub fn build_scope(mut builder: ScopeBuilder, defs: &Definitions) -> Result<Arc<Scope>, DefinitionError> {
    for def in &defs.types {
        let ty = lower_type(&def.ty)?;
        builder.register(def.name.clone(), ty)?;
    }
    builder.build()
}

pub fn lower_type(syntax: &TypeSyntax) -> Result<TypeExpr, DefinitionError> {
    Ok(match syntax {
        TypeSyntax::TypeRef { name } => lower_name(name)?,

        TypeSyntax::TypeSchema { properties, extras } => {
            let fields = properties
                .iter()
                .map(|p| Ok(Field { name: p.key.clone(), ty: lower_type(&p.ty)?, required: !p.optional }))
                .collect::<Result<Vec<_>, DefinitionError>>()?;
            let extras = match extras {
                ExtrasSyntax::Mode(ExtrasMode::Closed) => Extras::Closed,
                ExtrasSyntax::Mode(ExtrasMode::Ignored) => Extras::Ignored,
                ExtrasSyntax::Typed(t) => Extras::Typed(Box::new(lower_type(t)?)),
            };
            TypeExpr::Record { fields, extras }
        }

        TypeSyntax::SubtypeConstraint { base, constraints } => TypeExpr::Refinement {
            base: Box::new(lower_type(base)?),
            constraints: constraints.iter().map(lower_constraint).collect::<Result<_, _>>()?,
        },

        TypeSyntax::ArrayType { element } => TypeExpr::Array(Box::new(lower_type(element)?)),

        TypeSyntax::UnionType { types } => {
            TypeExpr::Union(types.iter().map(lower_type).collect::<Result<_, _>>()?)
        }

        TypeSyntax::Nullable { inner } => TypeExpr::Nullable(Box::new(lower_type(inner)?)),

        TypeSyntax::Literal { values } => {
            TypeExpr::Literal(values.iter().map(Value::from).collect())
        }
    })
}

// Primitive names first; capitalized names are user types; anything else is a typo.
fn lower_name(name: &str) -> Result<TypeExpr, DefinitionError> {
    if let Some(kind) = Kind::from_name(name) {
        return Ok(TypeExpr::Primitive(kind));
    }
    match name.chars().next() {
        Some(c) if c.is_uppercase() => Ok(TypeExpr::Reference(name.to_string())),
        _ => Err(DefinitionError::UnknownType(name.to_string())),
    }
}

fn lower_constraint(c: &ConstraintSyntax) -> Result<Constraint, DefinitionError> {
    Ok(Constraint { label: c.label.clone(), predicate: lower_predicate(&c.condition)? })
}

fn lower_predicate(p: &PredicateSyntax) -> Result<Predicate, DefinitionError> {
    let cmp = |op: CmpOp, v: &serde_json::Value| Predicate::Compare(op, Value::from(v));
    Ok(match p {
        PredicateSyntax::Gt { value } => cmp(CmpOp::Gt, value),
        PredicateSyntax::Ge { value } => cmp(CmpOp::Ge, value),
        PredicateSyntax::Lt { value } => cmp(CmpOp::Lt, value),
        PredicateSyntax::Le { value } => cmp(CmpOp::Le, value),
        PredicateSyntax::Eq { value } => cmp(CmpOp::Eq, value),
        PredicateSyntax::Ne { value } => cmp(CmpOp::Ne, value),
        PredicateSyntax::Even => Predicate::Even,
        PredicateSyntax::Odd => Predicate::Odd,
        PredicateSyntax::MinLength { value } => Predicate::MinLength(*value),
        PredicateSyntax::MaxLength { value } => Predicate::MaxLength(*value),
        PredicateSyntax::Matches { pattern } => {
            let rx = Regex::new(pattern).map_err(|source| DefinitionError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            Predicate::Matches(rx)
        }
        PredicateSyntax::All { of } => Predicate::All(of.iter().map(lower_predicate).collect::<Result<_, _>>()?),
        PredicateSyntax::Any { of } => Predicate::AnyOf(of.iter().map(lower_predicate).collect::<Result<_, _>>()?),
        PredicateSyntax::Not { pred } => Predicate::Not(Box::new(lower_predicate(pred)?)),
    })
}
