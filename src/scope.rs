//! Name binding, reference resolution and compiled validators.
//!
//! A `ScopeBuilder` collects bindings (append-only), `build` checks them and
//! freezes the result into an `Arc<Scope>`. After that nothing mutates: any
//! number of threads may validate through the same scope without locking.
//!
//! Scopes nest. A nested scope may shadow a name from its parent, and each
//! type resolves its references in the scope that defined it, so two units
//! can reuse a display name without seeing each other's definition.
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::engine::{self, Resolve};
use crate::error::{DefinitionError, ValidationError};
use crate::ir::{Extras, TypeExpr};
use crate::value::Value;

// ------------------------------- Builder ----------------------------------- //

pub struct ScopeBuilder {
    name: String,
    parent: Option<Arc<Scope>>,
    bindings: IndexMap<String, TypeExpr>,
}

impl ScopeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), parent: None, bindings: IndexMap::new() }
    }

    pub fn nested(parent: Arc<Scope>, name: impl Into<String>) -> Self {
        Self { name: name.into(), parent: Some(parent), bindings: IndexMap::new() }
    }

    pub fn name(&self) -> &str { &self.name }

    /// Binds `name`. Rebinding within the same scope is rejected; shadowing
    /// a parent's binding is fine.
    pub fn register(&mut self, name: impl Into<String>, ty: TypeExpr) -> Result<(), DefinitionError> {
        let name = name.into();
        if self.bindings.contains_key(&name) {
            return Err(DefinitionError::DuplicateDefinition { scope: self.name.clone(), name });
        }
        self.bindings.insert(name, ty);
        Ok(())
    }

    /// Chaining form of `register`.
    pub fn define(mut self, name: impl Into<String>, ty: TypeExpr) -> Result<Self, DefinitionError> {
        self.register(name, ty)?;
        Ok(self)
    }

    /// Checks every binding and freezes the scope:
    /// - record field names are unique;
    /// - every reference resolves here or in an ancestor;
    /// - no reference cycle avoids structural descent (see `find_unguarded_cycle`).
    pub fn build(self) -> Result<Arc<Scope>, DefinitionError> {
        for (name, ty) in &self.bindings {
            check_unique_fields(name, ty)?;

            let mut refs = Vec::new();
            ty.for_each_reference(&mut |r| refs.push(r));
            for r in refs {
                let known = self.bindings.contains_key(r)
                    || self.parent.as_ref().is_some_and(|p| p.lookup(r).is_some());
                if !known {
                    return Err(DefinitionError::UnresolvedReference {
                        scope: self.name.clone(),
                        from: name.clone(),
                        name: r.to_string(),
                    });
                }
            }
        }

        if let Some(cycle) = find_unguarded_cycle(&self.bindings) {
            return Err(DefinitionError::UnguardedRecursion { cycle });
        }

        tracing::debug!(scope = %self.name, types = self.bindings.len(), "scope frozen");
        Ok(Arc::new(Scope { name: self.name, parent: self.parent, bindings: self.bindings }))
    }
}

fn check_unique_fields(type_name: &str, ty: &TypeExpr) -> Result<(), DefinitionError> {
    match ty {
        TypeExpr::Primitive(_) | TypeExpr::Literal(_) | TypeExpr::Reference(_) => Ok(()),
        TypeExpr::Nullable(inner) | TypeExpr::Array(inner) => check_unique_fields(type_name, inner),
        TypeExpr::Refinement { base, .. } => check_unique_fields(type_name, base),
        TypeExpr::Union(branches) => {
            branches.iter().try_for_each(|b| check_unique_fields(type_name, b))
        }
        TypeExpr::Record { fields, extras } => {
            for (i, field) in fields.iter().enumerate() {
                if fields[..i].iter().any(|f| f.name == field.name) {
                    return Err(DefinitionError::DuplicateField {
                        ty: type_name.to_string(),
                        field: field.name.clone(),
                    });
                }
                check_unique_fields(type_name, &field.ty)?;
            }
            match extras {
                Extras::Typed(t) => check_unique_fields(type_name, t),
                Extras::Closed | Extras::Ignored => Ok(()),
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark { Active, Done }

/// A cycle is harmless only if it passes through an array element or a
/// record member: each trip around it then consumes one level of input.
/// Cycles through `Nullable`/`Union`/`Refinement` alone would re-validate the
/// same value forever. References into a parent scope can't close a cycle
/// (the parent was checked when it was built and never sees this scope).
fn find_unguarded_cycle(bindings: &IndexMap<String, TypeExpr>) -> Option<Vec<String>> {
    let edges: IndexMap<&str, Vec<&str>> = bindings
        .iter()
        .map(|(name, ty)| {
            let mut out = Vec::new();
            ty.for_each_unguarded_reference(&mut |r| {
                if bindings.contains_key(r) { out.push(r) }
            });
            (name.as_str(), out)
        })
        .collect();

    fn visit<'a>(
        node: &'a str,
        edges: &IndexMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        match marks.get(node) {
            Some(Mark::Done) => return None,
            Some(Mark::Active) => {
                let start = stack.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(node.to_string());
                return Some(cycle);
            }
            None => {}
        }
        marks.insert(node, Mark::Active);
        stack.push(node);
        for next in edges.get(node).into_iter().flatten() {
            if let Some(cycle) = visit(next, edges, marks, stack) {
                return Some(cycle);
            }
        }
        stack.pop();
        marks.insert(node, Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    edges.keys().find_map(|&name| visit(name, &edges, &mut marks, &mut stack))
}

// -------------------------------- Scope ------------------------------------ //

/// Frozen set of bindings.
#[derive(Debug)]
pub struct Scope {
    name: String,
    parent: Option<Arc<Scope>>,
    bindings: IndexMap<String, TypeExpr>,
}

impl Scope {
    pub fn name(&self) -> &str { &self.name }

    pub fn parent(&self) -> Option<&Arc<Scope>> { self.parent.as_ref() }

    /// Type bound to `name` here or in the nearest ancestor that binds it.
    pub fn lookup(&self, name: &str) -> Option<&TypeExpr> {
        self.resolve(name).map(|(ty, _)| ty)
    }

    /// Names bound directly in this scope, in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn compile(self: &Arc<Self>, name: &str) -> Result<Validator, DefinitionError> {
        if self.lookup(name).is_none() {
            return Err(DefinitionError::NotDefined { scope: self.name.clone(), name: name.to_string() });
        }
        Ok(Validator {
            scope: Arc::clone(self),
            name: name.to_string(),
            entry: TypeExpr::Reference(name.to_string()),
        })
    }
}

impl Resolve for Scope {
    fn resolve(&self, name: &str) -> Option<(&TypeExpr, &dyn Resolve)> {
        match self.bindings.get(name) {
            Some(ty) => Some((ty, self)),
            None => self.parent.as_deref()?.resolve(name),
        }
    }
}

// ------------------------------ Validator ---------------------------------- //

/// A named type bound to the scope it was compiled from. Cheap to clone,
/// safe to share across threads.
#[derive(Debug, Clone)]
pub struct Validator {
    scope: Arc<Scope>,
    name: String,
    entry: TypeExpr, // Reference(name), so lookup goes through the scope chain
}

impl Validator {
    pub fn name(&self) -> &str { &self.name }

    pub fn scope(&self) -> &Arc<Scope> { &self.scope }

    pub fn validate(&self, input: &Value) -> Result<Value, ValidationError> {
        let result = engine::validate_in(&self.entry, input, self.scope.as_ref());
        if let Err(err) = &result {
            tracing::trace!(ty = %self.name, kind = %err.kind, error = %err, "validation failed");
        }
        result
    }

    /// JSON in, JSON out. Temporal values come back as ISO strings.
    pub fn validate_json(&self, input: &serde_json::Value) -> Result<serde_json::Value, ValidationError> {
        self.validate(&Value::from(input)).map(|v| v.to_json())
    }
}

// ------------------------------- Tests ------------------------------------ //
