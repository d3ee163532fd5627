//! Definition units: one frozen scope per loaded definition set.
//!
//! Loading takes the write lock only to publish an already built scope;
//! lookups take the read lock just long enough to clone an `Arc`, and the
//! validation itself runs lock-free on that `Arc`.
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

use crate::ast::Definitions;
use crate::error::DefinitionError;
use crate::lower;
use crate::path_de;
use crate::scope::{Scope, ScopeBuilder, Validator};

#[derive(Default)]
pub struct Registry {
    prelude: Option<Arc<Scope>>,
    units: RwLock<IndexMap<String, Arc<Scope>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Every unit nests under `prelude`, so shared types are visible to all
    /// of them and any unit may shadow one locally.
    pub fn with_prelude(prelude: Arc<Scope>) -> Self {
        Self { prelude: Some(prelude), units: RwLock::default() }
    }

    pub fn load(&self, unit: &str, defs: &Definitions) -> Result<Arc<Scope>, DefinitionError> {
        if self.unit(unit).is_some() {
            return Err(DefinitionError::DuplicateUnit(unit.to_string()));
        }
        let builder = match &self.prelude {
            Some(prelude) => ScopeBuilder::nested(Arc::clone(prelude), unit),
            None => ScopeBuilder::new(unit),
        };
        let scope = lower::build_scope(builder, defs)?;

        let mut units = self.units.write().unwrap_or_else(PoisonError::into_inner);
        // another writer may have won the race since the check above
        if units.contains_key(unit) {
            return Err(DefinitionError::DuplicateUnit(unit.to_string()));
        }
        units.insert(unit.to_string(), Arc::clone(&scope));
        tracing::debug!(unit, types = defs.types.len(), "loaded definition unit");
        Ok(scope)
    }

    pub fn load_json(&self, unit: &str, src: &str) -> Result<Arc<Scope>, DefinitionError> {
        let defs: Definitions = path_de::from_str_with_path(src)?;
        self.load(unit, &defs)
    }

    pub fn unit(&self, name: &str) -> Option<Arc<Scope>> {
        self.units.read().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }

    pub fn units(&self) -> Vec<String> {
        self.units.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }

    pub fn validator(&self, unit: &str, ty: &str) -> Result<Validator, DefinitionError> {
        let scope = self
            .unit(unit)
            .ok_or_else(|| DefinitionError::UnknownUnit { unit: unit.to_string() })?;
        scope.compile(ty)
    }
}
