//! Fixture files: definition units plus the calls made against them.
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use json_coerce::ast::Definitions;
use json_coerce::{ErrorKind, Registry};

#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub units: Vec<Unit>,
}

#[derive(Debug, Deserialize)]
pub struct Unit {
    pub name: String,
    #[serde(flatten)]
    pub definitions: Definitions,
    /// The unit must fail to load with a message containing this text.
    #[serde(default)]
    pub rejects: Option<String>,
    #[serde(default)]
    pub cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
pub struct Case {
    pub call: String,
    pub input: serde_json::Value,
    #[serde(flatten)]
    pub expectation: Expectation,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Expectation {
    Equal { expect: serde_json::Value },
    Fails { fails: FailSpec },
}

/// `true` accepts any failure, a kind name pins it, `false` demands success.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FailSpec {
    Any(bool),
    Kind(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail(String),
}

/// One reported line: `unit/call #index`.
#[derive(Debug)]
pub struct CaseReport {
    pub label: String,
    pub outcome: Outcome,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::parse(&bytes).with_context(|| format!("invalid fixture {}", path.display()))
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(json_coerce::path_de::from_slice_with_path(bytes)?)
    }

    /// Loads every unit into a fresh registry and replays its cases.
    /// `keep` sees each case label and decides whether it runs.
    pub fn run(&self, keep: impl Fn(&str) -> bool) -> Vec<CaseReport> {
        let registry = Registry::new();
        let mut reports = Vec::new();
        for unit in &self.units {
            let loaded = registry.load(&unit.name, &unit.definitions);
            if let Some(expected) = unit.rejects.as_deref() {
                let label = format!("{}/<load>", unit.name);
                if keep(&label) {
                    let outcome = match loaded {
                        Err(err) if err.to_string().contains(expected) => Outcome::Pass,
                        Err(err) => Outcome::Fail(format!("rejected with `{err}`, wanted `{expected}`")),
                        Ok(_) => Outcome::Fail(format!("loaded, wanted rejection `{expected}`")),
                    };
                    reports.push(CaseReport { label, outcome });
                }
                continue;
            }
            for (ix, case) in unit.cases.iter().enumerate() {
                let label = format!("{}/{} #{ix}", unit.name, case.call);
                if !keep(&label) {
                    continue;
                }
                let outcome = match &loaded {
                    Err(err) => Outcome::Fail(format!("unit failed to load: {err}")),
                    Ok(_) => case.run(&registry, &unit.name),
                };
                reports.push(CaseReport { label, outcome });
            }
        }
        reports
    }
}

impl Case {
    fn run(&self, registry: &Registry, unit: &str) -> Outcome {
        let validator = match registry.validator(unit, &self.call) {
            Ok(v) => v,
            Err(err) => return Outcome::Fail(format!("cannot compile: {err}")),
        };
        let result = validator.validate_json(&self.input);
        match (&self.expectation, result) {
            (Expectation::Equal { expect }, Ok(got)) if got == *expect => Outcome::Pass,
            (Expectation::Equal { expect }, Ok(got)) => {
                Outcome::Fail(format!("expected {expect}, got {got}"))
            }
            (Expectation::Equal { expect }, Err(err)) => {
                Outcome::Fail(format!("expected {expect}, failed with {}: {err}", err.kind))
            }
            (Expectation::Fails { fails: FailSpec::Any(true) }, Err(_)) => Outcome::Pass,
            (Expectation::Fails { fails: FailSpec::Any(false) }, Ok(_)) => Outcome::Pass,
            (Expectation::Fails { fails: FailSpec::Any(false) }, Err(err)) => {
                Outcome::Fail(format!("expected success, failed with {}: {err}", err.kind))
            }
            (Expectation::Fails { fails: FailSpec::Kind(name) }, Err(err)) => {
                match ErrorKind::parse(name) {
                    Some(kind) if kind == err.kind => Outcome::Pass,
                    Some(kind) => Outcome::Fail(format!("expected {kind}, failed with {}: {err}", err.kind)),
                    None => Outcome::Fail(format!("unknown error kind `{name}`")),
                }
            }
            (Expectation::Fails { .. }, Ok(got)) => {
                Outcome::Fail(format!("expected failure, got {got}"))
            }
        }
    }
}
