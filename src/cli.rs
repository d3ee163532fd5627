//! CLI: check documents against a named definition, or list definitions.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use json_coerce::jq_exec::apply_filter;
use json_coerce::{Registry, Scope, ValidationError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// coerce and validate JSON/NDJSON documents against declarative type definitions
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// more logging (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate every input document against one named type
    Check(CheckOut),
    /// list the types a definitions file declares
    Types(TypesOut),
}

#[derive(Args, Debug, Clone)]
struct DefinitionSettings {
    /// definitions file (JSON definition AST)
    #[arg(long)]
    defs: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    definitions: DefinitionSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// name of the type to validate against
    #[arg(long = "type")]
    type_name: String,

    /// write canonical documents here (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct TypesOut {
    #[command(flatten)]
    definitions: DefinitionSettings,
}

/// One document pulled out of an input file, labelled for reporting.
#[derive(Debug)]
struct Document {
    label: String,
    value: serde_json::Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl DefinitionSettings {
    /// Loads the file as its own unit, named after the file stem.
    fn load(&self) -> Result<Arc<Scope>> {
        let unit = self
            .defs
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "defs".to_string());
        let source = std::fs::read_to_string(&self.defs)
            .with_context(|| format!("failed to read definitions file {}", self.defs.display()))?;
        Registry::new()
            .load_json(&unit, &source)
            .with_context(|| format!("invalid definitions in {}", self.defs.display()))
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut docs = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", line_no + 1);
                    let value = serde_json::from_str::<serde_json::Value>(line)
                        .with_context(|| format!("failed to parse NDJSON line ({label})"))?;
                    self.select(label, value, &mut docs)?;
                }
            } else {
                let value = serde_json::from_str::<serde_json::Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                self.select(source_path_str, value, &mut docs)?;
            }
        }
        tracing::debug!(documents = docs.len(), "loaded input documents");
        Ok(docs)
    }

    /// Pointer first, then the jq filter; a filter may fan out.
    fn select(&self, label: String, value: serde_json::Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in {label}"))?,
        };
        match self.jq_expr.as_deref() {
            None => out.push(Document { label, value }),
            Some(jq_expr) => {
                let results = apply_filter(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?;
                let fan_out = results.len() > 1;
                for (ix, value) in results.into_iter().enumerate() {
                    let label = if fan_out { format!("{label}#{ix}") } else { label.clone() };
                    out.push(Document { label, value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(false)` when at least one document failed validation.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Types(target) => {
                let scope = target.definitions.load()?;
                for name in scope.names() {
                    println!("{name}");
                }
                Ok(true)
            }
        }
    }
}

impl CheckOut {
    fn run(&self) -> Result<bool> {
        let scope = self.definitions.load()?;
        let validator = scope
            .compile(&self.type_name)
            .with_context(|| format!("cannot check against '{}'", self.type_name))?;
        let docs = self.input_settings.load_documents()?;

        let results: Vec<Result<serde_json::Value, ValidationError>> = docs
            .par_iter()
            .map(|doc| validator.validate_json(&doc.value))
            .collect();

        let mut rendered = Vec::new();
        let mut failures = 0usize;
        for (doc, result) in docs.iter().zip(results) {
            match result {
                Ok(value) => rendered.push(render(&value, self.input_settings.ndjson)?),
                Err(error) => {
                    failures += 1;
                    report_failure(&doc.label, &error);
                }
            }
        }

        let output = rendered.join("\n");
        match self.out.as_ref() {
            Some(out) => write_output(out, &output)?,
            None if !output.is_empty() => println!("{output}"),
            None => {}
        }

        let total = docs.len();
        let summary = format!("{} of {total} documents valid", total - failures);
        if failures == 0 {
            eprintln!("{} {summary}", "✓".green());
        } else {
            eprintln!("{} {summary}", "✗".red());
        }
        Ok(failures == 0)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn render(value: &serde_json::Value, compact: bool) -> Result<String> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(text)
}

fn report_failure(label: &str, error: &ValidationError) {
    eprintln!("{} {} {}", "✗".red(), label.bold(), error);
    let mut cause = error.cause.as_deref();
    while let Some(inner) = cause {
        eprintln!("    {} {}", "caused by:".dimmed(), inner);
        cause = inner.cause.as_deref();
    }
}

fn write_output(out: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
    }

    #[test]
    fn empty_glob_is_an_error() {
        let err = resolve_file_path_patterns(["/nonexistent-dir-for-test/*.json"]).unwrap_err();
        assert!(err.to_string().contains("matched no files"));
    }

    #[test]
    fn pointer_and_filter_select_documents() {
        let settings = InputSettings {
            ndjson: false,
            json_pointer: Some("/data".into()),
            jq_expr: Some(".items[]".into()),
            input: vec![],
        };
        let mut docs = Vec::new();
        let doc = serde_json::json!({"data": {"items": [1, 2]}});
        settings.select("f.json".into(), doc, &mut docs).unwrap();
        let labels: Vec<_> = docs.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["f.json#0", "f.json#1"]);
        assert_eq!(docs[1].value, serde_json::json!(2));
    }

    const PERSON_DEFS: &str = r#"{ "types": [ { "name": "Person", "type": { "kind": "type_schema",
        "properties": [
            { "key": "name", "type": { "kind": "type_ref", "name": "String" } },
            { "key": "age", "type": { "kind": "type_ref", "name": "Int" } }
        ] } } ] }"#;

    /// Writes the definitions and an NDJSON input, returns (dir, defs, input).
    fn workspace(ndjson: &str) -> (tempfile::TempDir, String, String) {
        let dir = tempfile::tempdir().unwrap();
        let defs = dir.path().join("people.json");
        let input = dir.path().join("people.ndjson");
        std::fs::write(&defs, PERSON_DEFS).unwrap();
        std::fs::write(&input, ndjson).unwrap();
        let path = |p: PathBuf| p.to_string_lossy().to_string();
        (dir, path(defs), path(input))
    }

    fn check(defs: &str, ty: &str, input: &str, out: &Path) -> Result<bool> {
        let out = out.to_string_lossy().to_string();
        CommandLineInterface::try_parse_from([
            "json-coerce", "check", "--defs", defs, "--type", ty, "--ndjson", "--out", out.as_str(), "-i", input,
        ])
        .unwrap()
        .run()
    }

    #[test]
    fn check_writes_canonical_documents_and_reports_failures() {
        let (dir, defs, input) = workspace(concat!(
            "{\"name\": \"A\", \"age\": \"3\"}\n",
            "\n",
            "{\"name\": \"B\", \"age\": \"old\"}\n",
            "{\"name\": \"C\"}\n",
        ));
        let out = dir.path().join("out/valid.ndjson");

        assert!(!check(&defs, "Person", &input, &out).unwrap());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), r#"{"name":"A","age":3}"#);
    }

    #[test]
    fn check_passes_when_every_document_is_valid() {
        let (dir, defs, input) = workspace("{\"name\": \"A\", \"age\": 1}\n{\"age\": \"2\", \"name\": \"B\"}\n");
        let out = dir.path().join("valid.ndjson");

        assert!(check(&defs, "Person", &input, &out).unwrap());
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "{\"name\":\"A\",\"age\":1}\n{\"name\":\"B\",\"age\":2}"
        );
    }

    #[test]
    fn unknown_type_is_an_error_with_context() {
        let (dir, defs, input) = workspace("{}\n");
        let err = check(&defs, "Nope", &input, &dir.path().join("o.json")).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("cannot check against 'Nope'"), "{message}");
        assert!(message.contains("no type named 'Nope'"), "{message}");
    }

    #[test]
    fn documents_carry_file_and_line_labels() {
        let (_dir, _defs, input) = workspace("{\"a\": 1}\n\n{\"a\": 2}\n");
        let settings = InputSettings { ndjson: true, json_pointer: None, jq_expr: None, input: vec![input.clone()] };
        let labels: Vec<_> = settings.load_documents().unwrap().into_iter().map(|d| d.label).collect();
        assert_eq!(labels, [format!("{input}:1"), format!("{input}:3")]);
    }

    #[test]
    fn definitions_load_as_a_unit_named_after_the_file() {
        let (_dir, defs, _input) = workspace("");
        let scope = DefinitionSettings { defs: PathBuf::from(&defs) }.load().unwrap();
        assert_eq!(scope.name(), "people");
        assert_eq!(scope.names().collect::<Vec<_>>(), ["Person"]);

        let missing = DefinitionSettings { defs: PathBuf::from("/nonexistent/defs.json") }.load();
        assert!(format!("{:#}", missing.unwrap_err()).starts_with("failed to read definitions file"));
    }

    #[test]
    fn cli_parses_check() {
        let cli = CommandLineInterface::try_parse_from([
            "json-coerce", "check", "--defs", "d.json", "--type", "Person", "-i", "a.json", "b.json",
        ])
        .unwrap();
        match cli.cmd {
            Command::Check(check) => {
                assert_eq!(check.type_name, "Person");
                assert_eq!(check.input_settings.input, ["a.json", "b.json"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
