use std::fmt;

use anyhow::{anyhow, Context, Result};
use jaq_core::{load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Runs a jq filter over one document; every output becomes a document.
pub fn apply_filter(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader
        .load(&arena, program)
        .map_err(|errs| collect_errors("parse", errs))?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| collect_errors("compile", errs))?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut docs = Vec::new();
    for item in outputs {
        let val = item.map_err(|e| anyhow!("jq runtime error: {e:?}"))?;
        // Val only knows how to print itself as JSON; go through text.
        let text = val.to_string();
        let doc = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("jq produced non-JSON output `{text}`"))?;
        docs.push(doc);
    }
    tracing::trace!(filter = filter_src, outputs = docs.len(), "applied jq filter");
    Ok(docs)
}

/// jaq reports load and compile problems per file; fold them into one error.
fn collect_errors<E: fmt::Debug>(stage: &str, errs: Vec<(load::File<&str, ()>, E)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .iter()
        .map(|(file, err)| format!("jq {stage} error in `{}`: {err:?}", file.code))
        .collect();
    anyhow!(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_fans_out_into_documents() {
        let docs = apply_filter(".items[]", &json!({"items": [1, {"a": "x"}]})).unwrap();
        assert_eq!(docs, [json!(1), json!({"a": "x"})]);
    }

    #[test]
    fn parse_errors_surface() {
        let err = apply_filter(".[", &json!(null)).unwrap_err();
        assert!(err.to_string().starts_with("jq parse error"), "{err}");
    }

    #[test]
    fn undefined_functions_fail_to_compile() {
        let err = apply_filter("no_such_fn", &json!(null)).unwrap_err();
        assert!(err.to_string().starts_with("jq compile error"), "{err}");
    }
}
