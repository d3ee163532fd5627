use serde::de::DeserializeOwned;
use thiserror::Error;

/// A deserialization failure located by JSON path.
#[derive(Debug, Error)]
#[error("at JSON path {path} → {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_path_error)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_path_error)
}

fn into_path_error(err: serde_path_to_error::Error<serde_json::Error>) -> PathError {
    PathError { path: err.path().to_string(), message: err.into_inner().to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Definitions;

    #[test]
    fn errors_point_at_the_bad_node() {
        let src = r#"{ "types": [ { "name": "T", "type": { "kind": "array_type", "element": { "kind": "nope" } } } ] }"#;
        let err = from_str_with_path::<Definitions>(src).unwrap_err();
        assert!(err.path.starts_with("types[0].type"), "{}", err.path);
    }

    #[test]
    fn valid_input_passes_through() {
        let defs: Definitions = from_slice_with_path(br#"{ "types": [] }"#).unwrap();
        assert!(defs.types.is_empty());
    }
}
