//! Named type definitions compiled into coercive validators.
//!
//! A validator takes an untyped value (JSON, env strings, CLI args) and
//! returns the canonical typed value, or the first `ValidationError`.
//!
//! ```
//! use json_coerce::{Field, ScopeBuilder, TypeExpr};
//! use serde_json::json;
//!
//! let scope = ScopeBuilder::new("example")
//!     .define("Person", TypeExpr::record([
//!         Field::required("name", TypeExpr::string()),
//!         Field::optional("age", TypeExpr::int()),
//!     ]))?
//!     .build()?;
//! let person = scope.compile("Person")?;
//! assert_eq!(
//!     person.validate_json(&json!({"name": "Bob", "age": "30"})).unwrap(),
//!     json!({"name": "Bob", "age": 30}),
//! );
//! # Ok::<(), json_coerce::DefinitionError>(())
//! ```
pub mod ast;
pub mod coerce;
pub mod engine;
pub mod error;
pub mod ir;
pub mod jq_exec;
pub mod lower;
pub mod path_de;
pub mod registry;
pub mod scope;
pub mod value;

pub use engine::{validate, validate_in, NoReferences, Resolve};
pub use error::{DefinitionError, ErrorKind, Path, PathSegment, ValidationError};
pub use ir::{CmpOp, Constraint, Extras, Field, Kind, Predicate, TypeExpr};
pub use registry::Registry;
pub use scope::{Scope, ScopeBuilder, Validator};
pub use value::{IsoDuration, Value};
