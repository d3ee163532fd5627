//! Validation failures (user input) and definition failures (configuration).
use std::fmt;

use thiserror::Error;

// ------------------------------ Validation --------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong shape or kind for the target type.
    TypeMismatch,
    /// Right shape, unparsable content (`"bad"` for an Int).
    CoercionFailure,
    MissingRequiredField,
    /// A closed record saw an undeclared key.
    UnknownField,
    RefinementViolation,
    /// Not a user-input error: the scope was built without this name.
    UnresolvedReference,
    NoUnionBranchMatched,
    LiteralMismatch,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::CoercionFailure => "CoercionFailure",
            ErrorKind::MissingRequiredField => "MissingRequiredField",
            ErrorKind::UnknownField => "UnknownField",
            ErrorKind::RefinementViolation => "RefinementViolation",
            ErrorKind::UnresolvedReference => "UnresolvedReference",
            ErrorKind::NoUnionBranchMatched => "NoUnionBranchMatched",
            ErrorKind::LiteralMismatch => "LiteralMismatch",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, ErrorKind::UnresolvedReference)
    }

    pub fn parse(s: &str) -> Option<Self> {
        const ALL: [ErrorKind; 8] = [
            ErrorKind::TypeMismatch,
            ErrorKind::CoercionFailure,
            ErrorKind::MissingRequiredField,
            ErrorKind::UnknownField,
            ErrorKind::RefinementViolation,
            ErrorKind::UnresolvedReference,
            ErrorKind::NoUnionBranchMatched,
            ErrorKind::LiteralMismatch,
        ];
        ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Location of a failure inside the input, root first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(pub Vec<PathSegment>);

impl Path {
    pub fn is_root(&self) -> bool { self.0.is_empty() }
    pub fn segments(&self) -> &[PathSegment] { &self.0 }
}

/// `.` for the root, otherwise `.name[2].age`.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        for seg in &self.0 {
            match seg {
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

/// First failure met during a validation walk.
#[derive(Debug, Clone, Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub path: Path,
    pub message: String,
    /// For `NoUnionBranchMatched`: the first branch's failure.
    #[source]
    pub cause: Option<Box<ValidationError>>,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, path: Path, message: impl Into<String>) -> Self {
        Self { kind, path, message: message.into(), cause: None }
    }

    pub fn with_cause(mut self, cause: ValidationError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Follows union causes down to the failure that actually tripped.
    pub fn root_cause(&self) -> &ValidationError {
        let mut cur = self;
        while let Some(next) = cur.cause.as_deref() {
            cur = next;
        }
        cur
    }
}

// ------------------------------ Definitions -------------------------------- //

/// Raised while loading or freezing definitions, never while validating.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("type '{name}' is already defined in scope '{scope}'")]
    DuplicateDefinition { scope: String, name: String },

    #[error("field '{field}' is declared twice in type '{ty}'")]
    DuplicateField { ty: String, field: String },

    #[error("definition unit '{0}' is already loaded")]
    DuplicateUnit(String),

    #[error("type '{from}' references '{name}', which is not defined in scope '{scope}'")]
    UnresolvedReference { scope: String, from: String, name: String },

    /// A reference cycle that never passes through an array element or a
    /// record member. `Loop = Nullable(Loop)` and `T = Int | T` land here.
    #[error("unguarded recursion: {}", .cycle.join(" -> "))]
    UnguardedRecursion { cycle: Vec<String> },

    #[error("unknown type in type definition: {0}")]
    UnknownType(String),

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no type named '{name}' in scope '{scope}'")]
    NotDefined { scope: String, name: String },

    #[error("definition unit '{unit}' is not loaded")]
    UnknownUnit { unit: String },

    #[error(transparent)]
    Syntax(#[from] crate::path_de::PathError),
}
