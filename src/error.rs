//! Error types for schema resolution

use std::fmt;

use thiserror::Error;

use crate::schema::SchemaIncompatibility;

/// Which side of a resolution a schema belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaRole {
    /// The schema the data was written with.
    Writer,
    /// The schema the consumer reads into.
    Reader,
}

impl fmt::Display for SchemaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRole::Writer => write!(f, "writer"),
            SchemaRole::Reader => write!(f, "reader"),
        }
    }
}

/// Errors that stop a resolution plan from being built at all.
///
/// An ordinary incompatibility between two schemas is never reported here;
/// it is recorded as an `Error` action inside the plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A schema is absent: a named reference has no definition.
    #[error("Missing {role} schema: '{name}'")]
    MissingSchema { role: SchemaRole, name: String },
    /// Invalid schema structure
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Schemas resolve but some decode path would fail
    #[error("Incompatible schemas: {0}")]
    IncompatibleSchemas(String),
}

/// Errors raised while a decoder executes a plan.
///
/// These are the deferred failures: the plan itself was legal to build, but
/// the encoded data took a path the reader cannot represent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Writer enum symbol with no counterpart in the reader enum
    #[error("Unresolvable symbol '{symbol}' for enum '{enum_name}'")]
    UnknownSymbol { enum_name: String, symbol: String },
    /// Writer union branch that cannot be read
    #[error("Incompatible union branch {branch}: {incompatibility}")]
    IncompatibleBranch {
        branch: usize,
        incompatibility: SchemaIncompatibility,
    },
    /// Error action reached during decoding
    #[error("{0}")]
    Incompatible(SchemaIncompatibility),
    /// Encoded index out of range for the schema
    #[error("Index {index} out of range ({len} entries)")]
    IndexOutOfRange { index: usize, len: usize },
    /// Action kind does not fit the requested operation
    #[error("Unexpected action: expected {expected}, found {found}")]
    UnexpectedAction {
        expected: &'static str,
        found: &'static str,
    },
}
