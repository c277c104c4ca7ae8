//! Schema compatibility reporting.
//!
//! Incompatibilities are data: the resolution engine records them in `Error`
//! actions and decoding only fails if such a path is taken. This module
//! defines those records and summarizes a whole plan into a report of every
//! path that could fail.

use std::collections::HashSet;
use std::fmt;

use crate::error::SchemaError;
use crate::resolver::{resolve, ActionId, ActionKind, ResolutionPlan};
use crate::schema::AvroSchema;

/// Result of a schema compatibility check.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityResult {
    /// Whether every decode path of the plan succeeds.
    pub is_compatible: bool,
    /// List of incompatibilities found (empty if compatible).
    pub incompatibilities: Vec<SchemaIncompatibility>,
}

impl CompatibilityResult {
    /// Create a result from a list of incompatibilities.
    pub fn from_incompatibilities(incompatibilities: Vec<SchemaIncompatibility>) -> Self {
        Self {
            is_compatible: incompatibilities.is_empty(),
            incompatibilities,
        }
    }

    /// Collect every failure reachable from the root of `plan`: error actions,
    /// including deferred union branches, and writer enum symbols the reader
    /// cannot represent.
    pub fn from_plan(plan: &ResolutionPlan) -> Self {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        collect_failures(plan, plan.root_id(), &mut visited, &mut found);
        Self::from_incompatibilities(found)
    }

    /// Convert to a SchemaError if incompatible.
    pub fn to_error(&self) -> Option<SchemaError> {
        if self.is_compatible {
            None
        } else {
            let messages: Vec<String> = self
                .incompatibilities
                .iter()
                .map(|i| i.to_string())
                .collect();
            Some(SchemaError::IncompatibleSchemas(messages.join("; ")))
        }
    }
}

fn collect_failures(
    plan: &ResolutionPlan,
    id: ActionId,
    visited: &mut HashSet<ActionId>,
    found: &mut Vec<SchemaIncompatibility>,
) {
    if !visited.insert(id) {
        return;
    }
    let action = plan.action(id);
    match &action.kind {
        ActionKind::Error(incompatibility) => found.push(incompatibility.clone()),
        ActionKind::Enum(enum_action) => {
            if let AvroSchema::Enum(writer) = action.writer.as_ref() {
                for (index, adjustment) in enum_action.adjustments.iter().enumerate() {
                    if adjustment.is_none() {
                        found.push(SchemaIncompatibility {
                            path: format!("enum '{}'", writer.fullname()),
                            reason: IncompatibilityReason::MissingEnumSymbol {
                                symbol: writer.symbols[index].clone(),
                            },
                        });
                    }
                }
            }
        }
        kind => {
            for child in kind.children() {
                collect_failures(plan, child, visited, found);
            }
        }
    }
}

/// Describes a specific schema incompatibility.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaIncompatibility {
    /// Path to the incompatible element (e.g., "field 'address'.field 'city'").
    pub path: String,
    /// Description of the incompatibility.
    pub reason: IncompatibilityReason,
}

impl fmt::Display for SchemaIncompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "at {}: {}", self.path, self.reason)
        }
    }
}

/// Reasons for schema incompatibility.
#[derive(Debug, Clone, PartialEq)]
pub enum IncompatibilityReason {
    /// Types are fundamentally incompatible.
    TypeMismatch {
        writer_type: String,
        reader_type: String,
    },
    /// Reader schema has a required field not in writer schema and no default.
    MissingRequiredField { field_name: String },
    /// Named types have different names.
    NameMismatch {
        writer_name: String,
        reader_name: String,
    },
    /// Fixed types have different sizes.
    FixedSizeMismatch {
        writer_size: usize,
        reader_size: usize,
    },
    /// Enum symbol in writer not found in reader and no default.
    MissingEnumSymbol { symbol: String },
    /// No branch of the reader union accepts the writer type.
    NoMatchingBranch { writer_type: String },
}

impl fmt::Display for IncompatibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncompatibilityReason::TypeMismatch {
                writer_type,
                reader_type,
            } => write!(
                f,
                "type mismatch: writer has '{}', reader expects '{}'",
                writer_type, reader_type
            ),
            IncompatibilityReason::MissingRequiredField { field_name } => write!(
                f,
                "reader has required field '{}' not present in writer schema and no default value",
                field_name
            ),
            IncompatibilityReason::NameMismatch {
                writer_name,
                reader_name,
            } => write!(
                f,
                "name mismatch: writer has '{}', reader expects '{}'",
                writer_name, reader_name
            ),
            IncompatibilityReason::FixedSizeMismatch {
                writer_size,
                reader_size,
            } => write!(
                f,
                "fixed size mismatch: writer has {} bytes, reader expects {} bytes",
                writer_size, reader_size
            ),
            IncompatibilityReason::MissingEnumSymbol { symbol } => write!(
                f,
                "enum symbol '{}' in writer not found in reader and no default",
                symbol
            ),
            IncompatibilityReason::NoMatchingBranch { writer_type } => write!(
                f,
                "no branch of the reader union matches writer '{}'",
                writer_type
            ),
        }
    }
}

/// Check whether data written with `writer_schema` can always be read with
/// `reader_schema`.
///
/// Unlike a resolution plan, which defers union-branch and enum-symbol
/// failures to decode time, this reports every path that could fail.
///
/// # Errors
/// `SchemaError::MissingSchema` if either schema cannot be dereferenced.
pub fn check_compatibility(
    writer_schema: &AvroSchema,
    reader_schema: &AvroSchema,
) -> Result<CompatibilityResult, SchemaError> {
    let plan = resolve(writer_schema, reader_schema)?;
    Ok(CompatibilityResult::from_plan(&plan))
}

/// Validate that a reader schema is compatible with a writer schema.
///
/// # Example
/// ```
/// use avro_resolver::schema::{validate_schema_compatibility, AvroSchema};
///
/// // int can be promoted to long
/// assert!(validate_schema_compatibility(&AvroSchema::Int, &AvroSchema::Long).is_ok());
///
/// // string cannot be read as int
/// assert!(validate_schema_compatibility(&AvroSchema::String, &AvroSchema::Int).is_err());
/// ```
pub fn validate_schema_compatibility(
    writer_schema: &AvroSchema,
    reader_schema: &AvroSchema,
) -> Result<(), SchemaError> {
    match check_compatibility(writer_schema, reader_schema)?.to_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
