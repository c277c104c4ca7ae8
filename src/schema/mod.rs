//! Avro schema model, alias application and compatibility reporting.
//!
//! This module defines the schema type system (primitives, named types and
//! containers), the registry that follows named references, the reader alias
//! rewrite, and the numeric promotion table used by resolution.

mod aliases;
mod compatibility;
mod promotion;
mod registry;
mod types;

pub use aliases::apply_aliases;
pub(crate) use aliases::apply_aliases_shared;
pub use compatibility::{
    check_compatibility, validate_schema_compatibility, CompatibilityResult, IncompatibilityReason,
    SchemaIncompatibility,
};
pub use promotion::TypePromotion;
pub use registry::NamedTypes;
pub use types::*;
