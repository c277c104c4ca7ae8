//! Avro schema resolution
//!
//! Given the schema data was written with and the schema a consumer wants,
//! this library builds a reusable resolution plan describing how a decoder
//! turns writer-encoded values into reader-shaped ones: which fields to skip,
//! which defaults to fill in, which numbers to widen, how to remap enum
//! symbols and which union branches to pick.

pub mod config;
pub mod error;
pub mod resolver;
pub mod schema;

pub use config::ResolverConfig;
pub use error::{DecodeError, SchemaError, SchemaRole};
pub use resolver::{
    resolve, Action, ActionId, ActionKind, EnumAction, FieldAction, RecordAction,
    ResolutionCache, ResolutionPlan, Resolver, SkippedField, WriterStep,
};
pub use schema::{
    apply_aliases, check_compatibility, validate_schema_compatibility, AvroSchema,
    CompatibilityResult, EnumSchema, FieldSchema, FixedSchema, IncompatibilityReason, NamedTypes,
    RecordSchema, SchemaIncompatibility, SchemaKind, TypePromotion,
};
