//! Resolution of a writer schema against a reader schema.
//!
//! `resolve` applies reader aliases, then walks both schemas to build a
//! [`ResolutionPlan`]. Ordinary incompatibilities become `Error` actions in
//! the plan; only a missing or malformed schema makes resolution fail.
//!
//! # Example
//! ```
//! use avro_resolver::resolver::{resolve, ActionKind};
//! use avro_resolver::schema::{AvroSchema, TypePromotion};
//!
//! let plan = resolve(&AvroSchema::Int, &AvroSchema::Long).unwrap();
//! assert_eq!(plan.root().kind, ActionKind::Promote(TypePromotion::IntToLong));
//! ```

mod action;
mod cache;
mod engine;

pub use action::{
    Action, ActionId, ActionKind, EnumAction, FieldAction, RecordAction, ResolutionPlan,
    SkippedField, WriterStep,
};
pub use cache::ResolutionCache;

use std::sync::Arc;

use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::SchemaError;
use crate::schema::{apply_aliases_shared, AvroSchema};

use engine::Engine;

/// Builds resolution plans with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Build the plan for decoding `writer` data as `reader`.
    ///
    /// # Errors
    /// - `SchemaError::MissingSchema` if a named reference has no definition
    /// - `SchemaError::InvalidSchema` if a schema defines one name twice with
    ///   different definitions, or gives a custom property a reserved name
    pub fn resolve(&self, writer: &AvroSchema, reader: &AvroSchema) -> Result<ResolutionPlan, SchemaError> {
        // Only the top level is copied; children are shared.
        let writer = Arc::new(writer.clone());
        let reader = Arc::new(reader.clone());
        let reader = if self.config.apply_aliases {
            apply_aliases_shared(&writer, &reader)?
        } else {
            reader
        };

        let (actions, root) = Engine::new(&self.config, &writer, &reader)?.run(&writer, &reader)?;
        let plan = ResolutionPlan::new(actions, root, writer, reader);

        debug!(
            actions = plan.len(),
            root = plan.root().kind.name(),
            writer = %plan.writer().type_name(),
            "Built resolution plan"
        );
        Ok(plan)
    }
}

/// Build the plan for decoding `writer` data as `reader` with the default
/// configuration.
pub fn resolve(writer: &AvroSchema, reader: &AvroSchema) -> Result<ResolutionPlan, SchemaError> {
    Resolver::default().resolve(writer, reader)
}
