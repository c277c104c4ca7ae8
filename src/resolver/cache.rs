//! Shared cache of resolution plans.
//!
//! Plans are keyed by the JSON form of the writer and reader schemas, so
//! structurally equal schemas share a plan no matter where they came from.
//! Schemas are validated before a key is formed: the JSON form is only
//! faithful for schemas that resolution accepts.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::{SchemaError, SchemaRole};
use crate::resolver::{ResolutionPlan, Resolver};
use crate::schema::{AvroSchema, NamedTypes};

type PlanKey = (String, String);

fn plan_key(writer: &AvroSchema, reader: &AvroSchema) -> Result<PlanKey, SchemaError> {
    NamedTypes::build(writer, SchemaRole::Writer)?;
    NamedTypes::build(reader, SchemaRole::Reader)?;
    Ok((writer.to_json(), reader.to_json()))
}

/// Thread-safe map from (writer, reader) schema pairs to plans.
///
/// Resolution runs outside the lock; if two threads resolve the same pair at
/// once, the first plan stored wins and both callers receive it.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    resolver: Resolver,
    plans: RwLock<HashMap<PlanKey, Arc<ResolutionPlan>>>,
}

impl ResolutionCache {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            resolver: Resolver::new(config),
            plans: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        self.resolver.config()
    }

    /// Return the cached plan for the pair, resolving it on first use.
    ///
    /// Fatal errors are returned without caching anything.
    pub fn get_or_resolve(
        &self,
        writer: &AvroSchema,
        reader: &AvroSchema,
    ) -> Result<Arc<ResolutionPlan>, SchemaError> {
        let key = plan_key(writer, reader)?;

        let plans = self.plans.read();
        if let Some(plan) = plans.get(&key) {
            debug!(actions = plan.len(), "Resolution cache hit");
            return Ok(Arc::clone(plan));
        }
        drop(plans);

        debug!(writer = %writer.type_name(), reader = %reader.type_name(), "Resolution cache miss");
        let plan = Arc::new(self.resolver.resolve(writer, reader)?);

        let mut plans = self.plans.write();
        match plans.entry(key) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => Ok(Arc::clone(entry.insert(plan))),
        }
    }

    /// Cached plan for the pair, without resolving. `None` for a pair that
    /// could never be cached.
    pub fn get(&self, writer: &AvroSchema, reader: &AvroSchema) -> Option<Arc<ResolutionPlan>> {
        let key = plan_key(writer, reader).ok()?;
        self.plans.read().get(&key).cloned()
    }

    /// Number of cached plans.
    pub fn len(&self) -> usize {
        self.plans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.read().is_empty()
    }

    /// Drop every cached plan. Plans already handed out stay valid.
    pub fn clear(&self) {
        self.plans.write().clear();
    }
}
