//! Registry of named type definitions.
//!
//! A schema defines each record, enum and fixed type once and refers to it
//! elsewhere through `AvroSchema::Named`. The registry maps full names to
//! those definitions so that references, including recursive ones, can be
//! followed without copying the schema.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{SchemaError, SchemaRole};
use crate::schema::types::{reserved_property, Properties};
use crate::schema::AvroSchema;

/// Named type definitions of one schema. Definitions are shared with the
/// schema, not copied.
#[derive(Debug, Clone)]
pub struct NamedTypes {
    role: SchemaRole,
    types: HashMap<String, Arc<AvroSchema>>,
}

impl NamedTypes {
    /// Build a registry by walking `schema` and registering every named type.
    ///
    /// The same full name may be defined more than once only if every
    /// definition is identical. Custom properties may not reuse a reserved
    /// attribute name such as `type` or `fields`.
    pub fn build(schema: &AvroSchema, role: SchemaRole) -> Result<Self, SchemaError> {
        Self::build_shared(&Arc::new(schema.clone()), role)
    }

    pub(crate) fn build_shared(schema: &Arc<AvroSchema>, role: SchemaRole) -> Result<Self, SchemaError> {
        let mut registry = Self {
            role,
            types: HashMap::new(),
        };
        registry.extract_named_types(schema)?;
        Ok(registry)
    }

    fn extract_named_types(&mut self, schema: &Arc<AvroSchema>) -> Result<(), SchemaError> {
        match schema.as_ref() {
            AvroSchema::Record(record) => {
                let fullname = record.fullname();
                self.check_properties(&fullname, &record.properties)?;
                for field in &record.fields {
                    self.check_properties(&format!("{}.{}", fullname, field.name), &field.properties)?;
                }
                if self.register(fullname, schema)? {
                    for field in &record.fields {
                        self.extract_named_types(&field.schema)?;
                    }
                }
            }
            AvroSchema::Enum(e) => {
                let fullname = e.fullname();
                self.check_properties(&fullname, &e.properties)?;
                self.register(fullname, schema)?;
            }
            AvroSchema::Fixed(f) => {
                let fullname = f.fullname();
                self.check_properties(&fullname, &f.properties)?;
                self.register(fullname, schema)?;
            }
            AvroSchema::Array(items) => self.extract_named_types(items)?,
            AvroSchema::Map(values) => self.extract_named_types(values)?,
            AvroSchema::Union(variants) => {
                for variant in variants {
                    self.extract_named_types(variant)?;
                }
            }
            // Primitives and Named references don't contain definitions
            _ => {}
        }
        Ok(())
    }

    /// Returns true if the definition is new.
    fn register(&mut self, fullname: String, schema: &Arc<AvroSchema>) -> Result<bool, SchemaError> {
        match self.types.get(&fullname) {
            Some(existing) if existing == schema => Ok(false),
            Some(_) => Err(SchemaError::InvalidSchema(format!(
                "{} schema defines '{}' more than once with different definitions",
                self.role, fullname
            ))),
            None => {
                self.types.insert(fullname, Arc::clone(schema));
                Ok(true)
            }
        }
    }

    // A reserved key would be dropped from the JSON form.
    fn check_properties(&self, owner: &str, properties: &Properties) -> Result<(), SchemaError> {
        match reserved_property(properties) {
            Some(key) => Err(SchemaError::InvalidSchema(format!(
                "{} schema gives '{}' a custom property named '{}', which is a reserved attribute",
                self.role, owner, key
            ))),
            None => Ok(()),
        }
    }

    /// Which side of the resolution this registry describes.
    pub fn role(&self) -> SchemaRole {
        self.role
    }

    /// Get a named type definition.
    pub fn get(&self, name: &str) -> Option<&AvroSchema> {
        self.types.get(name).map(Arc::as_ref)
    }

    /// Check if a named type is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of named types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no named types are defined.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Follow a `Named` reference to its definition. Other schemas are
    /// returned unchanged.
    pub fn deref<'s>(&'s self, schema: &'s AvroSchema) -> Result<&'s AvroSchema, SchemaError> {
        match schema {
            AvroSchema::Named(name) => self.get(name).ok_or_else(|| self.missing(name)),
            _ => Ok(schema),
        }
    }

    /// Like [`NamedTypes::deref`], handing out a shared handle to the node.
    pub(crate) fn deref_shared(&self, schema: &Arc<AvroSchema>) -> Result<Arc<AvroSchema>, SchemaError> {
        match schema.as_ref() {
            AvroSchema::Named(name) => self.types.get(name).cloned().ok_or_else(|| self.missing(name)),
            _ => Ok(Arc::clone(schema)),
        }
    }

    fn missing(&self, name: &str) -> SchemaError {
        SchemaError::MissingSchema {
            role: self.role,
            name: name.to_string(),
        }
    }
}
