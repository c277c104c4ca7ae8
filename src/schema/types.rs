//! Avro schema types and representations.
//!
//! Schemas are plain immutable values. A named type (record, enum, fixed) is
//! defined once and referenced elsewhere through [`AvroSchema::Named`], which
//! is how recursive types are expressed without reference cycles.
//!
//! Child schemas sit behind `Arc`, so cloning a schema copies one level and
//! resolution plans point at the same nodes as the schema they came from.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};

/// Custom schema metadata. Preserved but never interpreted by resolution.
pub type Properties = BTreeMap<String, String>;

/// Represents an Avro schema.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    // Primitive types
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,

    // Complex types
    /// Record type with named fields.
    Record(RecordSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Array of items with a single schema.
    Array(Arc<AvroSchema>),
    /// Map with string keys and values of a single schema.
    Map(Arc<AvroSchema>),
    /// Union of multiple schemas.
    Union(Vec<Arc<AvroSchema>>),
    /// Fixed-size byte array.
    Fixed(FixedSchema),

    /// Reference to a named type defined elsewhere in the schema, by its
    /// fully qualified name.
    Named(String),
}

/// The kind of a schema, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record,
    Enum,
    Array,
    Map,
    Fixed,
    Union,
}

impl SchemaKind {
    /// The Avro type name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Float => "float",
            SchemaKind::Double => "double",
            SchemaKind::Bytes => "bytes",
            SchemaKind::String => "string",
            SchemaKind::Record => "record",
            SchemaKind::Enum => "enum",
            SchemaKind::Array => "array",
            SchemaKind::Map => "map",
            SchemaKind::Fixed => "fixed",
            SchemaKind::Union => "union",
        }
    }

    /// Check if this kind is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            SchemaKind::Null
                | SchemaKind::Boolean
                | SchemaKind::Int
                | SchemaKind::Long
                | SchemaKind::Float
                | SchemaKind::Double
                | SchemaKind::Bytes
                | SchemaKind::String
        )
    }
}

/// Qualify `name` against `namespace` unless it is already dotted.
pub(crate) fn qualify(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !name.contains('.') && !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

/// Split a full name into `(namespace, name)`.
pub(crate) fn split_fullname(fullname: &str) -> (Option<String>, String) {
    match fullname.rsplit_once('.') {
        Some((ns, name)) => (Some(ns.to_string()), name.to_string()),
        None => (None, fullname.to_string()),
    }
}

/// Attribute names the JSON form of a schema or field uses itself.
const RESERVED_ATTRIBUTES: [&str; 12] = [
    "type", "name", "namespace", "doc", "aliases", "fields", "symbols", "size", "default",
    "items", "values", "order",
];

/// First custom property whose key is a reserved attribute name.
pub(crate) fn reserved_property(properties: &Properties) -> Option<&str> {
    properties
        .keys()
        .map(String::as_str)
        .find(|key| RESERVED_ATTRIBUTES.contains(key))
}

fn insert_properties(obj: &mut Map<String, Value>, properties: &Properties) {
    for (key, value) in properties {
        if !obj.contains_key(key) {
            obj.insert(key.clone(), json!(value));
        }
    }
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The name of the record.
    pub name: String,
    /// Optional namespace for the record.
    pub namespace: Option<String>,
    /// The fields of the record.
    pub fields: Vec<FieldSchema>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this record.
    pub aliases: Vec<String>,
    /// Custom properties.
    pub properties: Properties,
}

impl RecordSchema {
    /// Create a new RecordSchema with the given name and fields.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            fields,
            doc: None,
            aliases: Vec::new(),
            properties: Properties::new(),
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the documentation.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Add aliases.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Add a custom property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        qualify(&self.name, self.namespace.as_deref())
    }

    /// Aliases qualified against this record's namespace.
    pub fn alias_fullnames(&self) -> Vec<String> {
        self.aliases
            .iter()
            .map(|a| qualify(a, self.namespace.as_deref()))
            .collect()
    }

    /// Find a field by exact name, returning its position.
    pub fn field(&self, name: &str) -> Option<(usize, &FieldSchema)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    /// Serialize the record schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("record"));
        obj.insert("name".to_string(), json!(&self.name));

        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }

        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }

        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }

        let fields: Vec<Value> = self.fields.iter().map(|f| f.to_json_value()).collect();
        obj.insert("fields".to_string(), Value::Array(fields));

        insert_properties(&mut obj, &self.properties);
        Value::Object(obj)
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The name of the field.
    pub name: String,
    /// The schema of the field's value.
    pub schema: Arc<AvroSchema>,
    /// Optional default value for the field.
    pub default: Option<Value>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this field.
    pub aliases: Vec<String>,
    /// Custom properties.
    pub properties: Properties,
}

impl FieldSchema {
    /// Create a new FieldSchema with the given name and schema.
    pub fn new(name: impl Into<String>, schema: impl Into<Arc<AvroSchema>>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            default: None,
            doc: None,
            aliases: Vec::new(),
            properties: Properties::new(),
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the documentation.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Add aliases.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Add a custom property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Whether the field declares a default value.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Serialize the field schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(&self.name));
        obj.insert("type".to_string(), self.schema.to_json_value());

        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }

        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }

        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }

        insert_properties(&mut obj, &self.properties);
        Value::Object(obj)
    }
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The name of the enum.
    pub name: String,
    /// Optional namespace for the enum.
    pub namespace: Option<String>,
    /// The symbols (variants) of the enum.
    pub symbols: Vec<String>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this enum.
    pub aliases: Vec<String>,
    /// Default symbol, used for writer symbols the reader lacks.
    pub default: Option<String>,
    /// Custom properties.
    pub properties: Properties,
}

impl EnumSchema {
    /// Create a new EnumSchema with the given name and symbols.
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            symbols,
            doc: None,
            aliases: Vec::new(),
            default: None,
            properties: Properties::new(),
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the default symbol.
    pub fn with_default(mut self, symbol: impl Into<String>) -> Self {
        self.default = Some(symbol.into());
        self
    }

    /// Add aliases.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Add a custom property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        qualify(&self.name, self.namespace.as_deref())
    }

    /// Aliases qualified against this enum's namespace.
    pub fn alias_fullnames(&self) -> Vec<String> {
        self.aliases
            .iter()
            .map(|a| qualify(a, self.namespace.as_deref()))
            .collect()
    }

    /// Get the index of a symbol.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// Serialize the enum schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("enum"));
        obj.insert("name".to_string(), json!(&self.name));

        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }

        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }

        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }

        obj.insert("symbols".to_string(), json!(&self.symbols));

        if let Some(default) = &self.default {
            obj.insert("default".to_string(), json!(default));
        }

        insert_properties(&mut obj, &self.properties);
        Value::Object(obj)
    }
}

/// Schema for a fixed-size byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The name of the fixed type.
    pub name: String,
    /// Optional namespace for the fixed type.
    pub namespace: Option<String>,
    /// The size in bytes.
    pub size: usize,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this fixed type.
    pub aliases: Vec<String>,
    /// Custom properties.
    pub properties: Properties,
}

impl FixedSchema {
    /// Create a new FixedSchema with the given name and size.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            size,
            doc: None,
            aliases: Vec::new(),
            properties: Properties::new(),
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Add aliases.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Add a custom property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        qualify(&self.name, self.namespace.as_deref())
    }

    /// Aliases qualified against this fixed type's namespace.
    pub fn alias_fullnames(&self) -> Vec<String> {
        self.aliases
            .iter()
            .map(|a| qualify(a, self.namespace.as_deref()))
            .collect()
    }

    /// Serialize the fixed schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("fixed"));
        obj.insert("name".to_string(), json!(&self.name));

        if let Some(ns) = &self.namespace {
            obj.insert("namespace".to_string(), json!(ns));
        }

        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }

        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }

        obj.insert("size".to_string(), json!(self.size));

        insert_properties(&mut obj, &self.properties);
        Value::Object(obj)
    }
}

impl AvroSchema {
    /// Array of `items`.
    pub fn array(items: AvroSchema) -> Self {
        AvroSchema::Array(Arc::new(items))
    }

    /// Map with values of `values`.
    pub fn map(values: AvroSchema) -> Self {
        AvroSchema::Map(Arc::new(values))
    }

    /// Union of `branches`, in order.
    pub fn union(branches: Vec<AvroSchema>) -> Self {
        AvroSchema::Union(branches.into_iter().map(Arc::new).collect())
    }

    /// Reference to the named type `fullname`.
    pub fn named(fullname: impl Into<String>) -> Self {
        AvroSchema::Named(fullname.into())
    }

    /// The kind of this schema. `None` for a `Named` reference, whose kind is
    /// that of the definition it points to.
    pub fn kind(&self) -> Option<SchemaKind> {
        Some(match self {
            AvroSchema::Null => SchemaKind::Null,
            AvroSchema::Boolean => SchemaKind::Boolean,
            AvroSchema::Int => SchemaKind::Int,
            AvroSchema::Long => SchemaKind::Long,
            AvroSchema::Float => SchemaKind::Float,
            AvroSchema::Double => SchemaKind::Double,
            AvroSchema::Bytes => SchemaKind::Bytes,
            AvroSchema::String => SchemaKind::String,
            AvroSchema::Record(_) => SchemaKind::Record,
            AvroSchema::Enum(_) => SchemaKind::Enum,
            AvroSchema::Array(_) => SchemaKind::Array,
            AvroSchema::Map(_) => SchemaKind::Map,
            AvroSchema::Union(_) => SchemaKind::Union,
            AvroSchema::Fixed(_) => SchemaKind::Fixed,
            AvroSchema::Named(_) => return None,
        })
    }

    /// Check if this schema is a primitive type.
    pub fn is_primitive(&self) -> bool {
        self.kind().is_some_and(|k| k.is_primitive())
    }

    /// Check if this schema is a named type (record, enum, or fixed).
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            AvroSchema::Record(_) | AvroSchema::Enum(_) | AvroSchema::Fixed(_)
        )
    }

    /// Get the name of a named type, if applicable.
    pub fn name(&self) -> Option<&str> {
        match self {
            AvroSchema::Record(r) => Some(&r.name),
            AvroSchema::Enum(e) => Some(&e.name),
            AvroSchema::Fixed(f) => Some(&f.name),
            AvroSchema::Named(n) => Some(n),
            _ => None,
        }
    }

    /// Get the fully qualified name of a named type, if applicable.
    pub fn fullname(&self) -> Option<String> {
        match self {
            AvroSchema::Record(r) => Some(r.fullname()),
            AvroSchema::Enum(e) => Some(e.fullname()),
            AvroSchema::Fixed(f) => Some(f.fullname()),
            AvroSchema::Named(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// Qualified aliases of a named type; empty for everything else.
    pub fn alias_fullnames(&self) -> Vec<String> {
        match self {
            AvroSchema::Record(r) => r.alias_fullnames(),
            AvroSchema::Enum(e) => e.alias_fullnames(),
            AvroSchema::Fixed(f) => f.alias_fullnames(),
            _ => Vec::new(),
        }
    }

    /// Custom properties of a named type, if applicable.
    pub fn properties(&self) -> Option<&Properties> {
        match self {
            AvroSchema::Record(r) => Some(&r.properties),
            AvroSchema::Enum(e) => Some(&e.properties),
            AvroSchema::Fixed(f) => Some(&f.properties),
            _ => None,
        }
    }

    /// Human-readable type description for diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            AvroSchema::Record(r) => format!("record '{}'", r.fullname()),
            AvroSchema::Enum(e) => format!("enum '{}'", e.fullname()),
            AvroSchema::Fixed(f) => format!("fixed '{}' ({} bytes)", f.fullname(), f.size),
            AvroSchema::Named(n) => format!("named '{}'", n),
            other => other
                .kind()
                .map(|k| k.name().to_string())
                .unwrap_or_default(),
        }
    }

    /// Serialize the schema to a JSON string.
    ///
    /// # Example
    /// ```
    /// use avro_resolver::schema::AvroSchema;
    ///
    /// let schema = AvroSchema::String;
    /// assert_eq!(schema.to_json(), r#""string""#);
    /// ```
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Serialize the schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        match self {
            AvroSchema::Null => json!("null"),
            AvroSchema::Boolean => json!("boolean"),
            AvroSchema::Int => json!("int"),
            AvroSchema::Long => json!("long"),
            AvroSchema::Float => json!("float"),
            AvroSchema::Double => json!("double"),
            AvroSchema::Bytes => json!("bytes"),
            AvroSchema::String => json!("string"),

            AvroSchema::Record(r) => r.to_json_value(),
            AvroSchema::Enum(e) => e.to_json_value(),
            AvroSchema::Array(items) => {
                json!({
                    "type": "array",
                    "items": items.to_json_value()
                })
            }
            AvroSchema::Map(values) => {
                json!({
                    "type": "map",
                    "values": values.to_json_value()
                })
            }
            AvroSchema::Union(variants) => {
                Value::Array(variants.iter().map(|v| v.to_json_value()).collect())
            }
            AvroSchema::Fixed(f) => f.to_json_value(),

            AvroSchema::Named(name) => json!(name),
        }
    }
}
