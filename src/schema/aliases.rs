//! Alias application for reader schemas.
//!
//! The reader may declare aliases on its named types and record fields. When
//! an alias matches the name the writer used at the same position, the reader
//! is rewritten to carry the writer's name so that later matching by name
//! succeeds. The result is the *effective reader schema*.
//!
//! Writer and reader are walked in lock step to decide which reader names to
//! change; the reader is then rewritten in a second pass, renaming definitions
//! and every `Named` reference to them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use crate::error::{SchemaError, SchemaRole};
use crate::schema::types::split_fullname;
use crate::schema::{AvroSchema, EnumSchema, FieldSchema, FixedSchema, NamedTypes, RecordSchema};

/// Rewrite `reader` so that names matched through reader aliases carry the
/// writer's name.
///
/// Union branches are left untouched: their partners are only known once the
/// resolution engine pairs branches up.
///
/// # Errors
/// `SchemaError::MissingSchema` if either schema is, or reaches, a named
/// reference without a definition.
pub fn apply_aliases(writer: &AvroSchema, reader: &AvroSchema) -> Result<AvroSchema, SchemaError> {
    let writer = Arc::new(writer.clone());
    let reader = Arc::new(reader.clone());
    let effective = apply_aliases_shared(&writer, &reader)?;
    Ok(effective.as_ref().clone())
}

/// [`apply_aliases`] on shared schemas. An unchanged reader is handed back
/// as is.
pub(crate) fn apply_aliases_shared(
    writer: &Arc<AvroSchema>,
    reader: &Arc<AvroSchema>,
) -> Result<Arc<AvroSchema>, SchemaError> {
    let mut collector = AliasCollector {
        writer_types: NamedTypes::build_shared(writer, SchemaRole::Writer)?,
        reader_types: NamedTypes::build_shared(reader, SchemaRole::Reader)?,
        visited: HashSet::new(),
        renames: Renames::default(),
    };
    collector.collect(writer, reader)?;

    let renames = collector.renames;
    if renames.is_empty() {
        return Ok(Arc::clone(reader));
    }
    Ok(Arc::new(renames.rewrite(reader)))
}

/// Reader names to replace, keyed by the reader's original names.
#[derive(Debug, Default)]
struct Renames {
    /// reader full name -> writer full name
    types: HashMap<String, String>,
    /// reader record full name -> (reader field name -> writer field name)
    fields: HashMap<String, HashMap<String, String>>,
}

impl Renames {
    fn is_empty(&self) -> bool {
        self.types.is_empty() && self.fields.is_empty()
    }

    fn rename(&self, fullname: &str, name: &str, namespace: &Option<String>) -> (String, Option<String>) {
        match self.types.get(fullname) {
            Some(new_fullname) => {
                let (namespace, name) = split_fullname(new_fullname);
                (name, namespace)
            }
            None => (name.to_string(), namespace.clone()),
        }
    }

    fn rewrite(&self, schema: &AvroSchema) -> AvroSchema {
        match schema {
            AvroSchema::Record(record) => {
                let fullname = record.fullname();
                let field_renames = self.fields.get(&fullname);
                let fields = record
                    .fields
                    .iter()
                    .map(|field| FieldSchema {
                        name: field_renames
                            .and_then(|m| m.get(&field.name))
                            .cloned()
                            .unwrap_or_else(|| field.name.clone()),
                        schema: Arc::new(self.rewrite(&field.schema)),
                        default: field.default.clone(),
                        doc: field.doc.clone(),
                        aliases: field.aliases.clone(),
                        properties: field.properties.clone(),
                    })
                    .collect();
                let (name, namespace) = self.rename(&fullname, &record.name, &record.namespace);
                AvroSchema::Record(RecordSchema {
                    name,
                    namespace,
                    fields,
                    doc: record.doc.clone(),
                    aliases: record.aliases.clone(),
                    properties: record.properties.clone(),
                })
            }
            AvroSchema::Enum(e) => {
                let (name, namespace) = self.rename(&e.fullname(), &e.name, &e.namespace);
                AvroSchema::Enum(EnumSchema {
                    name,
                    namespace,
                    ..e.clone()
                })
            }
            AvroSchema::Fixed(f) => {
                let (name, namespace) = self.rename(&f.fullname(), &f.name, &f.namespace);
                AvroSchema::Fixed(FixedSchema {
                    name,
                    namespace,
                    ..f.clone()
                })
            }
            AvroSchema::Array(items) => AvroSchema::Array(Arc::new(self.rewrite(items))),
            AvroSchema::Map(values) => AvroSchema::Map(Arc::new(self.rewrite(values))),
            AvroSchema::Union(variants) => {
                AvroSchema::Union(variants.iter().map(|v| Arc::new(self.rewrite(v))).collect())
            }
            AvroSchema::Named(name) => {
                AvroSchema::Named(self.types.get(name).cloned().unwrap_or_else(|| name.clone()))
            }
            primitive => primitive.clone(),
        }
    }
}

struct AliasCollector {
    writer_types: NamedTypes,
    reader_types: NamedTypes,
    visited: HashSet<(String, String)>,
    renames: Renames,
}

impl AliasCollector {
    fn collect(&mut self, writer: &Arc<AvroSchema>, reader: &Arc<AvroSchema>) -> Result<(), SchemaError> {
        let writer = self.writer_types.deref_shared(writer)?;
        let reader = self.reader_types.deref_shared(reader)?;

        match (writer.as_ref(), reader.as_ref()) {
            (AvroSchema::Record(w), AvroSchema::Record(r)) => {
                let (w_name, r_name) = (w.fullname(), r.fullname());
                if !self.visited.insert((w_name.clone(), r_name.clone())) {
                    trace!(writer = %w_name, reader = %r_name, "Alias walk revisits record pair");
                    return Ok(());
                }
                self.rename_type(&w_name, &r_name, r.alias_fullnames());

                let mut field_renames = HashMap::new();
                for reader_field in &r.fields {
                    let partner = match w.field(&reader_field.name) {
                        Some((_, wf)) => Some(wf),
                        None => w
                            .fields
                            .iter()
                            .find(|wf| reader_field.aliases.contains(&wf.name)),
                    };
                    let Some(writer_field) = partner else {
                        continue;
                    };
                    // A rename must not collide with another reader field.
                    if writer_field.name != reader_field.name && r.field(&writer_field.name).is_none() {
                        field_renames.insert(reader_field.name.clone(), writer_field.name.clone());
                    }
                    self.collect(&writer_field.schema, &reader_field.schema)?;
                }
                if !field_renames.is_empty() {
                    self.renames.fields.entry(r_name).or_insert(field_renames);
                }
            }
            (AvroSchema::Enum(w), AvroSchema::Enum(r)) => {
                self.rename_type(&w.fullname(), &r.fullname(), r.alias_fullnames());
            }
            (AvroSchema::Fixed(w), AvroSchema::Fixed(r)) => {
                self.rename_type(&w.fullname(), &r.fullname(), r.alias_fullnames());
            }
            (AvroSchema::Array(w), AvroSchema::Array(r)) | (AvroSchema::Map(w), AvroSchema::Map(r)) => {
                self.collect(w, r)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn rename_type(&mut self, writer_name: &str, reader_name: &str, reader_aliases: Vec<String>) {
        if writer_name == reader_name || !reader_aliases.iter().any(|a| a == writer_name) {
            return;
        }
        // The reader already defines the writer's name for something else.
        if self.reader_types.contains(writer_name) {
            trace!(writer = %writer_name, reader = %reader_name, "Alias rename skipped, name taken");
            return;
        }
        trace!(from = %reader_name, to = %writer_name, "Applying reader alias");
        self.renames
            .types
            .entry(reader_name.to_string())
            .or_insert_with(|| writer_name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_record(name: &str, field: &str) -> RecordSchema {
        RecordSchema::new(name, vec![FieldSchema::new(field, AvroSchema::Int)])
    }

    #[test]
    fn test_unrelated_schemas_unchanged() {
        let writer = AvroSchema::Record(int_record("Record", "Field1"));
        let reader = AvroSchema::Record(int_record("Record2", "Field3"));
        assert_eq!(apply_aliases(&writer, &reader).unwrap(), reader);
    }

    #[test]
    fn test_primitive_unchanged() {
        assert_eq!(
            apply_aliases(&AvroSchema::Int, &AvroSchema::Long).unwrap(),
            AvroSchema::Long
        );
    }

    #[test]
    fn test_namespaced_alias_rename_moves_namespace() {
        let writer = AvroSchema::Record(int_record("User", "id").with_namespace("org.old"));
        let reader = AvroSchema::Record(
            int_record("Customer", "id")
                .with_namespace("org.new")
                .with_aliases(["org.old.User"]),
        );

        match apply_aliases(&writer, &reader).unwrap() {
            AvroSchema::Record(r) => {
                assert_eq!(r.fullname(), "org.old.User");
                assert_eq!(r.aliases, vec!["org.old.User".to_string()]);
            }
            other => panic!("Expected Record, got {:?}", other),
        }
    }

    #[test]
    fn test_rename_skipped_when_name_taken() {
        let writer = AvroSchema::Record(RecordSchema::new(
            "Outer",
            vec![FieldSchema::new("a", AvroSchema::Record(int_record("Old", "x")))],
        ));
        let reader = AvroSchema::Record(RecordSchema::new(
            "Outer",
            vec![
                FieldSchema::new("a", AvroSchema::Record(int_record("New", "x").with_aliases(["Old"]))),
                FieldSchema::new("b", AvroSchema::Record(int_record("Old", "y")))
                    .with_default(serde_json::json!({"y": 1})),
            ],
        ));
        assert_eq!(apply_aliases(&writer, &reader).unwrap(), reader);
    }

    #[test]
    fn test_field_rename_does_not_collide() {
        let writer = AvroSchema::Record(int_record("R", "b"));
        let reader = AvroSchema::Record(RecordSchema::new(
            "R",
            vec![
                FieldSchema::new("a", AvroSchema::Int).with_aliases(["b"]),
                FieldSchema::new("b", AvroSchema::Int),
            ],
        ));
        assert_eq!(apply_aliases(&writer, &reader).unwrap(), reader);
    }
}
