//! Lock-step walk of writer and reader schemas that builds the action graph.
//!
//! Record pairs are memoized by (writer full name, reader full name). The
//! first visit pushes a placeholder and patches it once the fields are
//! resolved, so a recursive reference becomes an edge back to the
//! placeholder and the walk terminates.
//!
//! While a record is in progress its placeholder counts as a success. If the
//! record then fails, every pair memoized after it started is forgotten and
//! resolved again on its next visit. Actions left behind by failed trials are
//! dropped when the arena is compacted at the end.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::config::ResolverConfig;
use crate::error::{SchemaError, SchemaRole};
use crate::resolver::action::{Action, ActionId, ActionKind, EnumAction, FieldAction, RecordAction, SkippedField};
use crate::schema::{
    AvroSchema, EnumSchema, FieldSchema, FixedSchema, IncompatibilityReason, NamedTypes,
    RecordSchema, SchemaIncompatibility, TypePromotion,
};

type RecordKey = (String, String);

pub(crate) struct Engine<'a> {
    config: &'a ResolverConfig,
    writer_types: NamedTypes,
    reader_types: NamedTypes,
    actions: Vec<Action>,
    records: HashMap<RecordKey, ActionId>,
    /// Memoized record pairs in insertion order.
    memo_log: Vec<RecordKey>,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(
        config: &'a ResolverConfig,
        writer: &Arc<AvroSchema>,
        reader: &Arc<AvroSchema>,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            config,
            writer_types: NamedTypes::build_shared(writer, SchemaRole::Writer)?,
            reader_types: NamedTypes::build_shared(reader, SchemaRole::Reader)?,
            actions: Vec::new(),
            records: HashMap::new(),
            memo_log: Vec::new(),
        })
    }

    /// Resolve the pair and hand back the compacted arena and its root.
    pub(crate) fn run(
        mut self,
        writer: &Arc<AvroSchema>,
        reader: &Arc<AvroSchema>,
    ) -> Result<(Vec<Action>, ActionId), SchemaError> {
        let root = self.resolve(writer, reader, "")?;
        Ok(compact(self.actions, root))
    }

    fn push(&mut self, writer: &Arc<AvroSchema>, reader: Option<&Arc<AvroSchema>>, kind: ActionKind) -> ActionId {
        let id = ActionId(self.actions.len());
        self.actions.push(Action {
            writer: Arc::clone(writer),
            reader: reader.cloned(),
            kind,
        });
        id
    }

    fn error(
        &mut self,
        writer: &Arc<AvroSchema>,
        reader: &Arc<AvroSchema>,
        path: &str,
        reason: IncompatibilityReason,
    ) -> ActionId {
        let incompatibility = SchemaIncompatibility {
            path: path.to_string(),
            reason,
        };
        self.push(writer, Some(reader), ActionKind::Error(incompatibility))
    }

    /// The incompatibility that makes `id` unusable as a record field or a
    /// reader union branch. A record still being resolved counts as usable.
    fn failure(&self, id: ActionId) -> Option<SchemaIncompatibility> {
        match &self.actions[id.0].kind {
            ActionKind::Error(incompatibility) => Some(incompatibility.clone()),
            ActionKind::Container(inner) => self.failure(*inner),
            _ => None,
        }
    }

    fn memoize(&mut self, key: RecordKey, id: ActionId) {
        self.memo_log.push(key.clone());
        self.records.insert(key, id);
    }

    /// Forget the record pairs memoized since `mark`.
    fn forget_since(&mut self, mark: usize) {
        for key in self.memo_log.drain(mark..) {
            trace!(writer = %key.0, reader = %key.1, "Forgetting record resolution");
            self.records.remove(&key);
        }
    }

    fn resolve(
        &mut self,
        writer: &Arc<AvroSchema>,
        reader: &Arc<AvroSchema>,
        path: &str,
    ) -> Result<ActionId, SchemaError> {
        let writer = self.writer_types.deref_shared(writer)?;
        let reader = self.reader_types.deref_shared(reader)?;

        match (writer.as_ref(), reader.as_ref()) {
            (AvroSchema::Union(branches), _) => self.resolve_writer_union(&writer, branches, &reader, path),
            (_, AvroSchema::Union(branches)) => self.resolve_reader_union(&writer, &reader, branches, path),
            (AvroSchema::Record(w), AvroSchema::Record(r)) => {
                self.resolve_record(&writer, w, &reader, r, path)
            }
            (AvroSchema::Enum(w), AvroSchema::Enum(r)) => {
                Ok(self.resolve_enum(&writer, w, &reader, r, path))
            }
            (AvroSchema::Fixed(w), AvroSchema::Fixed(r)) => {
                Ok(self.resolve_fixed(&writer, w, &reader, r, path))
            }
            (AvroSchema::Array(w), AvroSchema::Array(r)) => {
                let items = self.resolve(w, r, &child_path(path, "items"))?;
                Ok(self.push(&writer, Some(&reader), ActionKind::Container(items)))
            }
            (AvroSchema::Map(w), AvroSchema::Map(r)) => {
                let values = self.resolve(w, r, &child_path(path, "values"))?;
                Ok(self.push(&writer, Some(&reader), ActionKind::Container(values)))
            }
            _ => Ok(self.resolve_primitive(&writer, &reader, path)),
        }
    }

    fn resolve_primitive(&mut self, writer: &Arc<AvroSchema>, reader: &Arc<AvroSchema>, path: &str) -> ActionId {
        let kinds = writer.kind().zip(reader.kind());
        match kinds {
            Some((w, r)) if w == r && w.is_primitive() => {
                self.push(writer, Some(reader), ActionKind::DoNothing)
            }
            Some((w, r)) => match TypePromotion::between(w, r) {
                Some(promotion) => self.push(writer, Some(reader), ActionKind::Promote(promotion)),
                None => self.type_mismatch(writer, reader, path),
            },
            None => self.type_mismatch(writer, reader, path),
        }
    }

    fn type_mismatch(&mut self, writer: &Arc<AvroSchema>, reader: &Arc<AvroSchema>, path: &str) -> ActionId {
        let reason = IncompatibilityReason::TypeMismatch {
            writer_type: writer.type_name(),
            reader_type: reader.type_name(),
        };
        self.error(writer, reader, path, reason)
    }

    fn resolve_writer_union(
        &mut self,
        writer: &Arc<AvroSchema>,
        branches: &[Arc<AvroSchema>],
        reader: &Arc<AvroSchema>,
        path: &str,
    ) -> Result<ActionId, SchemaError> {
        let mut actions = Vec::with_capacity(branches.len());
        for (index, branch) in branches.iter().enumerate() {
            let branch_path = child_path(path, &format!("union branch {}", index));
            actions.push(self.resolve(branch, reader, &branch_path)?);
        }
        Ok(self.push(writer, Some(reader), ActionKind::WriterUnion(actions)))
    }

    /// First reader branch that the writer resolves against wins.
    fn resolve_reader_union(
        &mut self,
        writer: &Arc<AvroSchema>,
        reader: &Arc<AvroSchema>,
        branches: &[Arc<AvroSchema>],
        path: &str,
    ) -> Result<ActionId, SchemaError> {
        for (index, branch) in branches.iter().enumerate() {
            let action = self.resolve(writer, branch, path)?;
            if self.failure(action).is_none() {
                trace!(branch = index, writer = %writer.type_name(), "Selected reader union branch");
                return Ok(self.push(
                    writer,
                    Some(reader),
                    ActionKind::ReaderUnion {
                        branch: index,
                        action,
                    },
                ));
            }
        }
        let reason = IncompatibilityReason::NoMatchingBranch {
            writer_type: writer.type_name(),
        };
        Ok(self.error(writer, reader, path, reason))
    }

    fn resolve_record(
        &mut self,
        writer: &Arc<AvroSchema>,
        w: &RecordSchema,
        reader: &Arc<AvroSchema>,
        r: &RecordSchema,
        path: &str,
    ) -> Result<ActionId, SchemaError> {
        let key = (w.fullname(), r.fullname());
        if let Some(&id) = self.records.get(&key) {
            trace!(writer = %key.0, reader = %key.1, "Reusing record resolution");
            return Ok(id);
        }

        if !self.record_names_match(w, r) {
            let reason = IncompatibilityReason::NameMismatch {
                writer_name: key.0.clone(),
                reader_name: key.1.clone(),
            };
            let id = self.error(writer, reader, path, reason);
            self.memoize(key, id);
            return Ok(id);
        }

        // Patched below; recursive references see this id.
        let id = self.push(writer, Some(reader), ActionKind::DoNothing);
        self.memoize(key, id);
        let mark = self.memo_log.len();
        let kind = self.resolve_fields(w, r, path)?;
        if matches!(kind, ActionKind::Error(_)) {
            // Pairs memoized since `mark` may have relied on the placeholder.
            self.forget_since(mark);
        }
        self.actions[id.0].kind = kind;
        Ok(id)
    }

    fn resolve_fields(
        &mut self,
        w: &RecordSchema,
        r: &RecordSchema,
        path: &str,
    ) -> Result<ActionKind, SchemaError> {
        let mut claimed = vec![false; w.fields.len()];
        let mut fields = Vec::with_capacity(r.fields.len());

        for (reader_index, reader_field) in r.fields.iter().enumerate() {
            let field_path = child_path(path, &format!("field '{}'", reader_field.name));
            match self.writer_field_for(w, reader_field, &claimed) {
                Some(writer_index) => {
                    claimed[writer_index] = true;
                    let writer_field = &w.fields[writer_index];
                    let action = self.resolve(&writer_field.schema, &reader_field.schema, &field_path)?;
                    // A field cannot be stepped over, so its failure is the record's.
                    if let Some(incompatibility) = self.failure(action) {
                        return Ok(ActionKind::Error(incompatibility));
                    }
                    fields.push(FieldAction::Read {
                        reader_index,
                        name: reader_field.name.clone(),
                        writer_index,
                        action,
                    });
                }
                None => match &reader_field.default {
                    Some(value) => fields.push(FieldAction::Default {
                        reader_index,
                        name: reader_field.name.clone(),
                        value: value.clone(),
                    }),
                    None => {
                        return Ok(ActionKind::Error(SchemaIncompatibility {
                            path: field_path,
                            reason: IncompatibilityReason::MissingRequiredField {
                                field_name: reader_field.name.clone(),
                            },
                        }));
                    }
                },
            }
        }

        let mut skipped = Vec::new();
        for (writer_index, writer_field) in w.fields.iter().enumerate() {
            if claimed[writer_index] {
                continue;
            }
            let schema = self.writer_types.deref_shared(&writer_field.schema)?;
            let action = self.push(&schema, None, ActionKind::Skip);
            skipped.push(SkippedField {
                writer_index,
                name: writer_field.name.clone(),
                action,
            });
        }

        Ok(ActionKind::Record(RecordAction { fields, skipped }))
    }

    /// Writer field feeding `reader_field`: same name first, then the reader
    /// field's aliases in declared order. Each writer field feeds at most one
    /// reader field.
    fn writer_field_for(
        &self,
        w: &RecordSchema,
        reader_field: &FieldSchema,
        claimed: &[bool],
    ) -> Option<usize> {
        let unclaimed = |name: &str| {
            w.fields
                .iter()
                .position(|f| f.name == name)
                .filter(|&i| !claimed[i])
        };
        unclaimed(reader_field.name.as_str()).or_else(|| {
            if !self.config.apply_aliases {
                return None;
            }
            reader_field.aliases.iter().find_map(|alias| unclaimed(alias.as_str()))
        })
    }

    fn record_names_match(&self, w: &RecordSchema, r: &RecordSchema) -> bool {
        let (w_name, r_name) = (w.fullname(), r.fullname());
        w_name == r_name
            || (self.config.apply_aliases
                && (r.alias_fullnames().contains(&w_name) || w.alias_fullnames().contains(&r_name)))
    }

    fn named_match(&self, writer_name: &str, reader_name: &str, reader_aliases: Vec<String>) -> bool {
        writer_name == reader_name
            || (self.config.apply_aliases && reader_aliases.iter().any(|a| a == writer_name))
    }

    fn resolve_enum(
        &mut self,
        writer: &Arc<AvroSchema>,
        w: &EnumSchema,
        reader: &Arc<AvroSchema>,
        r: &EnumSchema,
        path: &str,
    ) -> ActionId {
        let (w_name, r_name) = (w.fullname(), r.fullname());
        if !self.named_match(&w_name, &r_name, r.alias_fullnames()) {
            let reason = IncompatibilityReason::NameMismatch {
                writer_name: w_name,
                reader_name: r_name,
            };
            return self.error(writer, reader, path, reason);
        }

        let fallback = if self.config.use_enum_default {
            r.default.as_deref().and_then(|d| r.symbol_index(d))
        } else {
            None
        };
        let adjustments = w
            .symbols
            .iter()
            .map(|symbol| r.symbol_index(symbol).or(fallback))
            .collect();
        self.push(writer, Some(reader), ActionKind::Enum(EnumAction { adjustments }))
    }

    fn resolve_fixed(
        &mut self,
        writer: &Arc<AvroSchema>,
        w: &FixedSchema,
        reader: &Arc<AvroSchema>,
        r: &FixedSchema,
        path: &str,
    ) -> ActionId {
        let (w_name, r_name) = (w.fullname(), r.fullname());
        if !self.named_match(&w_name, &r_name, r.alias_fullnames()) {
            let reason = IncompatibilityReason::NameMismatch {
                writer_name: w_name,
                reader_name: r_name,
            };
            return self.error(writer, reader, path, reason);
        }
        if w.size != r.size {
            let reason = IncompatibilityReason::FixedSizeMismatch {
                writer_size: w.size,
                reader_size: r.size,
            };
            return self.error(writer, reader, path, reason);
        }
        self.push(writer, Some(reader), ActionKind::DoNothing)
    }
}

/// Keep only the actions reachable from `root`, renumbered in depth-first
/// order with the root first.
fn compact(actions: Vec<Action>, root: ActionId) -> (Vec<Action>, ActionId) {
    let mut order = Vec::new();
    let mut renumbered = HashMap::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if renumbered.contains_key(&id) {
            continue;
        }
        renumbered.insert(id, ActionId(order.len()));
        order.push(id);
        let mut children = actions[id.0].kind.children();
        children.reverse();
        stack.extend(children);
    }
    if order.len() < actions.len() {
        trace!(dropped = actions.len() - order.len(), "Dropping unreachable actions");
    }

    let mut slots: Vec<Option<Action>> = actions.into_iter().map(Some).collect();
    let compacted = order
        .iter()
        .filter_map(|id| slots[id.0].take())
        .map(|mut action| {
            action.kind.remap_children(|child| renumbered[&child]);
            action
        })
        .collect();
    (compacted, ActionId(0))
}

fn child_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", path, segment)
    }
}
