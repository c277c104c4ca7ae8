//! Resolution actions and the plan that owns them.
//!
//! A plan is a graph: recursive schemas produce recursive actions, so actions
//! live in an arena and refer to each other through `ActionId`. The graph is
//! immutable once built and can be shared across threads.
//!
//! Actions hold `Arc` handles to the schema nodes they resolve, shared with
//! the writer and effective reader the plan keeps.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::error::DecodeError;
use crate::schema::{AvroSchema, SchemaIncompatibility, TypePromotion};

/// Index of an action inside its `ResolutionPlan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub(crate) usize);

impl ActionId {
    /// Position of the action in the plan's arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One step of a resolution plan: how to turn data written with `writer`
/// into a value of `reader`.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Writer schema at this position, with named references followed.
    pub writer: Arc<AvroSchema>,
    /// Effective reader schema at this position. `None` for `Skip`.
    pub reader: Option<Arc<AvroSchema>>,
    pub kind: ActionKind,
}

/// What a decoder does at one position.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Values are read as written.
    DoNothing,
    /// Read the writer primitive and widen it.
    Promote(TypePromotion),
    Record(RecordAction),
    Enum(EnumAction),
    /// Array items or map values, resolved by the inner action.
    Container(ActionId),
    /// One action per writer branch, in writer branch order.
    WriterUnion(Vec<ActionId>),
    /// The writer value becomes reader union branch `branch`.
    ReaderUnion { branch: usize, action: ActionId },
    /// Consume and discard a writer value.
    Skip,
    /// The pairing cannot be decoded. Raised only if a decoder reaches it.
    Error(SchemaIncompatibility),
}

impl ActionKind {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::DoNothing => "do-nothing",
            ActionKind::Promote(_) => "promote",
            ActionKind::Record(_) => "record",
            ActionKind::Enum(_) => "enum",
            ActionKind::Container(_) => "container",
            ActionKind::WriterUnion(_) => "writer-union",
            ActionKind::ReaderUnion { .. } => "reader-union",
            ActionKind::Skip => "skip",
            ActionKind::Error(_) => "error",
        }
    }

    /// Actions this one refers to directly.
    pub fn children(&self) -> Vec<ActionId> {
        match self {
            ActionKind::Record(record) => record
                .fields
                .iter()
                .filter_map(FieldAction::action)
                .chain(record.skipped.iter().map(|s| s.action))
                .collect(),
            ActionKind::Container(inner) => vec![*inner],
            ActionKind::WriterUnion(branches) => branches.clone(),
            ActionKind::ReaderUnion { action, .. } => vec![*action],
            _ => Vec::new(),
        }
    }

    /// Replace every child id with `map(child)`.
    pub(crate) fn remap_children(&mut self, map: impl Fn(ActionId) -> ActionId) {
        match self {
            ActionKind::Record(record) => {
                for field in &mut record.fields {
                    if let FieldAction::Read { action, .. } = field {
                        *action = map(*action);
                    }
                }
                for skipped in &mut record.skipped {
                    skipped.action = map(skipped.action);
                }
            }
            ActionKind::Container(inner) => *inner = map(*inner),
            ActionKind::WriterUnion(branches) => {
                for branch in branches.iter_mut() {
                    *branch = map(*branch);
                }
            }
            ActionKind::ReaderUnion { action, .. } => *action = map(*action),
            _ => {}
        }
    }
}

/// Field mapping for a record pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordAction {
    /// One entry per reader field, in reader order.
    pub fields: Vec<FieldAction>,
    /// Writer fields the reader does not have, in writer order.
    pub skipped: Vec<SkippedField>,
}

/// How a single reader field is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAction {
    /// The writer supplies the field.
    Read {
        reader_index: usize,
        name: String,
        writer_index: usize,
        action: ActionId,
    },
    /// The writer omits the field; the reader default is used.
    Default {
        reader_index: usize,
        name: String,
        value: Value,
    },
}

impl FieldAction {
    pub fn reader_index(&self) -> usize {
        match self {
            FieldAction::Read { reader_index, .. } | FieldAction::Default { reader_index, .. } => {
                *reader_index
            }
        }
    }

    /// Reader field name.
    pub fn name(&self) -> &str {
        match self {
            FieldAction::Read { name, .. } | FieldAction::Default { name, .. } => name,
        }
    }

    /// Sub-action for a field read from the writer.
    pub fn action(&self) -> Option<ActionId> {
        match self {
            FieldAction::Read { action, .. } => Some(*action),
            FieldAction::Default { .. } => None,
        }
    }
}

/// A writer field with no reader counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedField {
    pub writer_index: usize,
    pub name: String,
    /// Always a `Skip` action.
    pub action: ActionId,
}

/// A record step in writer order, as a decoder consumes the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterStep {
    /// Decode writer field `writer_index` into reader field `reader_index`.
    Read {
        writer_index: usize,
        reader_index: usize,
        action: ActionId,
    },
    /// Decode writer field `writer_index` and drop it.
    Skip { writer_index: usize, action: ActionId },
}

impl WriterStep {
    pub fn writer_index(&self) -> usize {
        match self {
            WriterStep::Read { writer_index, .. } | WriterStep::Skip { writer_index, .. } => {
                *writer_index
            }
        }
    }
}

impl RecordAction {
    /// Steps ordered by writer field position.
    ///
    /// Reader fields filled from defaults do not appear; see
    /// [`RecordAction::defaults`].
    pub fn writer_order(&self) -> Vec<WriterStep> {
        let mut steps: Vec<WriterStep> = self
            .fields
            .iter()
            .filter_map(|field| match field {
                FieldAction::Read {
                    reader_index,
                    writer_index,
                    action,
                    ..
                } => Some(WriterStep::Read {
                    writer_index: *writer_index,
                    reader_index: *reader_index,
                    action: *action,
                }),
                FieldAction::Default { .. } => None,
            })
            .chain(self.skipped.iter().map(|s| WriterStep::Skip {
                writer_index: s.writer_index,
                action: s.action,
            }))
            .collect();
        steps.sort_by_key(WriterStep::writer_index);
        steps
    }

    /// Reader fields populated from defaults.
    pub fn defaults(&self) -> impl Iterator<Item = &FieldAction> {
        self.fields
            .iter()
            .filter(|f| matches!(f, FieldAction::Default { .. }))
    }
}

/// Symbol mapping for an enum pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumAction {
    /// Reader symbol index for each writer symbol index. `None` when the
    /// reader has no such symbol and no usable default.
    pub adjustments: Vec<Option<usize>>,
}

impl EnumAction {
    /// Reader index for writer symbol `writer_index`.
    pub fn reader_index(&self, writer_index: usize) -> Option<usize> {
        self.adjustments.get(writer_index).copied().flatten()
    }

    /// Whether every writer symbol keeps its index.
    pub fn is_identity(&self) -> bool {
        self.adjustments
            .iter()
            .enumerate()
            .all(|(i, adj)| *adj == Some(i))
    }
}

impl Action {
    pub fn is_error(&self) -> bool {
        matches!(self.kind, ActionKind::Error(_))
    }

    /// The incompatibility carried by an `Error` action.
    pub fn error(&self) -> Option<&SchemaIncompatibility> {
        match &self.kind {
            ActionKind::Error(incompatibility) => Some(incompatibility),
            _ => None,
        }
    }

    /// Fail with the recorded incompatibility if this is an `Error` action.
    pub fn check(&self) -> Result<(), DecodeError> {
        match &self.kind {
            ActionKind::Error(incompatibility) => {
                Err(DecodeError::Incompatible(incompatibility.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Map an encoded writer enum index to the reader index.
    ///
    /// # Errors
    /// - `DecodeError::IndexOutOfRange` if the writer enum has no such symbol
    /// - `DecodeError::UnknownSymbol` if the reader cannot represent it
    /// - `DecodeError::UnexpectedAction` if this is not an enum action
    pub fn resolve_symbol(&self, writer_index: usize) -> Result<usize, DecodeError> {
        let (ActionKind::Enum(mapping), AvroSchema::Enum(writer)) = (&self.kind, self.writer.as_ref())
        else {
            return Err(DecodeError::UnexpectedAction {
                expected: "enum",
                found: self.kind.name(),
            });
        };
        let symbol = writer
            .symbols
            .get(writer_index)
            .ok_or(DecodeError::IndexOutOfRange {
                index: writer_index,
                len: writer.symbols.len(),
            })?;
        mapping
            .reader_index(writer_index)
            .ok_or_else(|| DecodeError::UnknownSymbol {
                enum_name: writer.fullname(),
                symbol: symbol.clone(),
            })
    }
}

/// Precomputed plan for decoding writer data as the reader schema.
///
/// Built once per schema pair and reused for every value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionPlan {
    actions: Vec<Action>,
    root: ActionId,
    writer: Arc<AvroSchema>,
    reader: Arc<AvroSchema>,
}

impl ResolutionPlan {
    pub(crate) fn new(
        actions: Vec<Action>,
        root: ActionId,
        writer: Arc<AvroSchema>,
        reader: Arc<AvroSchema>,
    ) -> Self {
        Self {
            actions,
            root,
            writer,
            reader,
        }
    }

    /// Action for the top-level schema pair.
    pub fn root(&self) -> &Action {
        self.action(self.root)
    }

    pub fn root_id(&self) -> ActionId {
        self.root
    }

    /// Look up an action.
    ///
    /// # Panics
    /// If `id` was not produced by this plan.
    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.0]
    }

    /// Look up an action, returning `None` for a foreign id.
    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id.0)
    }

    /// All actions in arena order.
    pub fn actions(&self) -> impl Iterator<Item = (ActionId, &Action)> {
        self.actions.iter().enumerate().map(|(i, a)| (ActionId(i), a))
    }

    /// Number of actions in the arena.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// A plan always holds its root action.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Writer schema the plan was built for.
    pub fn writer(&self) -> &AvroSchema {
        &self.writer
    }

    /// Effective reader schema, after aliases were applied.
    pub fn reader(&self) -> &AvroSchema {
        &self.reader
    }

    /// Actions reachable from the root, each once, in depth-first order.
    pub fn reachable(&self) -> Vec<ActionId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            let mut children = self.action(id).kind.children();
            children.reverse();
            stack.extend(children);
        }
        order
    }

    /// Whether decoding with this plan reproduces the writer data unchanged:
    /// no promotions, reordering, skips, defaults or remapped symbols.
    pub fn is_identity(&self) -> bool {
        self.is_identity_from(self.root, &mut HashSet::new())
    }

    fn is_identity_from(&self, id: ActionId, visited: &mut HashSet<ActionId>) -> bool {
        if !visited.insert(id) {
            return true;
        }
        match &self.action(id).kind {
            ActionKind::DoNothing => true,
            ActionKind::Record(record) => {
                record.skipped.is_empty()
                    && record.fields.iter().all(|field| match field {
                        FieldAction::Read {
                            reader_index,
                            writer_index,
                            action,
                            ..
                        } => reader_index == writer_index && self.is_identity_from(*action, visited),
                        FieldAction::Default { .. } => false,
                    })
            }
            ActionKind::Enum(mapping) => mapping.is_identity(),
            ActionKind::Container(inner) => self.is_identity_from(*inner, visited),
            ActionKind::WriterUnion(branches) => {
                branches
                    .iter()
                    .enumerate()
                    .all(|(i, branch)| match &self.action(*branch).kind {
                        ActionKind::ReaderUnion { branch, action } => {
                            *branch == i && self.is_identity_from(*action, visited)
                        }
                        _ => false,
                    })
            }
            _ => false,
        }
    }

    /// Action for writer union branch `branch` under the union action `id`.
    ///
    /// # Errors
    /// - `DecodeError::IncompatibleBranch` if that branch cannot be read
    /// - `DecodeError::IndexOutOfRange` if the writer union has no such branch
    /// - `DecodeError::UnexpectedAction` if `id` is not a writer union
    pub fn writer_branch(&self, id: ActionId, branch: usize) -> Result<&Action, DecodeError> {
        let action = self.action(id);
        let ActionKind::WriterUnion(branches) = &action.kind else {
            return Err(DecodeError::UnexpectedAction {
                expected: "writer-union",
                found: action.kind.name(),
            });
        };
        let branch_id = branches.get(branch).ok_or(DecodeError::IndexOutOfRange {
            index: branch,
            len: branches.len(),
        })?;
        let branch_action = self.action(*branch_id);
        match &branch_action.kind {
            ActionKind::Error(incompatibility) => Err(DecodeError::IncompatibleBranch {
                branch,
                incompatibility: incompatibility.clone(),
            }),
            _ => Ok(branch_action),
        }
    }
}
