//! Numeric promotions permitted between writer and reader primitives.

use crate::schema::SchemaKind;

/// Type promotions supported by schema resolution.
///
/// Only numeric widening is allowed. `string` and `bytes` are not
/// interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypePromotion {
    /// int → long
    IntToLong,
    /// int → float
    IntToFloat,
    /// int → double
    IntToDouble,
    /// long → float
    LongToFloat,
    /// long → double
    LongToDouble,
    /// float → double
    FloatToDouble,
}

impl TypePromotion {
    /// Look up the promotion from `writer` to `reader`.
    ///
    /// Returns `None` for identical kinds as well as for pairs that cannot be
    /// promoted; callers distinguish the two.
    pub fn between(writer: SchemaKind, reader: SchemaKind) -> Option<Self> {
        match (writer, reader) {
            (SchemaKind::Int, SchemaKind::Long) => Some(TypePromotion::IntToLong),
            (SchemaKind::Int, SchemaKind::Float) => Some(TypePromotion::IntToFloat),
            (SchemaKind::Int, SchemaKind::Double) => Some(TypePromotion::IntToDouble),
            (SchemaKind::Long, SchemaKind::Float) => Some(TypePromotion::LongToFloat),
            (SchemaKind::Long, SchemaKind::Double) => Some(TypePromotion::LongToDouble),
            (SchemaKind::Float, SchemaKind::Double) => Some(TypePromotion::FloatToDouble),
            _ => None,
        }
    }
}
