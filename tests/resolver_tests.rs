//! Tests for building resolution plans.

use std::sync::Arc;
use std::thread;

use avro_resolver::error::{DecodeError, SchemaError, SchemaRole};
use avro_resolver::resolver::*;
use avro_resolver::schema::*;
use avro_resolver::ResolverConfig;
use serde_json::json;

fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn root_kind(writer: &AvroSchema, reader: &AvroSchema) -> ActionKind {
    resolve(writer, reader).unwrap().root().kind.clone()
}

fn record_action(plan: &ResolutionPlan) -> &RecordAction {
    match &plan.root().kind {
        ActionKind::Record(record) => record,
        other => panic!("Expected Record action, got {:?}", other),
    }
}

// ============================================================================
// Primitives and Promotion
// ============================================================================

#[test]
fn test_same_primitive_does_nothing() {
    for schema in [
        AvroSchema::Null,
        AvroSchema::Boolean,
        AvroSchema::Int,
        AvroSchema::Long,
        AvroSchema::Float,
        AvroSchema::Double,
        AvroSchema::Bytes,
        AvroSchema::String,
    ] {
        assert_eq!(root_kind(&schema, &schema), ActionKind::DoNothing, "{:?}", schema);
    }
}

#[test]
fn test_numeric_promotions() {
    assert_eq!(
        root_kind(&AvroSchema::Int, &AvroSchema::Long),
        ActionKind::Promote(TypePromotion::IntToLong)
    );
    assert_eq!(
        root_kind(&AvroSchema::Int, &AvroSchema::Float),
        ActionKind::Promote(TypePromotion::IntToFloat)
    );
    assert_eq!(
        root_kind(&AvroSchema::Long, &AvroSchema::Double),
        ActionKind::Promote(TypePromotion::LongToDouble)
    );
    assert_eq!(
        root_kind(&AvroSchema::Float, &AvroSchema::Double),
        ActionKind::Promote(TypePromotion::FloatToDouble)
    );
}

#[test]
fn test_string_and_bytes_are_errors() {
    let plan = resolve(&AvroSchema::String, &AvroSchema::Bytes).unwrap();
    assert!(plan.root().is_error());

    let plan = resolve(&AvroSchema::Bytes, &AvroSchema::String).unwrap();
    assert!(plan.root().is_error());
}

#[test]
fn test_demotion_is_error() {
    let plan = resolve(&AvroSchema::Long, &AvroSchema::Int).unwrap();
    let incompatibility = plan.root().error().unwrap();
    assert_eq!(
        incompatibility.reason,
        IncompatibilityReason::TypeMismatch {
            writer_type: "long".to_string(),
            reader_type: "int".to_string(),
        }
    );
    assert_eq!(
        plan.root().check(),
        Err(DecodeError::Incompatible(incompatibility.clone()))
    );
}

#[test]
fn test_record_against_primitive_is_error() {
    let writer = AvroSchema::Record(RecordSchema::new("R", vec![]));
    assert!(resolve(&writer, &AvroSchema::Int).unwrap().root().is_error());
    assert!(resolve(&AvroSchema::Int, &writer).unwrap().root().is_error());
}

// ============================================================================
// Enums
// ============================================================================

#[test]
fn test_enum_symbol_mapping_is_case_sensitive() {
    let writer = AvroSchema::Enum(EnumSchema::new("E", symbols(&["Value1", "Value2", "value3"])));
    let reader = AvroSchema::Enum(EnumSchema::new("E", symbols(&["Value1", "value2", "value5"])));

    let plan = resolve(&writer, &reader).unwrap();
    match &plan.root().kind {
        ActionKind::Enum(mapping) => {
            assert_eq!(mapping.adjustments, vec![Some(0), None, None]);
        }
        other => panic!("Expected Enum action, got {:?}", other),
    }

    assert_eq!(plan.root().resolve_symbol(0), Ok(0));
    assert_eq!(
        plan.root().resolve_symbol(1),
        Err(DecodeError::UnknownSymbol {
            enum_name: "E".to_string(),
            symbol: "Value2".to_string(),
        })
    );
}

#[test]
fn test_enum_reorders_symbols() {
    let writer = AvroSchema::Enum(EnumSchema::new("Suit", symbols(&["SPADES", "HEARTS"])));
    let reader = AvroSchema::Enum(EnumSchema::new("Suit", symbols(&["HEARTS", "CLUBS", "SPADES"])));

    let plan = resolve(&writer, &reader).unwrap();
    assert_eq!(plan.root().resolve_symbol(0), Ok(2));
    assert_eq!(plan.root().resolve_symbol(1), Ok(0));
    assert!(!plan.is_identity());
}

#[test]
fn test_enum_default_symbol() {
    let writer = AvroSchema::Enum(EnumSchema::new("Suit", symbols(&["HEARTS", "JOKER"])));
    let reader = AvroSchema::Enum(
        EnumSchema::new("Suit", symbols(&["UNKNOWN", "HEARTS"])).with_default("UNKNOWN"),
    );

    let plan = resolve(&writer, &reader).unwrap();
    assert_eq!(plan.root().resolve_symbol(1), Ok(0));

    let strict = Resolver::new(ResolverConfig::new().with_use_enum_default(false));
    let plan = strict.resolve(&writer, &reader).unwrap();
    assert!(matches!(
        plan.root().resolve_symbol(1),
        Err(DecodeError::UnknownSymbol { .. })
    ));
}

#[test]
fn test_enum_name_mismatch() {
    let writer = AvroSchema::Enum(EnumSchema::new("A", symbols(&["X"])));
    let reader = AvroSchema::Enum(EnumSchema::new("B", symbols(&["X"])));

    let plan = resolve(&writer, &reader).unwrap();
    assert!(matches!(
        plan.root().error().map(|e| &e.reason),
        Some(IncompatibilityReason::NameMismatch { .. })
    ));
}

// ============================================================================
// Fixed
// ============================================================================

#[test]
fn test_fixed_resolution() {
    let ten = AvroSchema::Fixed(FixedSchema::new("F", 10));
    let eight = AvroSchema::Fixed(FixedSchema::new("F", 8));
    let other = AvroSchema::Fixed(FixedSchema::new("G", 10));

    assert_eq!(root_kind(&ten, &ten), ActionKind::DoNothing);
    assert!(resolve(&ten, &eight).unwrap().root().is_error());
    assert!(resolve(&ten, &other).unwrap().root().is_error());
}

#[test]
fn test_fixed_alias_same_size_matches() {
    let writer = AvroSchema::Fixed(FixedSchema::new("Old", 4));
    let reader = AvroSchema::Fixed(FixedSchema::new("New", 4).with_aliases(["Old"]));
    assert_eq!(root_kind(&writer, &reader), ActionKind::DoNothing);

    let reader = AvroSchema::Fixed(FixedSchema::new("New", 6).with_aliases(["Old"]));
    let plan = resolve(&writer, &reader).unwrap();
    assert_eq!(
        plan.root().error().map(|e| e.reason.clone()),
        Some(IncompatibilityReason::FixedSizeMismatch {
            writer_size: 4,
            reader_size: 6,
        })
    );
}

// ============================================================================
// Containers
// ============================================================================

#[test]
fn test_array_of_boolean_vs_string_wraps_error() {
    let plan = resolve(
        &AvroSchema::array(AvroSchema::Boolean),
        &AvroSchema::array(AvroSchema::String),
    )
    .unwrap();

    match &plan.root().kind {
        ActionKind::Container(items) => {
            let items = plan.action(*items);
            assert!(items.is_error());
            assert_eq!(items.error().unwrap().path, "items");
        }
        other => panic!("Expected Container action, got {:?}", other),
    }
}

#[test]
fn test_map_values_promoted() {
    let plan = resolve(&AvroSchema::map(AvroSchema::Int), &AvroSchema::map(AvroSchema::Double)).unwrap();
    match &plan.root().kind {
        ActionKind::Container(values) => assert_eq!(
            plan.action(*values).kind,
            ActionKind::Promote(TypePromotion::IntToDouble)
        ),
        other => panic!("Expected Container action, got {:?}", other),
    }
}

#[test]
fn test_array_against_map_is_error() {
    let plan = resolve(&AvroSchema::array(AvroSchema::Int), &AvroSchema::map(AvroSchema::Int)).unwrap();
    assert!(plan.root().is_error());
}

// ============================================================================
// Unions
// ============================================================================

fn parts_union() -> AvroSchema {
    AvroSchema::union(vec![
        AvroSchema::Fixed(FixedSchema::new("Part1", 5)),
        AvroSchema::Fixed(FixedSchema::new("Part2", 3)),
    ])
}

#[test]
fn test_writer_union_defers_branch_errors() {
    let reader = AvroSchema::Fixed(FixedSchema::new("Part3", 5).with_aliases(["Part1"]));
    let plan = resolve(&parts_union(), &reader).unwrap();

    let ActionKind::WriterUnion(branches) = &plan.root().kind else {
        panic!("Expected WriterUnion, got {:?}", plan.root().kind);
    };
    assert_eq!(branches.len(), 2);
    assert_eq!(plan.action(branches[0]).kind, ActionKind::DoNothing);
    assert!(plan.action(branches[1]).is_error());

    assert!(plan.writer_branch(plan.root_id(), 0).is_ok());
    assert!(matches!(
        plan.writer_branch(plan.root_id(), 1),
        Err(DecodeError::IncompatibleBranch { branch: 1, .. })
    ));
}

#[test]
fn test_reader_union_selects_matching_branch() {
    let writer = AvroSchema::Fixed(FixedSchema::new("Part1", 5));
    let plan = resolve(&writer, &parts_union()).unwrap();

    match &plan.root().kind {
        ActionKind::ReaderUnion { branch, action } => {
            assert_eq!(*branch, 0);
            assert_eq!(plan.action(*action).kind, ActionKind::DoNothing);
        }
        other => panic!("Expected ReaderUnion, got {:?}", other),
    }
}

#[test]
fn test_reader_union_first_match_wins() {
    let reader = AvroSchema::union(vec![AvroSchema::Double, AvroSchema::Long, AvroSchema::Int]);
    match root_kind(&AvroSchema::Int, &reader) {
        ActionKind::ReaderUnion { branch, .. } => assert_eq!(branch, 0),
        other => panic!("Expected ReaderUnion, got {:?}", other),
    }
}

#[test]
fn test_reader_union_without_match_is_error() {
    let reader = AvroSchema::union(vec![AvroSchema::Null, AvroSchema::Int]);
    let plan = resolve(&AvroSchema::String, &reader).unwrap();

    assert!(matches!(
        plan.root().error().map(|e| &e.reason),
        Some(IncompatibilityReason::NoMatchingBranch { .. })
    ));
}

#[test]
fn test_reader_union_skips_container_with_error() {
    let reader = AvroSchema::union(vec![
        AvroSchema::array(AvroSchema::String),
        AvroSchema::array(AvroSchema::Long),
    ]);
    match root_kind(&AvroSchema::array(AvroSchema::Int), &reader) {
        ActionKind::ReaderUnion { branch, .. } => assert_eq!(branch, 1),
        other => panic!("Expected ReaderUnion, got {:?}", other),
    }
}

#[test]
fn test_union_against_union() {
    let writer = AvroSchema::union(vec![AvroSchema::Null, AvroSchema::Int, AvroSchema::Boolean]);
    let reader = AvroSchema::union(vec![AvroSchema::Long, AvroSchema::Null]);
    let plan = resolve(&writer, &reader).unwrap();

    let ActionKind::WriterUnion(branches) = &plan.root().kind else {
        panic!("Expected WriterUnion, got {:?}", plan.root().kind);
    };
    assert!(matches!(
        plan.action(branches[0]).kind,
        ActionKind::ReaderUnion { branch: 1, .. }
    ));
    assert!(matches!(
        plan.action(branches[1]).kind,
        ActionKind::ReaderUnion { branch: 0, .. }
    ));
    assert!(plan.action(branches[2]).is_error());
}

#[test]
fn test_reader_union_matches_record_through_alias() {
    let writer = AvroSchema::Record(RecordSchema::new(
        "OldUser",
        vec![FieldSchema::new("id", AvroSchema::Int)],
    ));
    let reader = AvroSchema::union(vec![
        AvroSchema::Null,
        AvroSchema::Record(
            RecordSchema::new("User", vec![FieldSchema::new("id", AvroSchema::Long)])
                .with_aliases(["OldUser"]),
        ),
    ]);

    match root_kind(&writer, &reader) {
        ActionKind::ReaderUnion { branch, .. } => assert_eq!(branch, 1),
        other => panic!("Expected ReaderUnion, got {:?}", other),
    }

    let exact = Resolver::new(ResolverConfig::new().with_apply_aliases(false));
    assert!(exact.resolve(&writer, &reader).unwrap().root().is_error());
}

// ============================================================================
// Records
// ============================================================================

#[test]
fn test_record_reorder_default_and_skip() {
    let writer = AvroSchema::Record(RecordSchema::new(
        "User",
        vec![
            FieldSchema::new("id", AvroSchema::Int),
            FieldSchema::new("legacy", AvroSchema::array(AvroSchema::String)),
            FieldSchema::new("name", AvroSchema::String),
        ],
    ));
    let reader = AvroSchema::Record(RecordSchema::new(
        "User",
        vec![
            FieldSchema::new("name", AvroSchema::String),
            FieldSchema::new("id", AvroSchema::Long),
            FieldSchema::new("active", AvroSchema::Boolean).with_default(json!(true)),
        ],
    ));

    let plan = resolve(&writer, &reader).unwrap();
    let record = record_action(&plan);

    assert!(matches!(
        record.fields[0],
        FieldAction::Read { reader_index: 0, writer_index: 2, .. }
    ));
    match &record.fields[1] {
        FieldAction::Read { writer_index, action, .. } => {
            assert_eq!(*writer_index, 0);
            assert_eq!(
                plan.action(*action).kind,
                ActionKind::Promote(TypePromotion::IntToLong)
            );
        }
        other => panic!("Expected Read, got {:?}", other),
    }
    assert_eq!(
        record.fields[2],
        FieldAction::Default {
            reader_index: 2,
            name: "active".to_string(),
            value: json!(true),
        }
    );

    assert_eq!(record.skipped.len(), 1);
    assert_eq!(record.skipped[0].writer_index, 1);
    assert_eq!(record.skipped[0].name, "legacy");
    let skip = plan.action(record.skipped[0].action);
    assert_eq!(skip.kind, ActionKind::Skip);
    assert!(skip.reader.is_none());

    let order: Vec<usize> = record.writer_order().iter().map(WriterStep::writer_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert!(!plan.is_identity());
}

#[test]
fn test_record_missing_field_without_default() {
    let writer = AvroSchema::Record(RecordSchema::new("R", vec![]));
    let reader = AvroSchema::Record(RecordSchema::new(
        "R",
        vec![FieldSchema::new("required", AvroSchema::Int)],
    ));

    let plan = resolve(&writer, &reader).unwrap();
    assert_eq!(
        plan.root().error().map(|e| e.reason.clone()),
        Some(IncompatibilityReason::MissingRequiredField {
            field_name: "required".to_string(),
        })
    );
}

#[test]
fn test_record_field_error_fails_record() {
    let writer = AvroSchema::Record(RecordSchema::new(
        "R",
        vec![
            FieldSchema::new("ok", AvroSchema::Int),
            FieldSchema::new("bad", AvroSchema::String),
        ],
    ));
    let reader = AvroSchema::Record(RecordSchema::new(
        "R",
        vec![
            FieldSchema::new("ok", AvroSchema::Int),
            FieldSchema::new("bad", AvroSchema::Int),
        ],
    ));

    let plan = resolve(&writer, &reader).unwrap();
    let incompatibility = plan.root().error().unwrap();
    assert_eq!(incompatibility.path, "field 'bad'");
}

#[test]
fn test_record_field_with_deferred_union_error_does_not_fail_record() {
    let writer = AvroSchema::Record(RecordSchema::new(
        "R",
        vec![FieldSchema::new(
            "value",
            AvroSchema::union(vec![AvroSchema::Int, AvroSchema::String]),
        )],
    ));
    let reader = AvroSchema::Record(RecordSchema::new(
        "R",
        vec![FieldSchema::new("value", AvroSchema::Long)],
    ));

    let plan = resolve(&writer, &reader).unwrap();
    assert!(!plan.root().is_error());
    assert!(!check_compatibility(&writer, &reader).unwrap().is_compatible);
}

#[test]
fn test_record_field_alias() {
    let writer = AvroSchema::Record(RecordSchema::new(
        "R",
        vec![FieldSchema::new("old", AvroSchema::Int)],
    ));
    let reader = AvroSchema::Record(RecordSchema::new(
        "R",
        vec![FieldSchema::new("new", AvroSchema::Int).with_aliases(["old"])],
    ));

    let plan = resolve(&writer, &reader).unwrap();
    let record = record_action(&plan);
    assert!(matches!(record.fields[0], FieldAction::Read { writer_index: 0, .. }));
    assert!(record.skipped.is_empty());

    let exact = Resolver::new(ResolverConfig::new().with_apply_aliases(false));
    assert!(exact.resolve(&writer, &reader).unwrap().root().is_error());
}

#[test]
fn test_record_name_matches_writer_alias() {
    let writer = AvroSchema::Record(RecordSchema::new("Old", vec![]).with_aliases(["New"]));
    let reader = AvroSchema::Record(RecordSchema::new("New", vec![]));

    assert!(matches!(root_kind(&writer, &reader), ActionKind::Record(_)));
}

#[test]
fn test_record_name_mismatch() {
    let writer = AvroSchema::Record(RecordSchema::new("A", vec![]));
    let reader = AvroSchema::Record(RecordSchema::new("B", vec![]));

    let plan = resolve(&writer, &reader).unwrap();
    assert_eq!(
        plan.root().error().map(|e| e.reason.clone()),
        Some(IncompatibilityReason::NameMismatch {
            writer_name: "A".to_string(),
            reader_name: "B".to_string(),
        })
    );
}

#[test]
fn test_plan_reader_is_effective_reader() {
    let writer = AvroSchema::Record(RecordSchema::new("Old", vec![]));
    let reader = AvroSchema::Record(RecordSchema::new("New", vec![]).with_aliases(["Old"]));

    let plan = resolve(&writer, &reader).unwrap();
    assert_eq!(plan.writer(), &writer);
    assert_eq!(plan.reader().name(), Some("Old"));
}

// ============================================================================
// Identity
// ============================================================================

fn md5() -> AvroSchema {
    AvroSchema::Fixed(FixedSchema::new("MD5", 16).with_namespace("org.apache.avro.ipc"))
}

fn handshake_request() -> AvroSchema {
    AvroSchema::Record(
        RecordSchema::new(
            "HandshakeRequest",
            vec![
                FieldSchema::new("clientHash", md5()),
                FieldSchema::new(
                    "clientProtocol",
                    AvroSchema::union(vec![AvroSchema::Null, AvroSchema::String]),
                ),
                FieldSchema::new("serverHash", AvroSchema::named("org.apache.avro.ipc.MD5")),
                FieldSchema::new(
                    "meta",
                    AvroSchema::union(vec![AvroSchema::Null, AvroSchema::map(AvroSchema::Bytes)]),
                ),
            ],
        )
        .with_namespace("org.apache.avro.ipc"),
    )
}

#[test]
fn test_identical_records_resolve_to_identity() {
    let plan = resolve(&handshake_request(), &handshake_request()).unwrap();

    let record = record_action(&plan);
    assert_eq!(record.fields.len(), 4);
    assert!(record.skipped.is_empty());
    assert!(plan.is_identity());
    assert!(check_compatibility(&handshake_request(), &handshake_request())
        .unwrap()
        .is_compatible);
}

#[test]
fn test_identical_union_is_identity() {
    let schema = AvroSchema::union(vec![AvroSchema::Null, AvroSchema::Long, md5()]);
    let plan = resolve(&schema, &schema).unwrap();
    assert!(plan.is_identity());
}

#[test]
fn test_promotion_is_not_identity() {
    let plan = resolve(&AvroSchema::Int, &AvroSchema::Long).unwrap();
    assert!(!plan.is_identity());
}

// ============================================================================
// Recursion
// ============================================================================

fn linked_list(value: AvroSchema) -> AvroSchema {
    AvroSchema::Record(RecordSchema::new(
        "LinkedList",
        vec![
            FieldSchema::new("value", value),
            FieldSchema::new(
                "next",
                AvroSchema::union(vec![AvroSchema::Null, AvroSchema::named("LinkedList")]),
            ),
        ],
    ))
}

#[test]
fn test_recursive_record_forms_cycle() {
    let plan = resolve(&linked_list(AvroSchema::Int), &linked_list(AvroSchema::Long)).unwrap();

    let record = record_action(&plan);
    let FieldAction::Read { action: next, .. } = &record.fields[1] else {
        panic!("Expected Read for 'next'");
    };
    let ActionKind::WriterUnion(branches) = &plan.action(*next).kind else {
        panic!("Expected WriterUnion, got {:?}", plan.action(*next).kind);
    };
    let ActionKind::ReaderUnion { branch, action } = &plan.action(branches[1]).kind else {
        panic!("Expected ReaderUnion, got {:?}", plan.action(branches[1]).kind);
    };
    assert_eq!(*branch, 1);
    assert_eq!(*action, plan.root_id());

    assert!(plan.reachable().len() <= plan.len());
    assert!(!plan.is_identity());
    assert!(check_compatibility(&linked_list(AvroSchema::Int), &linked_list(AvroSchema::Long))
        .unwrap()
        .is_compatible);
}

#[test]
fn test_direct_self_reference_terminates() {
    let schema = AvroSchema::Record(RecordSchema::new(
        "Node",
        vec![
            FieldSchema::new("label", AvroSchema::String),
            FieldSchema::new("children", AvroSchema::array(AvroSchema::named("Node"))),
            FieldSchema::new("index", AvroSchema::map(AvroSchema::named("Node"))),
        ],
    ));

    let plan = resolve(&schema, &schema).unwrap();
    assert!(plan.is_identity());
    assert!(plan.len() < 10);
}

#[test]
fn test_mutually_recursive_records() {
    let schema = AvroSchema::Record(RecordSchema::new(
        "Ping",
        vec![FieldSchema::new(
            "pong",
            AvroSchema::union(vec![
                AvroSchema::Null,
                AvroSchema::Record(RecordSchema::new(
                    "Pong",
                    vec![FieldSchema::new(
                        "ping",
                        AvroSchema::union(vec![AvroSchema::Null, AvroSchema::named("Ping")]),
                    )],
                )),
            ]),
        )],
    ));

    let plan = resolve(&schema, &schema).unwrap();
    assert!(plan.is_identity());
}

/// Writer `Root{a: A{b: B{a: A}, x: int}, b: B}` against a reader whose `a`
/// is a union of an `A` with `x: string` and an `A2` that aliases `A`. Root
/// fields are laid out in `order`.
fn failing_cycle_pair(order: [&str; 2]) -> (AvroSchema, AvroSchema) {
    let writer_a = AvroSchema::Record(RecordSchema::new(
        "A",
        vec![
            FieldSchema::new(
                "b",
                AvroSchema::Record(RecordSchema::new(
                    "B",
                    vec![FieldSchema::new("a", AvroSchema::named("A"))],
                )),
            ),
            FieldSchema::new("x", AvroSchema::Int),
        ],
    ));
    let reader_a = AvroSchema::union(vec![
        AvroSchema::Record(RecordSchema::new(
            "A",
            vec![
                FieldSchema::new(
                    "b",
                    AvroSchema::Record(RecordSchema::new(
                        "B",
                        vec![FieldSchema::new(
                            "a",
                            AvroSchema::union(vec![AvroSchema::Null, AvroSchema::named("A")]),
                        )],
                    )),
                ),
                FieldSchema::new("x", AvroSchema::String),
            ],
        )),
        AvroSchema::Record(
            RecordSchema::new("A2", vec![FieldSchema::new("x", AvroSchema::Int)]).with_aliases(["A"]),
        ),
    ]);

    let root = |a: &AvroSchema| {
        let fields = order
            .iter()
            .map(|name| match *name {
                "a" => FieldSchema::new("a", a.clone()),
                _ => FieldSchema::new("b", AvroSchema::named("B")),
            })
            .collect();
        AvroSchema::Record(RecordSchema::new("Root", fields))
    };
    (root(&writer_a), root(&reader_a))
}

#[test]
fn test_failed_recursive_trial_is_not_reused() {
    let (writer, reader) = failing_cycle_pair(["a", "b"]);
    let plan = resolve(&writer, &reader).unwrap();

    // B/B first resolved inside the failed A/A trial; reached again through
    // `b`, it must see that A/A is an error.
    let incompatibility = plan.root().error().unwrap();
    assert_eq!(incompatibility.path, "field 'b'.field 'a'");
    assert!(matches!(
        incompatibility.reason,
        IncompatibilityReason::NoMatchingBranch { .. }
    ));
    assert!(!check_compatibility(&writer, &reader).unwrap().is_compatible);
}

#[test]
fn test_recursive_failure_independent_of_field_order() {
    let (writer, reader) = failing_cycle_pair(["a", "b"]);
    let first = resolve(&writer, &reader).unwrap();
    let (writer, reader) = failing_cycle_pair(["b", "a"]);
    let second = resolve(&writer, &reader).unwrap();

    assert!(first.root().is_error());
    assert!(second.root().is_error());
    assert_eq!(first.root().error(), second.root().error());
}

#[test]
fn test_failed_trials_leave_no_unreachable_actions() {
    let (writer, reader) = failing_cycle_pair(["a", "b"]);
    let plan = resolve(&writer, &reader).unwrap();
    assert_eq!(plan.reachable().len(), plan.len());

    let plan = resolve(&linked_list(AvroSchema::Int), &linked_list(AvroSchema::Long)).unwrap();
    assert_eq!(plan.reachable().len(), plan.len());
}

// ============================================================================
// Schema Sharing
// ============================================================================

#[test]
fn test_actions_share_schema_nodes() {
    let writer = AvroSchema::Record(RecordSchema::new(
        "Outer",
        vec![FieldSchema::new(
            "inner",
            AvroSchema::Record(RecordSchema::new(
                "Inner",
                vec![FieldSchema::new("x", AvroSchema::Int)],
            )),
        )],
    ));
    let plan = resolve(&writer, &writer).unwrap();
    assert!(std::ptr::eq(plan.root().writer.as_ref(), plan.writer()));

    let AvroSchema::Record(outer) = plan.writer() else {
        panic!("Expected record writer");
    };
    let FieldAction::Read { action, .. } = &record_action(&plan).fields[0] else {
        panic!("Expected Read for 'inner'");
    };
    assert!(Arc::ptr_eq(&plan.action(*action).writer, &outer.fields[0].schema));
    assert!(Arc::ptr_eq(
        plan.action(*action).reader.as_ref().unwrap(),
        &outer_field(plan.reader(), 0)
    ));
}

fn outer_field(schema: &AvroSchema, index: usize) -> Arc<AvroSchema> {
    match schema {
        AvroSchema::Record(record) => Arc::clone(&record.fields[index].schema),
        other => panic!("Expected Record, got {:?}", other),
    }
}

#[test]
fn test_deep_nesting_plan_is_linear() {
    let depth = 200;
    let mut schema = AvroSchema::Record(RecordSchema::new(
        format!("Level{}", depth),
        vec![FieldSchema::new("x", AvroSchema::Int)],
    ));
    for level in (0..depth).rev() {
        schema = AvroSchema::Record(RecordSchema::new(
            format!("Level{}", level),
            vec![FieldSchema::new("child", schema)],
        ));
    }

    let plan = resolve(&schema, &schema).unwrap();
    // One action per record plus the innermost int.
    assert_eq!(plan.len(), depth + 2);
    assert!(plan.is_identity());

    // The innermost int action points into the caller's schema tree.
    let AvroSchema::Record(top) = &schema else {
        panic!("Expected record");
    };
    let mut field = &top.fields[0].schema;
    while let AvroSchema::Record(record) = field.as_ref() {
        field = &record.fields[0].schema;
    }
    let int_action = plan
        .actions()
        .map(|(_, action)| action)
        .find(|action| action.kind == ActionKind::DoNothing)
        .unwrap();
    assert!(Arc::ptr_eq(&int_action.writer, field));
}

// ============================================================================
// Fatal Errors
// ============================================================================

#[test]
fn test_missing_writer_is_fatal() {
    let result = resolve(&AvroSchema::named("Absent"), &AvroSchema::Int);
    assert_eq!(
        result.unwrap_err(),
        SchemaError::MissingSchema {
            role: SchemaRole::Writer,
            name: "Absent".to_string(),
        }
    );
}

#[test]
fn test_missing_reader_is_fatal() {
    let result = resolve(&AvroSchema::Int, &AvroSchema::named("Absent"));
    assert!(matches!(
        result,
        Err(SchemaError::MissingSchema {
            role: SchemaRole::Reader,
            ..
        })
    ));
}

#[test]
fn test_missing_schema_without_alias_pass() {
    let exact = Resolver::new(ResolverConfig::new().with_apply_aliases(false));
    let writer = AvroSchema::Record(RecordSchema::new(
        "R",
        vec![FieldSchema::new("a", AvroSchema::named("Gone"))],
    ));
    let reader = AvroSchema::Record(RecordSchema::new(
        "R",
        vec![FieldSchema::new("a", AvroSchema::Int)],
    ));

    assert!(matches!(
        exact.resolve(&writer, &reader),
        Err(SchemaError::MissingSchema { .. })
    ));
}

#[test]
fn test_reserved_property_key_is_fatal() {
    let schema = AvroSchema::Enum(EnumSchema::new("E", symbols(&["A"])).with_property("symbols", "B"));
    assert!(matches!(
        resolve(&schema, &schema),
        Err(SchemaError::InvalidSchema(_))
    ));
}

#[test]
fn test_missing_schema_in_skipped_field_is_fatal() {
    let writer = AvroSchema::Record(RecordSchema::new(
        "R",
        vec![FieldSchema::new("dropped", AvroSchema::named("Gone"))],
    ));
    let reader = AvroSchema::Record(RecordSchema::new("R", vec![]));

    assert!(resolve(&writer, &reader).is_err());
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn test_plan_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResolutionPlan>();
    assert_send_sync::<ResolutionCache>();
}

#[test]
fn test_plan_shared_across_threads() {
    let writer = AvroSchema::Enum(EnumSchema::new("E", symbols(&["A", "B", "C"])));
    let reader = AvroSchema::Enum(EnumSchema::new("E", symbols(&["C", "B", "A"])));
    let plan = Arc::new(resolve(&writer, &reader).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let plan = Arc::clone(&plan);
            thread::spawn(move || {
                (0..3)
                    .map(|i| plan.root().resolve_symbol(i).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![2, 1, 0]);
    }
}

#[test]
fn test_cache_shared_across_threads() {
    let cache = Arc::new(ResolutionCache::new(ResolverConfig::default()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                cache
                    .get_or_resolve(&handshake_request(), &handshake_request())
                    .unwrap()
            })
        })
        .collect();

    let plans: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(cache.len(), 1);
    assert!(plans.iter().all(|p| Arc::ptr_eq(p, &plans[0])));
}
