use super::{hydrate, Node, Path, Relationship, UnboundRelationship};
use super::{NODE, PATH, RELATIONSHIP, UNBOUND_RELATIONSHIP};
use crate::{DeserializeError, Map, Structure, Value};

fn node_structure(identity: i64, label: &str) -> Value {
    Value::Structure(Structure {
        signature: NODE,
        fields: vec![
            Value::Integer(identity),
            Value::List(vec![Value::String(label.into())]),
            Value::Map(Map::new()),
        ],
    })
}

#[test]
fn plain_values_pass_through() {
    assert_eq!(hydrate(Value::Integer(7)), Ok(Value::Integer(7)));
    assert_eq!(hydrate(Value::Null), Ok(Value::Null));
}

#[test]
fn node_structure_becomes_node() {
    let mut properties = Map::new();
    properties.insert("name".into(), Value::String("Alice".into()));
    let raw = Value::Structure(Structure {
        signature: NODE,
        fields: vec![
            Value::Integer(1),
            Value::List(vec![Value::String("Person".into())]),
            Value::Map(properties.clone()),
        ],
    });

    let expected = Node::new(1, vec!["Person".into()], properties);
    assert_eq!(hydrate(raw), Ok(Value::Node(expected)));
}

#[test]
fn relationship_structure_becomes_relationship() {
    let raw = Value::Structure(Structure {
        signature: RELATIONSHIP,
        fields: vec![
            Value::Integer(9),
            Value::Integer(1),
            Value::Integer(2),
            Value::String("KNOWS".into()),
            Value::Map(Map::new()),
        ],
    });

    let expected = Relationship::new(9, 1, 2, "KNOWS".into(), Map::new());
    assert_eq!(hydrate(raw), Ok(Value::Relationship(expected)));
}

#[test]
fn path_structure_becomes_path() {
    let raw = Value::Structure(Structure {
        signature: PATH,
        fields: vec![
            Value::List(vec![node_structure(1, "A"), node_structure(2, "B")]),
            Value::List(vec![Value::Structure(Structure {
                signature: UNBOUND_RELATIONSHIP,
                fields: vec![
                    Value::Integer(5),
                    Value::String("LINKS".into()),
                    Value::Map(Map::new()),
                ],
            })]),
            Value::List(vec![Value::Integer(1), Value::Integer(1)]),
        ],
    });

    let expected = Path::new(
        vec![
            Node::new(1, vec!["A".into()], Map::new()),
            Node::new(2, vec!["B".into()], Map::new()),
        ],
        vec![UnboundRelationship::new(5, "LINKS".into(), Map::new())],
        vec![1, 1],
    );
    assert_eq!(hydrate(raw), Ok(Value::Path(expected)));
}

#[test]
fn structures_nested_in_collections_are_hydrated() {
    let raw = Value::List(vec![node_structure(3, "Nested")]);
    match hydrate(raw).expect("hydration should succeed") {
        Value::List(items) => assert!(matches!(items[0], Value::Node(_))),
        other => panic!("expected list, got {other:?}"),
    }
}

#[test]
fn unknown_structures_are_left_raw() {
    let raw = Value::Structure(Structure {
        signature: 0x77,
        fields: vec![Value::Integer(1)],
    });
    assert_eq!(hydrate(raw.clone()), Ok(raw));
}

#[test]
fn wrong_field_count_is_an_error() {
    let raw = Value::Structure(Structure {
        signature: NODE,
        fields: vec![Value::Integer(1)],
    });
    assert_eq!(
        hydrate(raw),
        Err(DeserializeError::FieldCountMismatch {
            expected: 3,
            actual: 1,
        })
    );
}

#[test]
fn wrong_field_type_is_an_error() {
    let raw = Value::Structure(Structure {
        signature: NODE,
        fields: vec![
            Value::String("not an identity".into()),
            Value::List(Vec::new()),
            Value::Map(Map::new()),
        ],
    });
    assert_eq!(
        hydrate(raw),
        Err(DeserializeError::WrongFieldType { expected: "integer" })
    );
}
