//! Graph value types and hydration of raw structures.
//!
//! Record values arrive from the wire as plain PackStream values; graph
//! entities among them are structures with well-known signatures. Hydration
//! walks a value and replaces every such structure with its typed
//! counterpart, leaving unknown structures untouched.

use getset::{CopyGetters, Getters};

use crate::{DeserializeError, Map, Structure, Value};

#[cfg(test)]
mod tests;

/// Signature byte of a node structure.
pub const NODE: u8 = 0x4E;

/// Signature byte of a path structure.
pub const PATH: u8 = 0x50;

/// Signature byte of a relationship structure.
pub const RELATIONSHIP: u8 = 0x52;

/// Signature byte of a relationship without bound start and end nodes.
pub const UNBOUND_RELATIONSHIP: u8 = 0x72;

/// A node from a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, CopyGetters)]
pub struct Node {
    /// The server-assigned identity of the node.
    #[getset(get_copy = "pub")]
    identity: i64,

    /// The labels attached to the node.
    #[getset(get = "pub")]
    labels: Vec<String>,

    /// The properties of the node.
    #[getset(get = "pub")]
    properties: Map,
}

impl Node {
    /// Bundles an identity, labels and properties into a node value.
    pub fn new(identity: i64, labels: Vec<String>, properties: Map) -> Self {
        Self {
            identity,
            labels,
            properties,
        }
    }
}

/// A directed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, CopyGetters)]
pub struct Relationship {
    /// The server-assigned identity of the relationship.
    #[getset(get_copy = "pub")]
    identity: i64,

    /// The identity of the node the relationship starts at.
    #[getset(get_copy = "pub")]
    start: i64,

    /// The identity of the node the relationship ends at.
    #[getset(get_copy = "pub")]
    end: i64,

    /// The type name of the relationship.
    #[getset(get = "pub")]
    relationship_type: String,

    /// The properties of the relationship.
    #[getset(get = "pub")]
    properties: Map,
}

impl Relationship {
    /// Bundles the parts of a relationship into a relationship value.
    pub fn new(
        identity: i64,
        start: i64,
        end: i64,
        relationship_type: String,
        properties: Map,
    ) -> Self {
        Self {
            identity,
            start,
            end,
            relationship_type,
            properties,
        }
    }
}

/// A relationship detached from its start and end nodes, as it appears
/// inside a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, CopyGetters)]
pub struct UnboundRelationship {
    /// The server-assigned identity of the relationship.
    #[getset(get_copy = "pub")]
    identity: i64,

    /// The type name of the relationship.
    #[getset(get = "pub")]
    relationship_type: String,

    /// The properties of the relationship.
    #[getset(get = "pub")]
    properties: Map,
}

impl UnboundRelationship {
    /// Bundles the parts of a detached relationship.
    pub fn new(identity: i64, relationship_type: String, properties: Map) -> Self {
        Self {
            identity,
            relationship_type,
            properties,
        }
    }
}

/// An alternating sequence of nodes and relationships.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters)]
pub struct Path {
    /// The nodes appearing on the path, starting with its origin.
    #[getset(get = "pub")]
    nodes: Vec<Node>,

    /// The relationships appearing on the path, detached from their nodes.
    #[getset(get = "pub")]
    relationships: Vec<UnboundRelationship>,

    /// The traversal order over `nodes` and `relationships`: alternating
    /// relationship and node indices as sent by the server.
    #[getset(get = "pub")]
    sequence: Vec<i64>,
}

impl Path {
    /// Bundles the parts of a path.
    pub fn new(
        nodes: Vec<Node>,
        relationships: Vec<UnboundRelationship>,
        sequence: Vec<i64>,
    ) -> Self {
        Self {
            nodes,
            relationships,
            sequence,
        }
    }
}

/// Recursively replaces known structures in `value` with their graph types.
pub fn hydrate(value: Value) -> Result<Value, DeserializeError> {
    match value {
        Value::List(items) => Ok(Value::List(
            items
                .into_iter()
                .map(hydrate)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Value::Map(entries) => Ok(Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| Ok((key, hydrate(value)?)))
                .collect::<Result<Map, DeserializeError>>()?,
        )),
        Value::Structure(structure) => hydrate_structure(structure),
        other => Ok(other),
    }
}

fn hydrate_structure(structure: Structure) -> Result<Value, DeserializeError> {
    match structure.signature {
        NODE => Ok(Value::Node(hydrate_node(structure.fields)?)),
        RELATIONSHIP => {
            let [identity, start, end, relationship_type, properties] =
                take_fields(structure.fields)?;
            Ok(Value::Relationship(Relationship::new(
                expect_integer(identity)?,
                expect_integer(start)?,
                expect_integer(end)?,
                expect_string(relationship_type)?,
                expect_map(properties)?,
            )))
        }
        UNBOUND_RELATIONSHIP => {
            let [identity, relationship_type, properties] = take_fields(structure.fields)?;
            Ok(Value::UnboundRelationship(UnboundRelationship::new(
                expect_integer(identity)?,
                expect_string(relationship_type)?,
                expect_map(properties)?,
            )))
        }
        PATH => {
            let [nodes, relationships, sequence] = take_fields(structure.fields)?;
            let nodes = expect_list(nodes)?
                .into_iter()
                .map(|node| match node {
                    Value::Structure(s) if s.signature == NODE => hydrate_node(s.fields),
                    _ => Err(DeserializeError::WrongFieldType { expected: "node" }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let relationships = expect_list(relationships)?
                .into_iter()
                .map(|relationship| match hydrate(relationship)? {
                    Value::UnboundRelationship(r) => Ok(r),
                    _ => Err(DeserializeError::WrongFieldType {
                        expected: "relationship",
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let sequence = expect_list(sequence)?
                .into_iter()
                .map(expect_integer)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Path(Path::new(nodes, relationships, sequence)))
        }
        _ => Ok(Value::Structure(structure)),
    }
}

fn hydrate_node(fields: Vec<Value>) -> Result<Node, DeserializeError> {
    let [identity, labels, properties] = take_fields(fields)?;
    let labels = expect_list(labels)?
        .into_iter()
        .map(expect_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Node::new(
        expect_integer(identity)?,
        labels,
        expect_map(properties)?,
    ))
}

fn take_fields<const N: usize>(fields: Vec<Value>) -> Result<[Value; N], DeserializeError> {
    let actual = fields.len();
    fields
        .try_into()
        .map_err(|_| DeserializeError::FieldCountMismatch {
            expected: N,
            actual,
        })
}

fn expect_integer(value: Value) -> Result<i64, DeserializeError> {
    match value {
        Value::Integer(i) => Ok(i),
        _ => Err(DeserializeError::WrongFieldType {
            expected: "integer",
        }),
    }
}

fn expect_string(value: Value) -> Result<String, DeserializeError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(DeserializeError::WrongFieldType { expected: "string" }),
    }
}

fn expect_map(value: Value) -> Result<Map, DeserializeError> {
    match value {
        Value::Map(m) => Ok(m),
        _ => Err(DeserializeError::WrongFieldType { expected: "map" }),
    }
}

fn expect_list(value: Value) -> Result<Vec<Value>, DeserializeError> {
    match value {
        Value::List(items) => Ok(items),
        _ => Err(DeserializeError::WrongFieldType { expected: "list" }),
    }
}
