use core::hash::{Hash, Hasher};
use core::mem;
use std::collections::BTreeMap;

use crate::graph::{Node, Path, Relationship, UnboundRelationship};

/// A string-keyed map of values.
///
/// An ordered map is used so that serialization of the same map always
/// produces the same bytes.
pub type Map = BTreeMap<String, Value>;

/// A structure that does not correspond to any known graph type, kept in its
/// raw signature/fields form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Structure {
    /// The signature byte of the structure.
    pub signature: u8,

    /// The fields of the structure, in wire order.
    pub fields: Vec<Value>,
}

/// A value that can travel in a Bolt message.
///
/// Values are produced by [`packstream::unpack`](crate::packstream::unpack)
/// in their raw form; [`graph::hydrate`](crate::graph::hydrate) converts the
/// structures among them into the graph types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,

    /// A boolean.
    Boolean(bool),

    /// A 64-bit signed integer.
    Integer(i64),

    /// A 64-bit float.
    Float(f64),

    /// A UTF-8 string.
    String(String),

    /// An ordered list of values.
    List(Vec<Value>),

    /// A string-keyed map of values.
    Map(Map),

    /// A structure with no graph equivalent.
    Structure(Structure),

    /// A node from a graph.
    Node(Node),

    /// A relationship between two nodes.
    Relationship(Relationship),

    /// A relationship detached from its start and end nodes.
    UnboundRelationship(UnboundRelationship),

    /// An alternating sequence of nodes and relationships.
    Path(Path),
}

// Floats compare by IEEE-754 semantics, so the derived PartialEq is not
// reflexive for NaN. Record equality treats values structurally, matching
// what serde_json does for its float-carrying value type.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(value) => value.hash(state),
            Value::Integer(value) => value.hash(state),
            Value::Float(value) => value.to_bits().hash(state),
            Value::String(value) => value.hash(state),
            Value::List(values) => values.hash(state),
            Value::Map(entries) => entries.hash(state),
            Value::Structure(structure) => structure.hash(state),
            Value::Node(node) => node.hash(state),
            Value::Relationship(relationship) => relationship.hash(state),
            Value::UnboundRelationship(relationship) => relationship.hash(state),
            Value::Path(path) => path.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

impl From<Map> for Value {
    fn from(entries: Map) -> Self {
        Value::Map(entries)
    }
}
