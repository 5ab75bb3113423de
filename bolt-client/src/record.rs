//! An ordered, keyed collection of result values.

use std::ops::Index;
use std::sync::Arc;

use bolt_protocol::Value;

use crate::error::ClientError;


/// One record of a statement result.
///
/// Values can be accessed by position or by key; all records of one result
/// share the same key tuple. Equality and hashing are structural over both
/// the keys and the values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    keys: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// Bundles keys and values into a record. The two must have the same
    /// length.
    pub fn new(keys: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self { keys, values }
    }

    /// The keys of the record, in positional order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The values of the record, in positional order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The fields of the record as key/value pairs, in positional order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// The position of the given key.
    pub fn index(&self, key: &str) -> Result<usize, ClientError> {
        self.keys
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| ClientError::KeyNotFound(key.to_owned()))
    }

    /// The value stored under the given key.
    pub fn get(&self, key: &str) -> Result<&Value, ClientError> {
        Ok(&self.values[self.index(key)?])
    }

    /// Whether the record has a field with the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// The number of fields in the record.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Index<usize> for Record {
    type Output = Value;

    fn index(&self, position: usize) -> &Value {
        &self.values[position]
    }
}

impl Index<&str> for Record {
    type Output = Value;

    /// Panics when the record has no field with the given key; use
    /// [`get`](Record::get) for a fallible lookup.
    fn index(&self, key: &str) -> &Value {
        match self.get(key) {
            Ok(value) => value,
            Err(_) => panic!("record has no key {key:?}"),
        }
    }
}
