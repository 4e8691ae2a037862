//! Bridges between `serde_json::Value` trees and the heap.
use std::collections::HashSet;

use serde_json::{Map, Value};

use super::{Heap, Node, ValueId};

/// A cyclic value has no JSON form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("value {0:?} contains itself and cannot be written as JSON")]
pub struct CycleError(pub ValueId);

impl Heap {
    /// Copy a JSON tree into the heap, returning the root.
    pub fn insert_json(&mut self, v: &Value) -> ValueId {
        let node = match v {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Node::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Node::UInt(u)
                } else {
                    Node::Float(n.as_f64().unwrap_or(f64::NAN).into())
                }
            }
            Value::String(s) => Node::Str(s.clone()),
            Value::Array(xs) => Node::List(xs.iter().map(|x| self.insert_json(x)).collect()),
            Value::Object(m) => Node::Map(
                m.iter().map(|(k, x)| (k.clone(), self.insert_json(x))).collect(),
            ),
        };
        self.alloc(node)
    }

    pub fn from_json(v: &Value) -> (Self, ValueId) {
        let mut heap = Heap::new();
        let root = heap.insert_json(v);
        (heap, root)
    }

    /// Rebuild a JSON tree. Tuples become arrays; shared (acyclic) nodes are
    /// written out once per occurrence.
    pub fn to_json(&self, id: ValueId) -> Result<Value, CycleError> {
        let mut on_path = HashSet::new();
        self.to_json_inner(id, &mut on_path)
    }

    fn to_json_inner(&self, id: ValueId, on_path: &mut HashSet<ValueId>) -> Result<Value, CycleError> {
        let out = match self.get(id) {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Int(i) => Value::from(*i),
            Node::UInt(u) => Value::from(*u),
            Node::Float(f) => Value::from(f.0),
            Node::Str(s) => Value::String(s.clone()),
            Node::List(xs) | Node::Tuple(xs) => {
                if !on_path.insert(id) { return Err(CycleError(id)); }
                let items = xs.iter()
                    .map(|x| self.to_json_inner(*x, on_path))
                    .collect::<Result<Vec<_>, _>>()?;
                on_path.remove(&id);
                Value::Array(items)
            }
            Node::Map(m) => {
                if !on_path.insert(id) { return Err(CycleError(id)); }
                let mut out = Map::new();
                for (k, x) in m {
                    out.insert(k.clone(), self.to_json_inner(*x, on_path)?);
                }
                on_path.remove(&id);
                Value::Object(out)
            }
        };
        Ok(out)
    }
}
