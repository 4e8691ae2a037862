//! Runtime values: an arena of untyped nodes.
//!
//! Containers refer to their children by `ValueId`, so a list may hold
//! itself (directly or through other containers). The engine only ever
//! appends to a `Heap`; nodes that exist before a check are never rewritten.
pub mod json;
pub mod render;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

pub use json::CycleError;
pub use render::Rendered;

/// Handle of a node inside a [`Heap`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ValueId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// The absence-marker.
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`; still a whole number.
    UInt(u64),
    Float(OrderedFloat<f64>),
    Str(String),
    /// Canonical sequence.
    List(Vec<ValueId>),
    /// Fixed sequence; accepted wherever a list template is.
    Tuple(Vec<ValueId>),
    Map(IndexMap<String, ValueId>),
}

impl Node {
    pub fn is_null(&self) -> bool { matches!(self, Node::Null) }

    /// Items of either sequence kind.
    pub fn items(&self) -> Option<&[ValueId]> {
        match self {
            Node::List(xs) | Node::Tuple(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Int(_) | Node::UInt(_) => "int",
            Node::Float(_) => "float",
            Node::Str(_) => "str",
            Node::List(_) => "list",
            Node::Tuple(_) => "tuple",
            Node::Map(_) => "map",
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self { Node::Str(s.to_string()) }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self { Node::Int(i) }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self { Node::Bool(b) }
}

// ------------------------------- Heap ------------------------------------ //

#[derive(Clone, Debug, Default)]
pub struct Heap {
    nodes: Vec<Node>,
}

impl Heap {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn alloc(&mut self, node: Node) -> ValueId {
        let id = ValueId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Panics on a handle that did not come from this heap.
    pub fn get(&self, id: ValueId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Overwrite a node. Meant for tying knots while *building* input data
    /// (`let v = heap.reserve(); heap.set(v, Node::List(vec![v]))`).
    pub fn set(&mut self, id: ValueId, node: Node) {
        self.nodes[id.0 as usize] = node;
    }

    /// A `Null` placeholder to be filled in later with [`Heap::set`].
    pub fn reserve(&mut self) -> ValueId { self.alloc(Node::Null) }

    /// Drop every node from `from` on. Only for nodes nothing else refers to.
    pub(crate) fn truncate(&mut self, from: ValueId) {
        self.nodes.truncate(from.0 as usize);
    }

    pub fn null(&mut self) -> ValueId { self.alloc(Node::Null) }
    pub fn bool(&mut self, b: bool) -> ValueId { self.alloc(Node::Bool(b)) }
    pub fn int(&mut self, i: i64) -> ValueId { self.alloc(Node::Int(i)) }
    pub fn float(&mut self, f: f64) -> ValueId { self.alloc(Node::Float(OrderedFloat(f))) }
    pub fn str(&mut self, s: impl Into<String>) -> ValueId { self.alloc(Node::Str(s.into())) }
    pub fn list(&mut self, items: Vec<ValueId>) -> ValueId { self.alloc(Node::List(items)) }
    pub fn tuple(&mut self, items: Vec<ValueId>) -> ValueId { self.alloc(Node::Tuple(items)) }

    pub fn map<K, I>(&mut self, entries: I) -> ValueId
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ValueId)>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.alloc(Node::Map(map))
    }

    /// Append to an existing list or tuple. Returns false for any other node.
    pub fn push(&mut self, seq: ValueId, item: ValueId) -> bool {
        match &mut self.nodes[seq.0 as usize] {
            Node::List(xs) | Node::Tuple(xs) => { xs.push(item); true }
            _ => false,
        }
    }

    /// Insert into an existing map. Returns false for any other node.
    pub fn insert(&mut self, map: ValueId, key: impl Into<String>, value: ValueId) -> bool {
        match &mut self.nodes[map.0 as usize] {
            Node::Map(m) => { m.insert(key.into(), value); true }
            _ => false,
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_referential_list_is_representable() {
        let mut heap = Heap::new();
        let v = heap.list(Vec::new());
        assert!(heap.push(v, v));
        let two = heap.int(2);
        assert!(heap.push(v, two));
        assert_eq!(heap.get(v).items().unwrap(), &[v, two]);
    }

    #[test]
    fn push_and_insert_reject_scalars() {
        let mut heap = Heap::new();
        let one = heap.int(1);
        assert!(!heap.push(one, one));
        assert!(!heap.insert(one, "k", one));
        assert_eq!(heap.get(one), &Node::Int(1));
    }

    #[test]
    fn reserve_then_set_ties_a_knot() {
        let mut heap = Heap::new();
        let m = heap.reserve();
        heap.set(m, Node::Map(IndexMap::from([("self".to_string(), m)])));
        match heap.get(m) {
            Node::Map(entries) => assert_eq!(entries["self"], m),
            other => panic!("unexpected {other:?}"),
        }
    }
}
