//! Type descriptions: an arena of nodes addressed by `TypeId`.
//!
//! A node's children are ids, so a description can point back at itself or at
//! any ancestor. Recursive descriptions are built by reserving an id first and
//! defining it once its children (which may mention it) exist:
//!
//! ```
//! use checktype::schema::{Kind, ListOf, Schema, Ty};
//!
//! // T = [int | T]
//! let mut schema = Schema::new();
//! let t = schema.reserve();
//! let int = schema.primitive(Kind::Int);
//! let item = schema.one_of([int, t]);
//! schema.define(t, Ty::ListOf(ListOf::of(item))).unwrap();
//! ```
pub mod mapping;
pub mod notation;
pub mod predicate;
pub mod render;

use crate::error::SchemaError;
use crate::value::Node;

pub use mapping::{Field, FieldKey, Mapping};
pub use predicate::Predicate;
pub use render::RenderedTy;

/// Handle of a description node inside a [`Schema`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Matches everything, the absence-marker included.
    pub const ANY: TypeId = TypeId(0);
    /// Matches nothing.
    pub const NEVER: TypeId = TypeId(1);
    /// Matches only the absence-marker.
    pub const NONE: TypeId = TypeId(2);
}

/// Runtime classification tested by [`Ty::Primitive`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Kind {
    Bool,
    /// Every integral representation; never a boolean.
    Int,
    Float,
    /// Every textual representation.
    Str,
    List,
    Tuple,
    Map,
}

impl Kind {
    pub fn admits(self, node: &Node) -> bool {
        match (self, node) {
            (Kind::Bool, Node::Bool(_)) => true,
            (Kind::Int, Node::Int(_) | Node::UInt(_)) => true,
            (Kind::Float, Node::Float(_)) => true,
            (Kind::Str, Node::Str(_)) => true,
            (Kind::List, Node::List(_)) => true,
            (Kind::Tuple, Node::Tuple(_)) => true,
            (Kind::Map, Node::Map(_)) => true,
            _ => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Str => "str",
            Kind::List => "list",
            Kind::Tuple => "tuple",
            Kind::Map => "map",
        }
    }
}

/// Sequence kinds a list template takes item by item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SeqKinds {
    pub list: bool,
    pub tuple: bool,
}

impl SeqKinds {
    pub const ALL: SeqKinds = SeqKinds { list: true, tuple: true };
    pub const LIST: SeqKinds = SeqKinds { list: true, tuple: false };
    pub const TUPLE: SeqKinds = SeqKinds { list: false, tuple: true };

    pub fn contains(self, node: &Node) -> bool {
        match node {
            Node::List(_) => self.list,
            Node::Tuple(_) => self.tuple,
            _ => false,
        }
    }
}

impl Default for SeqKinds {
    fn default() -> Self { Self::ALL }
}

/// List template: `[element]`, or `[]` when `element` is `None`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ListOf {
    pub element: Option<TypeId>,
    pub accept: SeqKinds,
    /// Disables promotion of a single value to a one-item list.
    pub strict: bool,
}

impl ListOf {
    pub fn any() -> Self { Self::default() }
    pub fn of(element: TypeId) -> Self { Self { element: Some(element), ..Self::default() } }
    pub fn strict(mut self) -> Self { self.strict = true; self }
    pub fn accept(mut self, accept: SeqKinds) -> Self { self.accept = accept; self }
}

#[derive(Clone, Debug)]
pub enum Ty {
    Any,
    Never,
    NoneType,
    Primitive(Kind),
    /// Tried left to right; empty means "anything except the absence-marker".
    OneOf(Vec<TypeId>),
    ListOf(ListOf),
    MappingOf(Mapping),
    FixedTuple(Vec<TypeId>),
    KeyedMap { key: TypeId, value: TypeId },
    Predicate(Predicate),
}

// ------------------------------- Schema ---------------------------------- //

/// Owner of a description graph. Immutable once built; share it freely.
#[derive(Clone, Debug)]
pub struct Schema {
    nodes: Vec<Option<Ty>>,
}

impl Default for Schema {
    fn default() -> Self { Self::new() }
}

impl Schema {
    pub fn new() -> Self {
        Self { nodes: vec![Some(Ty::Any), Some(Ty::Never), Some(Ty::NoneType)] }
    }

    pub fn add(&mut self, ty: Ty) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(Some(ty));
        id
    }

    /// An id whose description is supplied later through [`Schema::define`].
    pub fn reserve(&mut self) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(None);
        id
    }

    pub fn define(&mut self, id: TypeId, ty: Ty) -> Result<(), SchemaError> {
        let slot = &mut self.nodes[id.0 as usize];
        if slot.is_some() {
            return Err(SchemaError::AlreadyDefined(id));
        }
        *slot = Some(ty);
        Ok(())
    }

    /// Panics on an id that did not come from this schema.
    pub fn get(&self, id: TypeId) -> Result<&Ty, SchemaError> {
        self.nodes[id.0 as usize].as_ref().ok_or(SchemaError::Unbound(id))
    }

    pub fn primitive(&mut self, kind: Kind) -> TypeId { self.add(Ty::Primitive(kind)) }

    pub fn one_of(&mut self, alts: impl IntoIterator<Item = TypeId>) -> TypeId {
        self.add(Ty::OneOf(alts.into_iter().collect()))
    }

    /// `T | None`.
    pub fn nullable(&mut self, ty: TypeId) -> TypeId { self.one_of([ty, TypeId::NONE]) }

    /// Non-strict list of `element`, accepting lists and tuples.
    pub fn list_of(&mut self, element: TypeId) -> TypeId { self.add(Ty::ListOf(ListOf::of(element))) }

    pub fn list(&mut self, list: ListOf) -> TypeId { self.add(Ty::ListOf(list)) }

    pub fn mapping(&mut self, fields: impl IntoIterator<Item = Field>) -> TypeId {
        self.add(Ty::MappingOf(Mapping::new(fields)))
    }

    pub fn tuple(&mut self, slots: impl IntoIterator<Item = TypeId>) -> TypeId {
        self.add(Ty::FixedTuple(slots.into_iter().collect()))
    }

    pub fn keyed_map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.add(Ty::KeyedMap { key, value })
    }

    pub fn predicate(&mut self, predicate: Predicate) -> TypeId { self.add(Ty::Predicate(predicate)) }
}
