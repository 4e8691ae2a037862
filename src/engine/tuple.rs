//! Fixed-arity tuples and homomorphic (key type, value type) maps.
use indexmap::IndexMap;

use super::{Engine, Outcome};
use crate::error::Segment;
use crate::schema::TypeId;
use crate::value::{Node, ValueId};

impl Engine<'_> {
    pub(super) fn check_tuple(&mut self, value: ValueId, ty: TypeId, slots: &[TypeId]) -> Outcome {
        let Some(items) = self.heap.get(value).items() else {
            return Err(self.mismatch(value, ty, Some("allowed types are: list, tuple".into())));
        };
        if items.len() != slots.len() {
            return Err(self.mismatch(value, ty, Some("length mismatch".into())));
        }
        let items = items.to_vec();

        self.descend(value, ty, Node::Tuple(Vec::new()), |eng| {
            let mut out = Vec::with_capacity(items.len());
            for (i, (item, slot)) in items.into_iter().zip(slots).enumerate() {
                out.push(eng.check_at(Segment::Index(i), item, *slot)?);
            }
            Ok(Node::Tuple(out))
        })
    }

    pub(super) fn check_keyed_map(&mut self, value: ValueId, ty: TypeId, key_ty: TypeId, value_ty: TypeId) -> Outcome {
        let Node::Map(entries) = self.heap.get(value) else {
            return Err(self.mismatch(value, ty, Some("allowed types are: map".into())));
        };
        let entries = entries.clone();

        self.descend(value, ty, Node::Map(IndexMap::new()), |eng| {
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, v) in entries {
                let key_node = eng.heap.str(key.clone());
                eng.path.push(Segment::Key(key));
                let checked = eng.check(key_node, key_ty).and_then(|k| match eng.heap.get(k) {
                    Node::Str(s) => Ok(s.clone()),
                    _ => Err(eng.mismatch(key_node, key_ty, Some("map keys must stay text".into()))),
                });
                let entry = match checked {
                    Ok(k) => eng.check(v, value_ty).map(|v| (k, v)),
                    Err(e) => Err(e),
                };
                eng.path.pop();
                let (k, v) = entry?;
                out.insert(k, v);
            }
            Ok(Node::Map(out))
        })
    }
}
