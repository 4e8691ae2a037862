//! Mapping templates: required/optional/pattern keys over an open mapping.
use indexmap::IndexMap;

use super::{Engine, Outcome};
use crate::error::Segment;
use crate::schema::{Mapping, TypeId};
use crate::value::{Node, ValueId};

impl Engine<'_> {
    pub(super) fn check_mapping(&mut self, value: ValueId, ty: TypeId, mapping: &Mapping) -> Outcome {
        let Node::Map(entries) = self.heap.get(value) else {
            return Err(self.mismatch(value, ty, Some("allowed types are: map".into())));
        };
        if let Some(missing) = mapping.required_keys().find(|k| !entries.contains_key(*k)) {
            return Err(self.mismatch(value, ty, Some(format!("key '{missing}' is required"))));
        }
        let entries = entries.clone();

        self.descend(value, ty, Node::Map(IndexMap::new()), |eng| {
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, v) in entries {
                let checked = match mapping.type_for(&key) {
                    Some(t) => eng.check_at(Segment::Key(key.clone()), v, t)?,
                    None => v,
                };
                out.insert(key, checked);
            }
            Ok(Node::Map(out))
        })
    }
}
