//! List templates: item-wise checks and single-value promotion.
use super::{Engine, Outcome};
use crate::error::Segment;
use crate::schema::{ListOf, SeqKinds, TypeId};
use crate::value::{Node, ValueId};

impl Engine<'_> {
    pub(super) fn check_list(&mut self, value: ValueId, ty: TypeId, list: ListOf) -> Outcome {
        let node = self.heap.get(value);

        if list.accept.contains(node) {
            let items = node.items().map(<[ValueId]>::to_vec).unwrap_or_default();
            return self.descend(value, ty, Node::List(Vec::new()), |eng| {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    out.push(match list.element {
                        Some(el) => eng.check_at(Segment::Index(i), item, el)?,
                        None => item,
                    });
                }
                Ok(Node::List(out))
            });
        }

        // a sequence is never wrapped into another one
        if node.items().is_some() {
            let info = format!("allowed types are: {}", accepted_names(list.accept));
            return Err(self.mismatch(value, ty, Some(info)));
        }
        if list.strict {
            let info = "strict mode disables auto-convert-to-list for single value".to_string();
            return Err(self.mismatch(value, ty, Some(info)));
        }

        let item = match list.element {
            Some(el) => self.pending(value, ty, |eng| eng.check(value, el))?,
            None => value,
        };
        Ok(self.heap.list(vec![item]))
    }
}

fn accepted_names(kinds: SeqKinds) -> &'static str {
    match (kinds.list, kinds.tuple) {
        (true, true) => "list, tuple",
        (true, false) => "list",
        (false, true) => "tuple",
        (false, false) => "nothing",
    }
}
