//! Cycle-aware rendering of heap values for diagnostics.
//!
//! A container met again while it is still being written prints as `[...]`,
//! `(...)` or `{...}`.
use std::fmt::{self, Write};

use super::{Heap, Node, ValueId};

pub struct Rendered<'h> {
    heap: &'h Heap,
    id: ValueId,
}

impl Heap {
    pub fn render(&self, id: ValueId) -> Rendered<'_> {
        Rendered { heap: self, id }
    }

    /// Rendering cut after roughly `max` bytes, for error messages.
    pub fn render_short(&self, id: ValueId, max: usize) -> String {
        let mut out = String::new();
        let mut on_path = Vec::new();
        if !write_node(self, id, &mut out, &mut on_path, max) {
            out.push_str("...");
        }
        out
    }
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_node(self.heap, self.id, &mut out, &mut Vec::new(), usize::MAX);
        f.write_str(&out)
    }
}

/// Returns false once `limit` is exceeded; the caller stops writing.
fn write_node(heap: &Heap, id: ValueId, out: &mut String, on_path: &mut Vec<ValueId>, limit: usize) -> bool {
    if out.len() > limit { return false; }
    match heap.get(id) {
        Node::Null => out.push_str("null"),
        Node::Bool(b) => { let _ = write!(out, "{b}"); }
        Node::Int(i) => { let _ = write!(out, "{i}"); }
        Node::UInt(u) => { let _ = write!(out, "{u}"); }
        Node::Float(x) => { let _ = write!(out, "{:?}", x.0); }
        Node::Str(s) => { let _ = write!(out, "{s:?}"); }
        Node::List(xs) => return write_seq(heap, id, xs, ("[", "]"), out, on_path, limit),
        Node::Tuple(xs) => return write_seq(heap, id, xs, ("(", ")"), out, on_path, limit),
        Node::Map(m) => {
            if on_path.contains(&id) {
                out.push_str("{...}");
                return true;
            }
            on_path.push(id);
            out.push('{');
            for (i, (k, v)) in m.iter().enumerate() {
                if i > 0 { out.push_str(", "); }
                let _ = write!(out, "{k:?}: ");
                if !write_node(heap, *v, out, on_path, limit) {
                    on_path.pop();
                    return false;
                }
            }
            out.push('}');
            on_path.pop();
        }
    }
    out.len() <= limit
}

fn write_seq(
    heap: &Heap,
    id: ValueId,
    xs: &[ValueId],
    (open, close): (&str, &str),
    out: &mut String,
    on_path: &mut Vec<ValueId>,
    limit: usize,
) -> bool {
    if on_path.contains(&id) {
        out.push_str(open);
        out.push_str("...");
        out.push_str(close);
        return true;
    }
    on_path.push(id);
    out.push_str(open);
    for (i, x) in xs.iter().enumerate() {
        if i > 0 { out.push_str(", "); }
        if !write_node(heap, *x, out, on_path, limit) {
            on_path.pop();
            return false;
        }
    }
    if xs.len() == 1 && open == "(" { out.push(','); }
    out.push_str(close);
    on_path.pop();
    out.len() <= limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_list_renders_with_ellipsis() {
        let mut heap = Heap::new();
        let v = heap.list(Vec::new());
        let two = heap.int(2);
        heap.push(v, v);
        heap.push(v, two);
        assert_eq!(heap.render(v).to_string(), "[[...], 2]");
    }

    #[test]
    fn maps_tuples_and_strings() {
        let mut heap = Heap::new();
        let a = heap.str("abc");
        let t = heap.tuple(vec![a]);
        let m = heap.map([("k", t)]);
        heap.insert(m, "me", m);
        assert_eq!(heap.render(m).to_string(), r#"{"k": ("abc",), "me": {...}}"#);
    }

    #[test]
    fn short_rendering_is_bounded() {
        let mut heap = Heap::new();
        let items: Vec<_> = (0..1000).map(|i| heap.int(i)).collect();
        let big = heap.list(items);
        let s = heap.render_short(big, 32);
        assert!(s.len() < 64, "{s}");
        assert!(s.ends_with("..."));
    }
}
