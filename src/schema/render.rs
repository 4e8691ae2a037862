//! Human-readable form of a description graph. Re-entering a node that is
//! still being written prints `...`.
use std::fmt::{self, Write};

use super::{FieldKey, Schema, SeqKinds, Ty, TypeId};

pub struct RenderedTy<'s> {
    schema: &'s Schema,
    id: TypeId,
}

impl Schema {
    pub fn render(&self, id: TypeId) -> RenderedTy<'_> {
        RenderedTy { schema: self, id }
    }

    pub fn render_short(&self, id: TypeId, max: usize) -> String {
        let mut out = String::new();
        if !write_ty(self, id, &mut out, &mut Vec::new(), max) {
            out.push_str("...");
        }
        out
    }
}

impl fmt::Display for RenderedTy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_ty(self.schema, self.id, &mut out, &mut Vec::new(), usize::MAX);
        f.write_str(&out)
    }
}

fn write_ty(schema: &Schema, id: TypeId, out: &mut String, on_path: &mut Vec<TypeId>, limit: usize) -> bool {
    if out.len() > limit { return false; }
    if on_path.contains(&id) {
        out.push_str("...");
        return true;
    }
    let Ok(ty) = schema.get(id) else {
        out.push_str("<unbound>");
        return true;
    };
    on_path.push(id);
    let ok = match ty {
        Ty::Any => { out.push_str("any"); true }
        Ty::Never => { out.push_str("never"); true }
        Ty::NoneType => { out.push_str("null"); true }
        Ty::Primitive(kind) => { out.push_str(kind.name()); true }
        Ty::OneOf(alts) => {
            out.push('(');
            let ok = write_all(schema, alts, " | ", out, on_path, limit);
            out.push(')');
            ok
        }
        Ty::ListOf(list) => {
            let plain = !list.strict && list.accept == SeqKinds::ALL;
            if !plain { out.push_str("list_("); }
            out.push('[');
            let ok = match list.element {
                Some(el) => write_ty(schema, el, out, on_path, limit),
                None => true,
            };
            out.push(']');
            if !plain {
                if list.strict { out.push_str(", strict"); }
                match list.accept {
                    SeqKinds::LIST => out.push_str(", list"),
                    SeqKinds::TUPLE => out.push_str(", tuple"),
                    _ => {}
                }
                out.push(')');
            }
            ok
        }
        Ty::MappingOf(mapping) => {
            out.push('{');
            let mut ok = true;
            for (i, field) in mapping.fields().iter().enumerate() {
                if i > 0 { out.push_str(", "); }
                let _ = match &field.key {
                    FieldKey::Required(k) => write!(out, "{k:?}: "),
                    FieldKey::Optional(k) => write!(out, "{:?}: ", format!("?{k}")),
                    FieldKey::Pattern(rx) => write!(out, "{:?}: ", format!("~{}", rx.as_str())),
                };
                if !write_ty(schema, field.ty, out, on_path, limit) {
                    ok = false;
                    break;
                }
            }
            out.push('}');
            ok
        }
        Ty::FixedTuple(slots) => {
            out.push_str("tuple_(");
            let ok = write_all(schema, slots, ", ", out, on_path, limit);
            out.push(')');
            ok
        }
        Ty::KeyedMap { key, value } => {
            out.push_str("map_(");
            let ok = write_ty(schema, *key, out, on_path, limit)
                && { out.push_str(", "); write_ty(schema, *value, out, on_path, limit) };
            out.push(')');
            ok
        }
        Ty::Predicate(p) => {
            out.push_str(&p.name);
            if p.base != TypeId::ANY {
                out.push('(');
                let ok = write_ty(schema, p.base, out, on_path, limit);
                out.push(')');
                ok
            } else {
                true
            }
        }
    };
    on_path.pop();
    ok && out.len() <= limit
}

fn write_all(schema: &Schema, ids: &[TypeId], sep: &str, out: &mut String, on_path: &mut Vec<TypeId>, limit: usize) -> bool {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 { out.push_str(sep); }
        if !write_ty(schema, *id, out, on_path, limit) { return false; }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::super::{Field, Kind, ListOf, Predicate};
    use super::*;

    #[test]
    fn recursive_list_renders_once() {
        let mut schema = Schema::new();
        let t = schema.reserve();
        let int = schema.primitive(Kind::Int);
        let item = schema.one_of([int, t]);
        schema.define(t, Ty::ListOf(ListOf::of(item))).unwrap();
        assert_eq!(schema.render(t).to_string(), "[(int | ...)]");
    }

    #[test]
    fn mappings_show_key_prefixes() {
        let mut schema = Schema::new();
        let int = schema.primitive(Kind::Int);
        let s = schema.primitive(Kind::Str);
        let m = schema.mapping([
            Field::required("abc", int),
            Field::optional("d", s),
            Field::pattern("a.b", TypeId::NEVER).unwrap(),
        ]);
        assert_eq!(schema.render(m).to_string(), r#"{"abc": int, "?d": str, "~a.b": never}"#);
    }

    #[test]
    fn options_and_custom_types() {
        let mut schema = Schema::new();
        let int = schema.primitive(Kind::Int);
        let strict = schema.list(ListOf::of(int).strict());
        let tup = schema.tuple([int, TypeId::NONE]);
        let map = schema.keyed_map(int, tup);
        let p = schema.predicate(Predicate::new("even", |_, _| Ok(true)).with_base(int));
        assert_eq!(schema.render(strict).to_string(), "list_([int], strict)");
        assert_eq!(schema.render(map).to_string(), "map_(int, tuple_(int, null))");
        assert_eq!(schema.render(p).to_string(), "even(int)");
    }

    #[test]
    fn unbound_nodes_are_marked() {
        let mut schema = Schema::new();
        let t = schema.reserve();
        let l = schema.list_of(t);
        assert_eq!(schema.render(l).to_string(), "[<unbound>]");
    }
}
