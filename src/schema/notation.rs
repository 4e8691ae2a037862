//! Descriptions written as JSON, using native-structure conventions:
//!
//! - `"int"`, `"str"`, ... name a primitive; `null` is the absence-marker
//! - `[]` / `[t]` is a list template
//! - an object is a mapping template: `"?key"` optional, `"!key"` required,
//!   `"~regex"` pattern, a bare key required
//! - a single-key object whose key starts with `$` is a directive:
//!   `$one_of`, `$tuple`, `$map`, `$list`, `$pattern`
use serde_json::{Map, Value};

use super::{Field, Kind, ListOf, Predicate, Schema, SeqKinds, Ty, TypeId};
use crate::error::SchemaError;

impl Schema {
    /// Add the description written in `notation`, returning its root.
    pub fn parse_notation(&mut self, notation: &Value) -> Result<TypeId, SchemaError> {
        match notation {
            Value::Null => Ok(TypeId::NONE),
            Value::String(name) => self.parse_name(notation, name),
            Value::Array(xs) => match xs.as_slice() {
                [] => Ok(self.list(ListOf::any())),
                [el] => {
                    let el = self.parse_notation(el)?;
                    Ok(self.list_of(el))
                }
                _ => Err(invalid(notation, "list must contain 0 or 1 valid inner type")),
            },
            Value::Object(m) => match directive(m) {
                Some((name, arg)) => self.parse_directive(notation, name, arg),
                None => self.parse_mapping(m),
            },
            Value::Bool(_) | Value::Number(_) => Err(invalid(notation, "Unrecognized type")),
        }
    }

    /// A fresh schema holding only `notation`.
    pub fn from_notation(notation: &Value) -> Result<(Self, TypeId), SchemaError> {
        let mut schema = Schema::new();
        let root = schema.parse_notation(notation)?;
        Ok((schema, root))
    }

    fn parse_name(&mut self, notation: &Value, name: &str) -> Result<TypeId, SchemaError> {
        let kind = match name {
            "any" | "object" => return Ok(TypeId::ANY),
            "never" => return Ok(TypeId::NEVER),
            "none" | "null" => return Ok(TypeId::NONE),
            "bool" => Kind::Bool,
            "int" => Kind::Int,
            "float" => Kind::Float,
            "str" => Kind::Str,
            "list" => Kind::List,
            "tuple" => Kind::Tuple,
            "map" | "dict" => Kind::Map,
            _ => return Err(invalid(notation, "Unrecognized type")),
        };
        Ok(self.primitive(kind))
    }

    fn parse_directive(&mut self, notation: &Value, name: &str, arg: &Value) -> Result<TypeId, SchemaError> {
        match name {
            "$one_of" => {
                let alts = self.parse_each(notation, arg)?;
                Ok(self.one_of(alts))
            }
            "$tuple" => {
                let slots = self.parse_each(notation, arg)?;
                Ok(self.tuple(slots))
            }
            "$map" => match arg.as_array().map(Vec::as_slice) {
                Some([k, v]) => {
                    let k = self.parse_notation(k)?;
                    let v = self.parse_notation(v)?;
                    Ok(self.keyed_map(k, v))
                }
                _ => Err(invalid(notation, "$map takes [key type, value type]")),
            },
            "$list" => {
                let opts = arg.as_object().ok_or_else(|| invalid(notation, "$list takes an options object"))?;
                let mut list = ListOf::any();
                if let Some(of) = opts.get("of") {
                    list.element = Some(self.parse_notation(of)?);
                }
                match opts.get("strict") {
                    None => {}
                    Some(Value::Bool(b)) => list.strict = *b,
                    Some(_) => return Err(invalid(notation, "strict must be a boolean")),
                }
                if let Some(accept) = opts.get("accept") {
                    list.accept = parse_accept(notation, accept)?;
                }
                Ok(self.list(list))
            }
            "$pattern" => {
                let rx = arg.as_str().ok_or_else(|| invalid(notation, "$pattern takes a regex string"))?;
                let p = Predicate::matches(rx)?;
                Ok(self.add(Ty::Predicate(p)))
            }
            _ => Err(invalid(notation, "unknown directive")),
        }
    }

    fn parse_each(&mut self, notation: &Value, arg: &Value) -> Result<Vec<TypeId>, SchemaError> {
        let xs = arg.as_array().ok_or_else(|| invalid(notation, "expected an array of types"))?;
        xs.iter().map(|x| self.parse_notation(x)).collect()
    }

    fn parse_mapping(&mut self, m: &Map<String, Value>) -> Result<TypeId, SchemaError> {
        let mut fields = Vec::with_capacity(m.len());
        for (key, v) in m {
            let ty = self.parse_notation(v)?;
            let field = if let Some(k) = key.strip_prefix('?') {
                Field::optional(k, ty)
            } else if let Some(k) = key.strip_prefix('!') {
                Field::required(k, ty)
            } else if let Some(rx) = key.strip_prefix('~') {
                Field::pattern(rx, ty)?
            } else {
                Field::required(key.as_str(), ty)
            };
            fields.push(field);
        }
        Ok(self.mapping(fields))
    }
}

fn directive(m: &Map<String, Value>) -> Option<(&str, &Value)> {
    if m.len() != 1 { return None; }
    let (k, v) = m.iter().next()?;
    k.starts_with('$').then_some((k.as_str(), v))
}

fn parse_accept(notation: &Value, accept: &Value) -> Result<SeqKinds, SchemaError> {
    let names = accept.as_array().ok_or_else(|| invalid(notation, "accept must list \"list\" and/or \"tuple\""))?;
    let mut kinds = SeqKinds { list: false, tuple: false };
    for n in names {
        match n.as_str() {
            Some("list") => kinds.list = true,
            Some("tuple") => kinds.tuple = true,
            _ => return Err(invalid(notation, "accept must list \"list\" and/or \"tuple\"")),
        }
    }
    Ok(kinds)
}

fn invalid(notation: &Value, reason: &str) -> SchemaError {
    SchemaError::Notation { notation: notation.to_string(), reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKey;
    use serde_json::json;

    fn parse(v: Value) -> (Schema, TypeId) {
        Schema::from_notation(&v).unwrap()
    }

    #[test]
    fn names_and_sentinels() {
        let (schema, t) = parse(json!("int"));
        assert!(matches!(schema.get(t), Ok(Ty::Primitive(Kind::Int))));
        assert_eq!(parse(json!(null)).1, TypeId::NONE);
        assert_eq!(parse(json!("object")).1, TypeId::ANY);
        assert_eq!(parse(json!("never")).1, TypeId::NEVER);
    }

    #[test]
    fn list_templates() {
        let (schema, t) = parse(json!([]));
        assert!(matches!(schema.get(t), Ok(Ty::ListOf(l)) if l.element.is_none()));
        let (schema, t) = parse(json!([["str"]]));
        assert_eq!(schema.render(t).to_string(), "[[str]]");
    }

    #[test]
    fn lists_with_two_types_are_invalid() {
        let err = Schema::from_notation(&json!(["int", "str"])).unwrap_err();
        assert_eq!(err.to_string(), r#"["int","str"] is not a valid type: list must contain 0 or 1 valid inner type"#);
    }

    #[test]
    fn numbers_are_not_types() {
        let err = Schema::from_notation(&json!(1)).unwrap_err();
        assert_eq!(err.to_string(), "1 is not a valid type: Unrecognized type");
    }

    #[test]
    fn mapping_prefixes() {
        let (schema, t) = parse(json!({"abc": "int", "?d": "str", "!?e": "bool", "~a.b": "never"}));
        let Ok(Ty::MappingOf(m)) = schema.get(t) else { panic!("not a mapping") };
        let kinds: Vec<_> = m.fields().iter().map(|f| match &f.key {
            FieldKey::Required(k) => format!("!{k}"),
            FieldKey::Optional(k) => format!("?{k}"),
            FieldKey::Pattern(rx) => format!("~{}", rx.as_str()),
        }).collect();
        assert_eq!(kinds, vec!["!abc", "?d", "!?e", "~a.b"]);
    }

    #[test]
    fn directives() {
        let (schema, t) = parse(json!({"$one_of": ["int", {"$tuple": ["str", null]}, {"$map": ["str", "int"]}]}));
        assert_eq!(schema.render(t).to_string(), "(int | tuple_(str, null) | map_(str, int))");
        let (schema, t) = parse(json!({"$list": {"of": "int", "strict": true, "accept": ["list"]}}));
        assert_eq!(schema.render(t).to_string(), "list_([int], strict, list)");
        let (schema, t) = parse(json!({"$pattern": "^a+$"}));
        assert!(matches!(schema.get(t), Ok(Ty::Predicate(_))));
    }

    #[test]
    fn escaped_directive_is_a_required_key() {
        let (schema, t) = parse(json!({"!$tuple": "int"}));
        assert_eq!(schema.render(t).to_string(), r#"{"$tuple": int}"#);
    }

    #[test]
    fn unknown_directive_and_bad_regex() {
        assert!(matches!(Schema::from_notation(&json!({"$nope": 1})), Err(SchemaError::Notation { .. })));
        assert!(matches!(Schema::from_notation(&json!({"~(": "int"})), Err(SchemaError::Pattern { .. })));
    }
}
