//! Opaque custom checks.
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::TypeId;
use crate::error::SchemaError;
use crate::value::{Heap, Node, ValueId};

pub type CheckFn = dyn Fn(&Heap, ValueId) -> anyhow::Result<bool> + Send + Sync;
pub type ConvertFn = dyn Fn(&mut Heap, ValueId) -> anyhow::Result<ValueId> + Send + Sync;

/// Accepts a value when `check` returns `Ok(true)`. An `Err` counts as a
/// rejection. The value is first checked against `base` (default: any) and
/// the predicate sees the base's coerced result.
///
/// Optional hooks run around that, in this order: `check_before` on the
/// original value, `convert_before` to produce what the base check sees,
/// then the base check and `check`, and finally `convert` on the result.
/// Without hooks a predicate never coerces beyond its base.
#[derive(Clone)]
pub struct Predicate {
    pub name: String,
    pub base: TypeId,
    check: Arc<CheckFn>,
    check_before: Option<Arc<CheckFn>>,
    convert_before: Option<Arc<ConvertFn>>,
    convert: Option<Arc<ConvertFn>>,
}

impl Predicate {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Heap, ValueId) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            base: TypeId::ANY,
            check: Arc::new(check),
            check_before: None,
            convert_before: None,
            convert: None,
        }
    }

    pub fn with_base(mut self, base: TypeId) -> Self {
        self.base = base;
        self
    }

    pub fn check_before<F>(mut self, f: F) -> Self
    where
        F: Fn(&Heap, ValueId) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.check_before = Some(Arc::new(f));
        self
    }

    /// Replace the value before the base check. Output nodes are appended to
    /// the heap; input nodes must not be rewritten.
    pub fn convert_before<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Heap, ValueId) -> anyhow::Result<ValueId> + Send + Sync + 'static,
    {
        self.convert_before = Some(Arc::new(f));
        self
    }

    /// Replace the accepted result.
    pub fn convert<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Heap, ValueId) -> anyhow::Result<ValueId> + Send + Sync + 'static,
    {
        self.convert = Some(Arc::new(f));
        self
    }

    pub fn test(&self, heap: &Heap, value: ValueId) -> anyhow::Result<bool> {
        (self.check)(heap, value)
    }

    /// `Ok(true)` when there is no `check_before` hook.
    pub fn test_before(&self, heap: &Heap, value: ValueId) -> anyhow::Result<bool> {
        self.check_before.as_ref().map_or(Ok(true), |f| f(heap, value))
    }

    pub fn prepare(&self, heap: &mut Heap, value: ValueId) -> anyhow::Result<ValueId> {
        self.convert_before.as_ref().map_or(Ok(value), |f| f(heap, value))
    }

    pub fn finish(&self, heap: &mut Heap, value: ValueId) -> anyhow::Result<ValueId> {
        self.convert.as_ref().map_or(Ok(value), |f| f(heap, value))
    }

    /// Text values in which `pattern` finds a match.
    pub fn matches(pattern: &str) -> Result<Self, SchemaError> {
        let rx = Regex::new(pattern).map_err(|source| SchemaError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::new(format!("matches({pattern:?})"), move |heap, v| match heap.get(v) {
            Node::Str(s) => Ok(rx.is_match(s)),
            _ => Ok(false),
        }))
    }

    /// Exactly one of the listed text or integer literals.
    pub fn one_of_literals<I, S>(literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Node>,
    {
        let allowed: Vec<Node> = literals.into_iter().map(Into::into).collect();
        let name = format!("literal({})", allowed.iter().map(|n| format!("{n:?}")).collect::<Vec<_>>().join(", "));
        Self::new(name, move |heap, v| Ok(allowed.contains(heap.get(v))))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("check_before", &self.check_before.is_some())
            .field("convert_before", &self.convert_before.is_some())
            .field("convert", &self.convert.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_predicate_only_accepts_matching_text() {
        let p = Predicate::matches(r"^\d{3}$").unwrap();
        let mut heap = Heap::new();
        let ok = heap.str("123");
        let bad = heap.str("12a");
        let num = heap.int(123);
        assert!(p.test(&heap, ok).unwrap());
        assert!(!p.test(&heap, bad).unwrap());
        assert!(!p.test(&heap, num).unwrap());
    }

    #[test]
    fn literal_predicate() {
        let p = Predicate::one_of_literals(["on", "off"]);
        let mut heap = Heap::new();
        let on = heap.str("on");
        let other = heap.str("maybe");
        assert!(p.test(&heap, on).unwrap());
        assert!(!p.test(&heap, other).unwrap());
        assert_eq!(p.name, r#"literal(Str("on"), Str("off"))"#);
    }

    #[test]
    fn hooks_default_to_pass_through() {
        let p = Predicate::new("any", |_, _| Ok(true));
        let mut heap = Heap::new();
        let one = heap.int(1);
        assert!(p.test_before(&heap, one).unwrap());
        assert_eq!(p.prepare(&mut heap, one).unwrap(), one);
        assert_eq!(p.finish(&mut heap, one).unwrap(), one);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn convert_appends_a_new_node() {
        let p = Predicate::new("any", |_, _| Ok(true)).convert(|heap, v| {
            let Node::Str(s) = heap.get(v).clone() else { anyhow::bail!("not text") };
            Ok(heap.str(s.to_uppercase()))
        });
        let mut heap = Heap::new();
        let v = heap.str("abc");
        let out = p.finish(&mut heap, v).unwrap();
        assert_ne!(out, v);
        assert_eq!(heap.get(out), &Node::from("ABC"));
        assert_eq!(heap.get(v), &Node::from("abc"));
    }
}
