//! Matching engine: walks a description and a value in lock-step and builds
//! the coerced copy.
//!
//! Scalars come back as the same `ValueId`. Every accepted container gets a
//! fresh output node, reserved as an empty container of the output kind
//! before its children are checked, so that a cyclic input can point back at
//! it and a predicate looking at it sees the right kind.
mod guard;
mod list;
mod mapping;
mod tuple;

use tracing::debug;

use crate::error::{Error, Path, Segment, TypeMismatch};
use crate::schema::{Predicate, Schema, Ty, TypeId};
use crate::value::{Heap, Node, ValueId};
use guard::{Guard, Hit, Pair};

// longest rendering of a value or type kept in a mismatch
const RENDER_MAX: usize = 120;

type Outcome = Result<ValueId, Error>;

// ------------------------------- Front API -------------------------------- //

/// Check `value` against `ty` and return the coerced value.
///
/// Output nodes are appended to `heap`; nodes that existed before the call
/// are left as they were. Nodes built for an attempt that failed (a rejected
/// alternative, say) are dropped again unless the mismatch refers to one of
/// them. Fails with the first mismatch in traversal order.
pub fn check(heap: &mut Heap, value: ValueId, schema: &Schema, ty: TypeId) -> Outcome {
    let mut engine = Engine::new(heap, schema);
    let result = engine.check(value, ty);
    debug!(ty = ty.0, value = value.0, ok = result.is_ok(), "check finished");
    result
}

/// [`check`] for a JSON document.
pub fn check_json(value: &serde_json::Value, schema: &Schema, ty: TypeId) -> Result<serde_json::Value, Error> {
    let (mut heap, root) = Heap::from_json(value);
    let out = check(&mut heap, root, schema, ty)?;
    Ok(heap.to_json(out)?)
}

// ------------------------------- Engine ----------------------------------- //

pub(crate) struct Engine<'a> {
    heap: &'a mut Heap,
    schema: &'a Schema,
    guard: Guard,
    path: Vec<Segment>,
}

impl<'a> Engine<'a> {
    fn new(heap: &'a mut Heap, schema: &'a Schema) -> Self {
        Self { heap, schema, guard: Guard::new(), path: Vec::new() }
    }

    fn check(&mut self, value: ValueId, ty: TypeId) -> Outcome {
        let pair = Pair { ty, value };
        match self.guard.lookup(pair) {
            Some(Hit::Done(out) | Hit::InProgress(out)) => return Ok(out),
            Some(Hit::Failed(err)) => return Err(self.replay(err)),
            None => {}
        }
        let revisits = self.guard.revisits();
        let result = self.dispatch(value, ty);
        if let Err(Error::Mismatch(err)) = &result {
            if self.guard.revisits() == revisits {
                let relative = err.path.0.get(self.path.len()..).map(<[Segment]>::to_vec).unwrap_or_default();
                self.guard.record_failure(pair, &TypeMismatch { path: Path(relative), ..err.clone() });
            }
        }
        result
    }

    /// A memoized failure, re-rooted at the current position.
    fn replay(&self, err: TypeMismatch) -> Error {
        let mut path = self.path.clone();
        path.extend(err.path.0.iter().cloned());
        Error::Mismatch(TypeMismatch { path: Path(path), ..err })
    }

    fn dispatch(&mut self, value: ValueId, ty: TypeId) -> Outcome {
        let schema = self.schema;
        match schema.get(ty)? {
            Ty::Any => Ok(value),
            Ty::Never => Err(self.mismatch(value, ty, None)),
            Ty::NoneType => self.accept_if(self.heap.get(value).is_null(), value, ty),
            Ty::Primitive(kind) => self.accept_if(kind.admits(self.heap.get(value)), value, ty),
            Ty::OneOf(alts) => self.check_one_of(value, ty, alts),
            Ty::ListOf(list) => self.check_list(value, ty, *list),
            Ty::MappingOf(mapping) => self.check_mapping(value, ty, mapping),
            Ty::FixedTuple(slots) => self.check_tuple(value, ty, slots),
            Ty::KeyedMap { key, value: of } => self.check_keyed_map(value, ty, *key, *of),
            Ty::Predicate(p) => self.check_predicate(value, ty, p),
        }
    }

    fn check_one_of(&mut self, value: ValueId, ty: TypeId, alts: &[TypeId]) -> Outcome {
        if alts.is_empty() {
            return self.accept_if(!self.heap.get(value).is_null(), value, ty);
        }
        self.pending(value, ty, |eng| {
            for alt in alts {
                match eng.check(value, *alt) {
                    Err(Error::Mismatch(_)) => continue,
                    other => return other,
                }
            }
            Err(eng.mismatch(value, ty, None))
        })
    }

    fn check_predicate(&mut self, value: ValueId, ty: TypeId, p: &Predicate) -> Outcome {
        let hook_failed = |eng: &Self, hook: &str, e: anyhow::Error| {
            eng.mismatch(value, ty, Some(format!("{hook} {} failed: {e:#}", p.name)))
        };
        match p.test_before(self.heap, value) {
            Ok(true) => {}
            Ok(false) => return Err(self.mismatch(value, ty, Some(format!("check_before {} returns false", p.name)))),
            Err(e) => return Err(hook_failed(&*self, "check_before", e)),
        }
        let prepared = match p.prepare(self.heap, value) {
            Ok(v) => v,
            Err(e) => return Err(hook_failed(&*self, "convert_before", e)),
        };
        let base = if p.base == TypeId::ANY {
            prepared
        } else {
            self.pending(value, ty, |eng| eng.check(prepared, p.base))?
        };
        match p.test(self.heap, base) {
            Ok(true) => {}
            Ok(false) => return Err(self.mismatch(value, ty, Some(format!("check {} returns false", p.name)))),
            Err(e) => return Err(hook_failed(&*self, "check", e)),
        }
        match p.finish(self.heap, base) {
            Ok(out) => Ok(out),
            Err(e) => Err(hook_failed(&*self, "convert", e)),
        }
    }

    // ----------------------------- Descent -------------------------------- //

    /// Build a container output for `(ty, value)` under the guard. The output
    /// holds `shell` until `build` returns the finished node.
    fn descend<F>(&mut self, value: ValueId, ty: TypeId, shell: Node, build: F) -> Outcome
    where
        F: FnOnce(&mut Self) -> Result<Node, Error>,
    {
        let pair = Pair { ty, value };
        let out = self.heap.alloc(shell);
        let scope = self.guard.enter(pair, out);
        let built = build(self);
        self.guard.leave(pair, scope, built.is_ok());
        match built {
            Ok(node) => {
                self.heap.set(out, node);
                Ok(out)
            }
            Err(err) => {
                // nothing outside this attempt refers to its nodes
                if err.as_mismatch().map_or(true, |m| m.value < out) {
                    self.heap.truncate(out);
                    self.guard.forget_from(out);
                }
                Err(err)
            }
        }
    }

    /// Run a non-container step (promotion, predicate base, alternatives)
    /// that must not re-enter itself for the same pair.
    fn pending<F>(&mut self, value: ValueId, ty: TypeId, step: F) -> Outcome
    where
        F: FnOnce(&mut Self) -> Outcome,
    {
        let pair = Pair { ty, value };
        if !self.guard.begin_pending(pair) {
            return Err(self.mismatch(value, ty, Some("value would contain itself infinitely".into())));
        }
        let result = step(self);
        self.guard.end_pending(pair);
        result
    }

    fn check_at(&mut self, seg: Segment, value: ValueId, ty: TypeId) -> Outcome {
        self.path.push(seg);
        let result = self.check(value, ty);
        self.path.pop();
        result
    }

    // ----------------------------- Failures ------------------------------- //

    fn accept_if(&self, ok: bool, value: ValueId, ty: TypeId) -> Outcome {
        if ok { Ok(value) } else { Err(self.mismatch(value, ty, None)) }
    }

    fn mismatch(&self, value: ValueId, ty: TypeId, info: Option<String>) -> Error {
        Error::Mismatch(TypeMismatch {
            value,
            ty,
            value_repr: self.heap.render_short(value, RENDER_MAX),
            ty_repr: self.schema.render_short(ty, RENDER_MAX),
            path: Path(self.path.clone()),
            info,
        })
    }
}
