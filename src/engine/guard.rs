//! Identity-keyed bookkeeping for one top-level check.
//!
//! Keys are `(TypeId, ValueId)` pairs. Four tables:
//! - `active`: composite descents still running, with the output node being
//!   built; a revisit answers with that node, reproducing the input's cycle
//! - `succeeded`: finished composite matches, so shared input nodes stay shared
//!   in the output; journaled so a failed ancestor can take them back
//! - `failed`: replayed on revisit; paths are stored relative to the pair
//! - `pending`: promotions, predicate bases and alternatives in flight,
//!   scoped to the nearest composite descent; a revisit is a mismatch
//!
//! A failure caused by a pending revisit depends on what is in flight, so it
//! is not memoized (nor is anything that failed because of it).
use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::error::TypeMismatch;
use crate::schema::TypeId;
use crate::value::ValueId;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct Pair {
    pub ty: TypeId,
    pub value: ValueId,
}

pub(crate) enum Hit {
    Done(ValueId),
    InProgress(ValueId),
    Failed(TypeMismatch),
}

/// Saved state of an enclosing scope, handed back on [`Guard::leave`].
pub(crate) struct Scope {
    mark: usize,
    pending: HashSet<Pair>,
}

#[derive(Default)]
pub(crate) struct Guard {
    active: HashMap<Pair, ValueId>,
    succeeded: HashMap<Pair, ValueId>,
    journal: Vec<Pair>,
    failed: HashMap<Pair, TypeMismatch>,
    pending: HashSet<Pair>,
    revisits: u64,
}

impl Guard {
    pub fn new() -> Self { Self::default() }

    pub fn lookup(&self, pair: Pair) -> Option<Hit> {
        if let Some(out) = self.succeeded.get(&pair) {
            return Some(Hit::Done(*out));
        }
        if let Some(err) = self.failed.get(&pair) {
            return Some(Hit::Failed(err.clone()));
        }
        if let Some(out) = self.active.get(&pair) {
            trace!(ty = pair.ty.0, value = pair.value.0, "re-entered active pair");
            return Some(Hit::InProgress(*out));
        }
        None
    }

    pub fn record_failure(&mut self, pair: Pair, err: &TypeMismatch) {
        self.failed.entry(pair).or_insert_with(|| err.clone());
    }

    /// Start a composite descent whose output will live at `out`.
    pub fn enter(&mut self, pair: Pair, out: ValueId) -> Scope {
        self.active.insert(pair, out);
        Scope { mark: self.journal.len(), pending: std::mem::take(&mut self.pending) }
    }

    pub fn leave(&mut self, pair: Pair, scope: Scope, ok: bool) {
        let out = self.active.remove(&pair);
        self.pending = scope.pending;
        match out {
            Some(out) if ok => {
                self.succeeded.insert(pair, out);
                self.journal.push(pair);
            }
            _ => {
                for p in self.journal.drain(scope.mark..) {
                    self.succeeded.remove(&p);
                }
            }
        }
    }

    /// Forget failures that mention nodes from `from` on, once those nodes
    /// are dropped.
    pub fn forget_from(&mut self, from: ValueId) {
        self.failed.retain(|p, err| p.value < from && err.value < from);
    }

    /// False if `pair` is already in flight in this scope.
    pub fn begin_pending(&mut self, pair: Pair) -> bool {
        let fresh = self.pending.insert(pair);
        if !fresh {
            self.revisits += 1;
        }
        fresh
    }

    /// Number of pending revisits so far. A failure is only memoized when
    /// this did not move while it was computed.
    pub fn revisits(&self) -> u64 { self.revisits }

    pub fn end_pending(&mut self, pair: Pair) { self.pending.remove(&pair); }
}
