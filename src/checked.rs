//! Checked calls: bind arguments to a [`Signature`], check and coerce each
//! one, run the callee, then check what it returns.
//!
//! ```
//! use checktype::checked::{checked, Args, Signature};
//! use checktype::{Heap, Kind, Node, Schema};
//!
//! let mut schema = Schema::new();
//! let int = schema.primitive(Kind::Int);
//! let double = checked(&schema, Signature::new().param("x", int).returns(int), |heap, args| {
//!     let Some(Node::Int(x)) = args.get("x").map(|x| heap.get(x).clone()) else { anyhow::bail!("no x") };
//!     Ok(heap.int(x * 2))
//! });
//!
//! let mut heap = Heap::new();
//! let four = heap.int(4);
//! let out = double.call(&mut heap, Args::new().arg(four)).unwrap();
//! assert_eq!(heap.get(out), &Node::Int(8));
//! ```
use indexmap::IndexMap;
use thiserror::Error;
use tracing::warn;

use crate::engine::check;
use crate::error::{Error, TypeMismatch};
use crate::schema::{Schema, TypeId};
use crate::value::{Heap, ValueId};

// ------------------------------- Signature -------------------------------- //

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// `None` leaves the argument unchecked.
    pub ty: Option<TypeId>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Option<TypeId>) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Parameters in declaration order plus the optional variadic slots.
///
/// The variadic-positional slot collects surplus positional arguments and the
/// variadic-keyword slot collects unknown keyword arguments. A slot's
/// description applies to each collected argument.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub var_positional: Option<Param>,
    pub var_keyword: Option<Param>,
    pub returns: Option<TypeId>,
}

impl Signature {
    pub fn new() -> Self { Self::default() }

    pub fn param(mut self, name: impl Into<String>, ty: TypeId) -> Self {
        self.params.push(Param::new(name, Some(ty)));
        self
    }

    pub fn untyped(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::new(name, None));
        self
    }

    pub fn var_positional(mut self, name: impl Into<String>, ty: Option<TypeId>) -> Self {
        self.var_positional = Some(Param::new(name, ty));
        self
    }

    pub fn var_keyword(mut self, name: impl Into<String>, ty: Option<TypeId>) -> Self {
        self.var_keyword = Some(Param::new(name, ty));
        self
    }

    pub fn returns(mut self, ty: TypeId) -> Self {
        self.returns = Some(ty);
        self
    }

    /// True if anything in the signature carries a description.
    pub fn is_described(&self) -> bool {
        self.returns.is_some()
            || self.params.iter()
                .chain(&self.var_positional)
                .chain(&self.var_keyword)
                .any(|p| p.ty.is_some())
    }

    fn declares(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }
}

// ------------------------------- Arguments -------------------------------- //

#[derive(Clone, Debug, Default)]
pub struct Args {
    pub positional: Vec<ValueId>,
    pub keyword: IndexMap<String, ValueId>,
}

impl Args {
    pub fn new() -> Self { Self::default() }

    pub fn arg(mut self, value: ValueId) -> Self {
        self.positional.push(value);
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: ValueId) -> Self {
        self.keyword.insert(name.into(), value);
        self
    }
}

/// Arguments as the callee sees them, after binding and coercion.
#[derive(Clone, Debug, Default)]
pub struct Bound {
    /// Declared parameters, in declaration order.
    pub params: IndexMap<String, ValueId>,
    pub var_positional: Vec<ValueId>,
    pub var_keyword: IndexMap<String, ValueId>,
}

impl Bound {
    pub fn get(&self, name: &str) -> Option<ValueId> { self.params.get(name).copied() }
}

// ------------------------------- Errors ----------------------------------- //

#[derive(Debug, Error)]
pub enum CallError {
    #[error("cannot bind arguments: {0}")]
    Binding(String),
    #[error("argument '{param}': {mismatch}")]
    Argument { param: String, mismatch: TypeMismatch },
    #[error("return value: {0}")]
    Return(TypeMismatch),
    #[error(transparent)]
    Callee(anyhow::Error),
    #[error(transparent)]
    Check(Error),
}

impl CallError {
    pub fn mismatch(&self) -> Option<&TypeMismatch> {
        match self {
            CallError::Argument { mismatch, .. } | CallError::Return(mismatch) => Some(mismatch),
            _ => None,
        }
    }
}

fn lift(err: Error, site: impl FnOnce(TypeMismatch) -> CallError) -> CallError {
    match err {
        Error::Mismatch(m) => site(m),
        other => CallError::Check(other),
    }
}

// ------------------------------- Adapter ---------------------------------- //

pub struct Checked<'s, F> {
    schema: &'s Schema,
    signature: Signature,
    f: F,
}

/// Wrap `f` so that every call goes through `signature`'s descriptions.
pub fn checked<F>(schema: &Schema, signature: Signature, f: F) -> Checked<'_, F>
where
    F: Fn(&mut Heap, &Bound) -> anyhow::Result<ValueId>,
{
    if !signature.is_described() {
        warn!(params = signature.params.len(), "signature has no descriptions; calls pass through unchecked");
    }
    Checked { schema, signature, f }
}

impl<F> Checked<'_, F>
where
    F: Fn(&mut Heap, &Bound) -> anyhow::Result<ValueId>,
{
    pub fn signature(&self) -> &Signature { &self.signature }

    pub fn call(&self, heap: &mut Heap, args: Args) -> Result<ValueId, CallError> {
        let mut bound = self.bind(args)?;
        self.check_args(heap, &mut bound)?;
        let out = (self.f)(heap, &bound).map_err(CallError::Callee)?;
        match self.signature.returns {
            Some(ty) => check(heap, out, self.schema, ty).map_err(|e| lift(e, CallError::Return)),
            None => Ok(out),
        }
    }

    fn bind(&self, args: Args) -> Result<Bound, CallError> {
        let sig = &self.signature;
        let mut positional = args.positional;
        let surplus = positional.split_off(positional.len().min(sig.params.len()));

        let mut given: IndexMap<String, ValueId> = sig.params.iter()
            .zip(positional)
            .map(|(p, v)| (p.name.clone(), v))
            .collect();

        if sig.var_positional.is_none() && !surplus.is_empty() {
            return Err(CallError::Binding(format!(
                "takes {} positional arguments but {} were given",
                sig.params.len(),
                sig.params.len() + surplus.len(),
            )));
        }

        let mut extra = IndexMap::new();
        for (name, v) in args.keyword {
            if sig.declares(&name) {
                if given.contains_key(&name) {
                    return Err(CallError::Binding(format!("got multiple values for argument '{name}'")));
                }
                given.insert(name, v);
            } else if sig.var_keyword.is_some() {
                extra.insert(name, v);
            } else {
                return Err(CallError::Binding(format!("got an unexpected keyword argument '{name}'")));
            }
        }

        let mut params = IndexMap::with_capacity(sig.params.len());
        for p in &sig.params {
            let Some(v) = given.get(&p.name) else {
                return Err(CallError::Binding(format!("missing required argument '{}'", p.name)));
            };
            params.insert(p.name.clone(), *v);
        }
        Ok(Bound { params, var_positional: surplus, var_keyword: extra })
    }

    fn check_args(&self, heap: &mut Heap, bound: &mut Bound) -> Result<(), CallError> {
        for p in &self.signature.params {
            let (Some(ty), Some(v)) = (p.ty, bound.get(&p.name)) else { continue };
            let out = self.check_param(heap, &p.name, v, ty)?;
            bound.params.insert(p.name.clone(), out);
        }
        if let Some(Param { name, ty: Some(ty) }) = &self.signature.var_positional {
            for (i, v) in bound.var_positional.iter_mut().enumerate() {
                *v = self.check_param(heap, &format!("{name}[{i}]"), *v, *ty)?;
            }
        }
        if let Some(Param { ty: Some(ty), .. }) = &self.signature.var_keyword {
            for (key, v) in bound.var_keyword.iter_mut() {
                *v = self.check_param(heap, key, *v, *ty)?;
            }
        }
        Ok(())
    }

    fn check_param(&self, heap: &mut Heap, name: &str, value: ValueId, ty: TypeId) -> Result<ValueId, CallError> {
        check(heap, value, self.schema, ty)
            .map_err(|e| lift(e, |mismatch| CallError::Argument { param: name.to_string(), mismatch }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::Kind;
    use crate::value::Node;

    fn text(heap: &Heap, v: ValueId) -> String {
        match heap.get(v) {
            Node::Str(s) => s.clone(),
            _ => String::new(),
        }
    }

    fn ints(heap: &Heap, xs: &[ValueId]) -> Vec<i64> {
        xs.iter()
            .filter_map(|x| match heap.get(*x) { Node::Int(i) => Some(*i), _ => None })
            .collect()
    }

    /// `(a: str | int, b: str | int) -> str`
    fn concat_schema() -> (Schema, TypeId, TypeId) {
        let (mut schema, str_or_int) = Schema::from_notation(&json!({"$one_of": ["str", "int"]})).unwrap();
        let s = schema.parse_notation(&json!("str")).unwrap();
        (schema, str_or_int, s)
    }

    fn concat(heap: &mut Heap, args: &Bound) -> anyhow::Result<ValueId> {
        let (a, b) = (args.get("a").unwrap(), args.get("b").unwrap());
        match (heap.get(a).clone(), heap.get(b).clone()) {
            (Node::Str(x), Node::Str(y)) => Ok(heap.str(x + &y)),
            (Node::Int(x), Node::Int(y)) => Ok(heap.int(x + y)),
            _ => anyhow::bail!("mixed operands"),
        }
    }

    #[test]
    fn arguments_and_result_are_checked() {
        let (schema, str_or_int, s) = concat_schema();
        let sig = Signature::new().param("a", str_or_int).param("b", str_or_int).returns(s);
        let f = checked(&schema, sig, concat);
        let mut heap = Heap::new();

        let (a, b) = (heap.str("a"), heap.str("b"));
        let out = f.call(&mut heap, Args::new().arg(a).arg(b)).unwrap();
        assert_eq!(heap.get(out), &Node::Str("ab".into()));

        let (one, two) = (heap.int(1), heap.int(2));
        let err = f.call(&mut heap, Args::new().arg(one).arg(two)).unwrap_err();
        assert!(matches!(&err, CallError::Return(m) if m.value_repr == "3"));
        assert_eq!(err.to_string(), "return value: at $: 3 cannot match type str");

        let (x, y) = (heap.float(1.0), heap.float(2.0));
        let err = f.call(&mut heap, Args::new().arg(x).arg(y)).unwrap_err();
        assert!(matches!(&err, CallError::Argument { param, .. } if param == "a"));
        assert_eq!(err.mismatch().unwrap().ty_repr, "(str | int)");
    }

    /// `(a: str, *args: int, **kwargs: bool)`
    fn joiner(schema: &mut Schema) -> Signature {
        let s = schema.primitive(Kind::Str);
        let int = schema.primitive(Kind::Int);
        let flag = schema.primitive(Kind::Bool);
        Signature::new()
            .param("a", s)
            .var_positional("args", Some(int))
            .var_keyword("kwargs", Some(flag))
    }

    fn join(heap: &mut Heap, args: &Bound) -> anyhow::Result<ValueId> {
        let sep = text(heap, args.get("a").unwrap());
        let nums = ints(heap, &args.var_positional);
        let join = args.var_keyword.get("join").is_some_and(|j| heap.get(*j) == &Node::Bool(true));
        let out = if join {
            nums.iter().map(i64::to_string).collect::<Vec<_>>().join(&sep)
        } else {
            format!("{sep}{}", nums.iter().sum::<i64>())
        };
        Ok(heap.str(out))
    }

    #[test]
    fn variadic_arguments_are_checked_one_by_one() {
        let mut schema = Schema::new();
        let sig = joiner(&mut schema);
        let f = checked(&schema, sig, join);
        let mut heap = Heap::new();
        let a = heap.str("a");
        let (two, three, five) = (heap.int(2), heap.int(3), heap.int(5));

        let out = f.call(&mut heap, Args::new().arg(a).arg(two).arg(three)).unwrap();
        assert_eq!(heap.get(out), &Node::Str("a5".into()));

        let b = heap.str("b");
        let err = f.call(&mut heap, Args::new().arg(a).arg(b).arg(two)).unwrap_err();
        let CallError::Argument { param, mismatch } = err else { panic!("expected an argument error") };
        assert_eq!(param, "args[0]");
        assert_eq!(mismatch.value_repr, r#""b""#);
        assert_eq!(mismatch.path.to_string(), "$");

        let yes = heap.bool(true);
        let out = f.call(&mut heap, Args::new().arg(a).arg(five).kwarg("join", yes)).unwrap();
        assert_eq!(heap.get(out), &Node::Str("5".into()));

        let one = heap.int(1);
        let err = f.call(&mut heap, Args::new().arg(a).arg(five).kwarg("join", one)).unwrap_err();
        let CallError::Argument { param, mismatch } = err else { panic!("expected an argument error") };
        assert_eq!(param, "join");
        assert_eq!(mismatch.to_string(), "at $: 1 cannot match type bool");
    }

    #[test]
    fn only_described_parameters_are_checked() {
        let (schema, int) = Schema::from_notation(&json!("int")).unwrap();
        let sig = Signature::new().untyped("a").param("b", int);
        let f = checked(&schema, sig, |heap: &mut Heap, args: &Bound| {
            match (heap.get(args.get("a").unwrap()), heap.get(args.get("b").unwrap())) {
                (Node::Int(a), Node::Int(b)) => {
                    let sum = a + b;
                    Ok(heap.int(sum))
                }
                _ => anyhow::bail!("operands must be ints"),
            }
        });
        let mut heap = Heap::new();
        let (a, b) = (heap.str("a"), heap.str("b"));
        let err = f.call(&mut heap, Args::new().arg(a).arg(b)).unwrap_err();
        assert!(matches!(err, CallError::Argument { ref param, .. } if param == "b"));

        let (one, two) = (heap.int(1), heap.int(2));
        let out = f.call(&mut heap, Args::new().arg(one).arg(two)).unwrap();
        assert_eq!(heap.get(out), &Node::Int(3));
    }

    #[test]
    fn arguments_are_coerced_before_the_call() {
        let (schema, list) = Schema::from_notation(&json!(["int"])).unwrap();
        let f = checked(&schema, Signature::new().param("xs", list), |_: &mut Heap, args: &Bound| {
            Ok(args.get("xs").unwrap())
        });
        let mut heap = Heap::new();
        let one = heap.int(1);
        let out = f.call(&mut heap, Args::new().kwarg("xs", one)).unwrap();
        assert_eq!(heap.to_json(out).unwrap(), json!([1]));
    }

    #[test]
    fn variadic_arguments_are_coerced_in_place() {
        let (schema, list) = Schema::from_notation(&json!(["int"])).unwrap();
        let sig = Signature::new().var_positional("rest", Some(list)).var_keyword("opts", Some(list));
        let f = checked(&schema, sig, |heap: &mut Heap, args: &Bound| {
            let opts = heap.map(args.var_keyword.clone());
            let rest = heap.list(args.var_positional.clone());
            Ok(heap.list(vec![rest, opts]))
        });
        let mut heap = Heap::new();
        let (one, two, three) = (heap.int(1), heap.int(2), heap.int(3));
        let pair = heap.list(vec![two, three]);
        let out = f.call(&mut heap, Args::new().arg(one).arg(pair).kwarg("k", one)).unwrap();
        assert_eq!(heap.to_json(out).unwrap(), json!([[[1], [2, 3]], {"k": [1]}]));
    }

    #[test]
    fn binding_errors() {
        let (schema, int) = Schema::from_notation(&json!("int")).unwrap();
        let f = checked(&schema, Signature::new().param("a", int), |_: &mut Heap, args: &Bound| {
            Ok(args.get("a").unwrap())
        });
        let mut heap = Heap::new();
        let one = heap.int(1);

        let err = f.call(&mut heap, Args::new().arg(one).arg(one)).unwrap_err();
        assert_eq!(err.to_string(), "cannot bind arguments: takes 1 positional arguments but 2 were given");
        let err = f.call(&mut heap, Args::new().arg(one).kwarg("a", one)).unwrap_err();
        assert_eq!(err.to_string(), "cannot bind arguments: got multiple values for argument 'a'");
        let err = f.call(&mut heap, Args::new().kwarg("b", one)).unwrap_err();
        assert_eq!(err.to_string(), "cannot bind arguments: got an unexpected keyword argument 'b'");
        let err = f.call(&mut heap, Args::new()).unwrap_err();
        assert_eq!(err.to_string(), "cannot bind arguments: missing required argument 'a'");
    }

    #[test]
    fn undescribed_signatures_pass_through() {
        let schema = Schema::new();
        let sig = Signature::new().untyped("a").var_positional("rest", None);
        assert!(!sig.is_described());
        let f = checked(&schema, sig, |heap: &mut Heap, args: &Bound| {
            let rest = heap.list(args.var_positional.clone());
            Ok(heap.list(vec![args.get("a").unwrap(), rest]))
        });
        let mut heap = Heap::new();
        let (a, b) = (heap.str("x"), heap.float(0.5));
        let out = f.call(&mut heap, Args::new().arg(a).arg(b)).unwrap();
        assert_eq!(heap.to_json(out).unwrap(), json!(["x", [0.5]]));
    }

    #[test]
    fn callee_errors_are_kept() {
        let (schema, int) = Schema::from_notation(&json!("int")).unwrap();
        let f = checked(&schema, Signature::new().param("a", int), |_: &mut Heap, _: &Bound| {
            anyhow::bail!("callee gave up")
        });
        let mut heap = Heap::new();
        let one = heap.int(1);
        let err = f.call(&mut heap, Args::new().arg(one)).unwrap_err();
        assert!(matches!(err, CallError::Callee(_)));
        assert_eq!(err.to_string(), "callee gave up");
    }
}
