//! Error types shared by the engine, the schema builders and the adapter.
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::schema::TypeId;
use crate::value::{CycleError, ValueId};

/// One step from a parent value to a child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Segment {
    Index(usize),
    Key(String),
}

/// Location of a value relative to the checked root, printed as `$[0].abc`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Path(pub Vec<Segment>);

impl Path {
    pub fn root() -> Self { Self::default() }
    pub fn segments(&self) -> &[Segment] { &self.0 }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for seg in &self.0 {
            match seg {
                Segment::Index(i) => write!(f, "[{i}]")?,
                Segment::Key(k) if is_plain_key(k) => write!(f, ".{k}")?,
                Segment::Key(k) => write!(f, "[{k:?}]")?,
            }
        }
        Ok(())
    }
}

fn is_plain_key(k: &str) -> bool {
    let mut chars = k.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The single matching failure: no rule accepts `value` at `path`.
#[derive(Clone, Debug, Error, Serialize)]
#[error("at {path}: {value_repr} cannot match type {ty_repr}{}", .info.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
pub struct TypeMismatch {
    #[serde(skip)]
    pub value: ValueId,
    #[serde(skip)]
    pub ty: TypeId,
    #[serde(rename = "value")]
    pub value_repr: String,
    #[serde(rename = "type")]
    pub ty_repr: String,
    pub path: Path,
    pub info: Option<String>,
}

/// A description that cannot be used.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("type {0:?} was reserved but never defined")]
    Unbound(TypeId),
    #[error("type {0:?} is already defined")]
    AlreadyDefined(TypeId),
    #[error("invalid key pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("{notation} is not a valid type: {reason}")]
    Notation { notation: String, reason: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Mismatch(#[from] TypeMismatch),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

impl Error {
    pub fn as_mismatch(&self) -> Option<&TypeMismatch> {
        match self {
            Error::Mismatch(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_print_like_accessors() {
        let p = Path(vec![
            Segment::Index(4),
            Segment::Key("abc".into()),
            Segment::Key("odd key".into()),
            Segment::Index(0),
        ]);
        assert_eq!(p.to_string(), r#"$[4].abc["odd key"][0]"#);
        assert_eq!(Path::root().to_string(), "$");
    }

    #[test]
    fn mismatch_message_includes_info() {
        let m = TypeMismatch {
            value: ValueId(0),
            ty: TypeId(0),
            value_repr: "{}".into(),
            ty_repr: r#"{"b": int}"#.into(),
            path: Path::root(),
            info: Some("key 'b' is required".into()),
        };
        assert_eq!(m.to_string(), r#"at $: {} cannot match type {"b": int}: key 'b' is required"#);
    }
}
