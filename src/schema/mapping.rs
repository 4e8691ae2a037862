use std::collections::HashMap;

use regex::Regex;

use super::TypeId;
use crate::error::SchemaError;

#[derive(Clone, Debug)]
pub enum FieldKey {
    Required(String),
    Optional(String),
    /// Applies to every key not claimed by a `Required`/`Optional` field
    /// that the regex finds a match in.
    Pattern(Regex),
}

#[derive(Clone, Debug)]
pub struct Field {
    pub key: FieldKey,
    pub ty: TypeId,
}

impl Field {
    pub fn required(key: impl Into<String>, ty: TypeId) -> Self {
        Self { key: FieldKey::Required(key.into()), ty }
    }

    pub fn optional(key: impl Into<String>, ty: TypeId) -> Self {
        Self { key: FieldKey::Optional(key.into()), ty }
    }

    pub fn pattern(pattern: &str, ty: TypeId) -> Result<Self, SchemaError> {
        let rx = Regex::new(pattern).map_err(|source| SchemaError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { key: FieldKey::Pattern(rx), ty })
    }

    /// Everything not otherwise declared must not be present.
    pub fn closed() -> Self {
        Self { key: FieldKey::Pattern(Regex::new("").expect("empty regex")), ty: TypeId::NEVER }
    }
}

/// Field declarations of a mapping template, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct Mapping {
    fields: Vec<Field>,
    // declared key -> index of its last declaration
    claimed: HashMap<String, usize>,
}

impl Mapping {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        let fields: Vec<Field> = fields.into_iter().collect();
        let mut claimed = HashMap::new();
        for (i, f) in fields.iter().enumerate() {
            match &f.key {
                FieldKey::Required(k) | FieldKey::Optional(k) => { claimed.insert(k.clone(), i); }
                FieldKey::Pattern(_) => {}
            }
        }
        Self { fields, claimed }
    }

    pub fn fields(&self) -> &[Field] { &self.fields }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    /// Keys whose absence is a mismatch, in declaration order.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().enumerate().filter_map(|(i, f)| match &f.key {
            FieldKey::Required(k) if self.claimed.get(k) == Some(&i) => Some(k.as_str()),
            _ => None,
        })
    }

    /// Type of a value stored under `key`: its declaration, else the first
    /// matching pattern, else `None` (passed through unexamined).
    pub fn type_for(&self, key: &str) -> Option<TypeId> {
        if let Some(i) = self.claimed.get(key) {
            return Some(self.fields[*i].ty);
        }
        self.fields.iter().find_map(|f| match &f.key {
            FieldKey::Pattern(rx) if rx.is_match(key) => Some(f.ty),
            _ => None,
        })
    }
}
