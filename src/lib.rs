//! Check dynamically-typed tree data against type descriptions and produce a
//! corrected copy.
//!
//! Values live in a [`Heap`] and descriptions in a [`Schema`]; both are
//! arenas addressed by ids, so either side may be recursive or cyclic.
//! [`check`] walks them together and returns the coerced value: single
//! values are wrapped into one-element lists where a list is expected, and
//! shared or cyclic input structure is reproduced in the output.
//!
//! ```
//! use checktype::{check_json, Schema};
//! use serde_json::json;
//!
//! let (schema, ty) = Schema::from_notation(&json!({"name": "str", "?tags": ["str"]})).unwrap();
//! let out = check_json(&json!({"name": "x", "tags": "a"}), &schema, ty).unwrap();
//! assert_eq!(out, json!({"name": "x", "tags": ["a"]}));
//! ```
pub mod checked;
pub mod engine;
pub mod error;
pub mod schema;
pub mod value;

pub use engine::{check, check_json};
pub use error::{Error, Path, SchemaError, Segment, TypeMismatch};
pub use schema::{Field, Kind, ListOf, Predicate, Schema, SeqKinds, Ty, TypeId};
pub use value::{Heap, Node, ValueId};
