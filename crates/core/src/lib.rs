//! Core vocabulary for typedkv
//!
//! This crate defines the foundational types the typed KV layer is built
//! from:
//! - KeyPart / Key: ordered, typed key components with a total order
//! - KeyShape / Schema / Variant: the closed (key shape, value kind) union
//! - Entry / MaybeEntry: the canonical record and its absent form
//! - Versionstamp / CommitOutcome: optimistic-concurrency tokens and results
//! - RawValue and the codec traits: how caller values reach the store
//! - ListSelector / ScanRange: range selection and its lowering
//! - Error: the error taxonomy (conflicts are values, not errors)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod error;
pub mod key;
pub mod limits;
pub mod part;
pub mod schema;
pub mod selector;
pub mod typed;
pub mod value;
pub mod version;

pub use entry::{Entry, MaybeEntry};
pub use error::{Error, Result};
pub use key::Key;
pub use part::{KeyPart, PartType};
pub use schema::{KeyShape, Schema, SchemaBuilder, SchemaError, ShapePart, ValueKind, Variant};
pub use selector::{ListSelector, ScanRange};
pub use typed::{Counter, EncodeValue, KeySpace, Raw, SerdeBincode, TypedKey, TypedPrefix, ValueCodec, ValueOf};
pub use value::RawValue;
pub use version::{CommitOutcome, ParseVersionstampError, Versionstamp};
