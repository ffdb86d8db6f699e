//! typedkv - A strongly-typed client layer over an ordered, versioned
//! key-value store.
//!
//! A key space is declared once as a closed set of key shapes, each paired
//! with a value type. The [`Kv`] facade then narrows every operation through
//! that declaration: reads come back as the variant's own type, counter
//! merges only compile against counter keys, and prefixes list as the value
//! type their variants share.
//!
//! # Quick Start
//!
//! ```ignore
//! use typedkv::{Kv, MemoryStore};
//!
//! // ChatSpace, Preferences, VisitCount: the application's declared keys.
//! let kv: Kv<ChatSpace> = Kv::new(MemoryStore::new());
//!
//! kv.set(&Preferences("ada".into()), &prefs)?;
//! let entry = kv.get(&Preferences("ada".into()))?;
//!
//! kv.atomic()
//!     .check(&entry)
//!     .sum(&VisitCount, 1)
//!     .commit()?;
//! ```
//!
//! # Architecture
//!
//! The store engine sits behind the [`Store`] trait; [`MemoryStore`] is the
//! in-process implementation. Everything above it (the schema model, key
//! algebra, typed narrowing, the atomic builder, list/queue/watch) is
//! engine-agnostic.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod atomic;
mod kv;
mod list;
mod queue;
mod tuple;
mod watch;

pub use atomic::{commit_versionstamp, AtomicOp};
pub use kv::Kv;
pub use list::{ListIter, ListOptions};
pub use queue::{EnqueueOptions, QueueListener};
pub use tuple::KeyTuple;
pub use watch::Watch;

pub use typedkv_core::{
    key_shape, limits, CommitOutcome, Counter, EncodeValue, Entry, Error, Key, KeyPart, KeyShape,
    KeySpace, ListSelector, MaybeEntry, PartType, Raw, RawValue, Result, ScanRange, Schema,
    SchemaBuilder, SchemaError, SerdeBincode, ShapePart, TypedKey, TypedPrefix, ValueCodec,
    ValueKind, ValueOf, Variant, Versionstamp,
};
pub use typedkv_store::{
    Check, Consistency, Enqueued, MemoryStore, MessageId, Mutation, QueueMessage, Store,
    WatchHandle,
};
