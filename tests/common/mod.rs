//! Shared test fixtures for the integration suites.
//!
//! Declares one application key space (a small chat service) with typed
//! keys covering every value kind: serde-encoded blobs, a counter, and a
//! versionstamp-keyed event log.
//! Import via `mod common;` from a test's main.rs.

#![allow(dead_code)]

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
pub use typedkv::{
    key_shape, Counter, Key, KeyPart, KeySpace, Kv, MemoryStore, PartType, Schema, SerdeBincode,
    TypedKey, TypedPrefix, ValueKind,
};

// ============================================================================
// The chat key space
// ============================================================================

static CHAT_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::builder()
        .variant(
            "preferences",
            key_shape!["preferences", PartType::Str],
            ValueKind::Blob,
        )
        .variant(
            "messages",
            key_shape!["messages", PartType::Str, PartType::Int],
            ValueKind::Blob,
        )
        .variant("visits", key_shape!["visits", PartType::Str], ValueKind::Counter)
        .variant("events", key_shape!["events", PartType::Bytes], ValueKind::Blob)
        .build()
        .expect("chat schema is valid")
});

/// The key space every integration test runs against.
pub struct ChatSpace;

impl KeySpace for ChatSpace {
    fn schema() -> &'static Schema {
        &CHAT_SCHEMA
    }
}

/// A fresh typed store over an empty in-memory engine.
pub fn chat_kv() -> Kv<ChatSpace> {
    Kv::new(MemoryStore::new())
}

// ============================================================================
// Typed keys
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: String,
    pub notifications: bool,
}

pub fn prefs(theme: &str) -> Preferences {
    Preferences {
        theme: theme.to_string(),
        notifications: true,
    }
}

/// `["preferences", user]` → [`Preferences`]
pub struct UserPrefs(pub String);

impl TypedKey<ChatSpace> for UserPrefs {
    type Codec = SerdeBincode<Preferences>;

    fn key(&self) -> Key {
        Key::from(("preferences", self.0.as_str()))
    }
}

/// `["messages", thread, seq]` → `String`
pub struct Message {
    pub thread: String,
    pub seq: i64,
}

impl Message {
    pub fn new(thread: &str, seq: i64) -> Self {
        Message {
            thread: thread.to_string(),
            seq,
        }
    }
}

impl TypedKey<ChatSpace> for Message {
    type Codec = SerdeBincode<String>;

    fn key(&self) -> Key {
        Key::from(("messages", self.thread.as_str(), self.seq))
    }
}

/// `["messages", thread]` prefix over `String` message bodies.
pub struct Thread(pub String);

impl TypedPrefix<ChatSpace> for Thread {
    type Codec = SerdeBincode<String>;

    fn prefix(&self) -> Key {
        Key::from(("messages", self.0.as_str()))
    }
}

/// `["visits", user]` → merge-capable counter
pub struct Visits(pub String);

impl TypedKey<ChatSpace> for Visits {
    type Codec = Counter;

    fn key(&self) -> Key {
        Key::from(("visits", self.0.as_str()))
    }
}

/// `["events", id]` → `String`, keyed by commit versionstamp bytes.
pub struct Event(pub Vec<u8>);

impl TypedKey<ChatSpace> for Event {
    type Codec = SerdeBincode<String>;

    fn key(&self) -> Key {
        Key::from(("events",)).append(KeyPart::Bytes(self.0.clone()))
    }
}

/// `["events"]` prefix: the whole event log in versionstamp order.
pub struct Events;

impl TypedPrefix<ChatSpace> for Events {
    type Codec = SerdeBincode<String>;

    fn prefix(&self) -> Key {
        Key::from(("events",))
    }
}
