//! Storage-engine interface and the in-memory reference engine
//!
//! The [`Store`] trait is everything the typed facade needs from an engine:
//! versioned reads, one-page ordered scans, atomic compare-and-mutate
//! commits, a retrying work queue, and key-change subscriptions.
//! [`MemoryStore`] implements it in-process.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod memory;
mod queue;
mod traits;
mod watch;

pub use memory::MemoryStore;
pub use traits::{
    Check, Consistency, Enqueued, MessageId, Mutation, QueueMessage, Store, WatchHandle,
};
