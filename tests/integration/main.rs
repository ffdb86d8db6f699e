//! Integration Tests
//!
//! Cross-layer tests over one declared key space, organized by surface:
//! - Reads and writes: round trips, absence, TTL, batched reads
//! - Atomic operations: checks, conflicts, counters, versionstamped keys
//! - Listing: order, limits, cursors, heterogeneous selectors
//! - Queue: delivery, retry with backoff, undelivered markers
//! - Watch: initial snapshots, updates, coalescing

#[path = "../common/mod.rs"]
mod common;

mod atomic;
mod kv;
mod queue;
mod watch;
