//! The storage-engine interface this layer consumes
//!
//! Everything the typed facade needs from an engine: point/batch reads with
//! a consistency level, one-page ordered scans, an atomic compare-and-mutate
//! commit, a delivery-guaranteed queue, and key-change subscriptions. The
//! in-process [`MemoryStore`](crate::MemoryStore) implements it; a network
//! client would implement the same trait.

use std::sync::mpsc;
use std::time::Duration;
use typedkv_core::{CommitOutcome, Entry, Key, MaybeEntry, RawValue, Result, ScanRange, Versionstamp};

/// Read consistency level.
///
/// `Eventual` permits a cheaper, possibly stale read; `Strong` (the
/// default) reads the latest committed state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Consistency {
    /// Latest committed state.
    #[default]
    Strong,
    /// Possibly stale, cheaper on distributed engines.
    Eventual,
}

/// A staged optimistic-concurrency precondition.
///
/// `versionstamp: None` asserts the key is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// The key the precondition is about
    pub key: Key,
    /// Expected versionstamp, or `None` for "must not exist"
    pub versionstamp: Option<Versionstamp>,
}

/// A message staged for the work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    /// The encoded message value
    pub payload: RawValue,
    /// Hold the message back this long before first delivery
    pub delay: Option<Duration>,
    /// Keys to write the payload into if delivery ultimately fails
    pub keys_if_undelivered: Vec<Key>,
    /// Redelivery delays, exhausted in order; `None` uses the store default
    pub backoff_schedule: Option<Vec<Duration>>,
}

/// A staged mutation.
///
/// Mutations of one commit apply in staged order, all or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Upsert, with optional store-side expiry.
    Set {
        /// Target key; may contain commit-versionstamp placeholders
        key: Key,
        /// The value to store
        value: RawValue,
        /// Expire the record this long after the commit
        expires_in: Option<Duration>,
    },
    /// Remove the record, a no-op when absent.
    Delete {
        /// Target key
        key: Key,
    },
    /// Wrapping add into a counter.
    Sum {
        /// Target counter key
        key: Key,
        /// Amount to add
        amount: u64,
    },
    /// Keep the smaller of the stored counter and `amount`.
    Min {
        /// Target counter key
        key: Key,
        /// Candidate value
        amount: u64,
    },
    /// Keep the larger of the stored counter and `amount`.
    Max {
        /// Target counter key
        key: Key,
        /// Candidate value
        amount: u64,
    },
    /// Stage a queue message, delivered only if the commit succeeds.
    Enqueue(Enqueued),
}

/// Identifier of an in-flight queue message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub(crate) u64);

/// A queue message handed to a listener.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Identifier to pass back to [`Store::queue_finish`]
    pub id: MessageId,
    /// The encoded message value
    pub payload: RawValue,
    /// Zero-based delivery attempt number
    pub attempt: u32,
}

impl QueueMessage {
    /// Decode the message value.
    pub fn decode<M: serde::de::DeserializeOwned>(&self) -> Result<M> {
        self.payload.decode()
    }
}

/// A live key-change subscription.
///
/// Each emission is a full snapshot: one [`MaybeEntry`] per watched key, in
/// subscription order. Dropping the handle tears the subscription down.
#[derive(Debug)]
pub struct WatchHandle {
    receiver: mpsc::Receiver<Vec<MaybeEntry<RawValue>>>,
}

impl WatchHandle {
    pub(crate) fn new(receiver: mpsc::Receiver<Vec<MaybeEntry<RawValue>>>) -> Self {
        WatchHandle { receiver }
    }

    /// Block for the next snapshot; `None` when the store is gone.
    pub fn recv(&self) -> Option<Vec<MaybeEntry<RawValue>>> {
        self.receiver.recv().ok()
    }

    /// A snapshot if one is already pending.
    pub fn try_recv(&self) -> Option<Vec<MaybeEntry<RawValue>>> {
        self.receiver.try_recv().ok()
    }
}

/// An ordered, versioned key-value engine.
///
/// Implementations must assign versionstamps monotonically and evaluate
/// every check of a commit against one consistent snapshot.
pub trait Store: Send + Sync + 'static {
    /// Point read.
    fn get(&self, key: &Key, consistency: Consistency) -> Result<MaybeEntry<RawValue>>;

    /// Batch read from one consistent snapshot, order-preserving.
    fn get_many(&self, keys: &[Key], consistency: Consistency)
        -> Result<Vec<MaybeEntry<RawValue>>>;

    /// One page of an ordered range scan: up to `limit` entries inside
    /// `range`, ascending by key, or descending when `reverse`.
    fn scan(
        &self,
        range: &ScanRange,
        reverse: bool,
        limit: usize,
        consistency: Consistency,
    ) -> Result<Vec<Entry<RawValue>>>;

    /// Atomic compare-and-mutate. All checks hold and all mutations apply,
    /// or nothing does and the outcome is a conflict.
    fn commit(&self, checks: &[Check], mutations: Vec<Mutation>) -> Result<CommitOutcome>;

    /// Block up to `wait` for the next deliverable queue message. The
    /// message stays in flight until [`Store::queue_finish`] is called.
    fn queue_next(&self, wait: Duration) -> Result<Option<QueueMessage>>;

    /// Report the outcome of handling a message. On failure the store
    /// reschedules per the message's backoff schedule, or, once exhausted,
    /// writes the payload to the message's undelivered-marker keys.
    fn queue_finish(&self, id: MessageId, success: bool) -> Result<()>;

    /// Subscribe to changes of up to
    /// [`limits::MAX_WATCHED_KEYS`](typedkv_core::limits::MAX_WATCHED_KEYS)
    /// keys. Emits one initial snapshot, then one per relevant commit.
    fn watch(&self, keys: &[Key]) -> Result<WatchHandle>;
}
