//! In-memory reference store
//!
//! A single ordered map under a `parking_lot::RwLock`, a monotonic commit
//! version, an in-process work queue, and a watcher registry. Checks of a
//! commit are evaluated under the write lock, so they see one consistent
//! snapshot; mutations apply in staged order, all or nothing, and every
//! write of a commit carries the same versionstamp.
//!
//! Lock order is `state` → `watchers` and `state` → `queue`; the queue lock
//! is never held across a commit.

use crate::queue::{FinishAction, QueueState};
use crate::traits::{Check, Consistency, Enqueued, MessageId, Mutation, QueueMessage, Store, WatchHandle};
use crate::watch::WatcherRegistry;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};
use typedkv_core::{
    limits, CommitOutcome, Entry, Error, Key, MaybeEntry, RawValue, Result, ScanRange,
    Versionstamp,
};

#[derive(Debug, Clone)]
struct Stored {
    value: RawValue,
    versionstamp: Versionstamp,
    expires_at: Option<Instant>,
}

impl Stored {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Default)]
struct State {
    entries: BTreeMap<Key, Stored>,
    version: u64,
}

impl State {
    fn live(&self, key: &Key, now: Instant) -> Option<&Stored> {
        self.entries.get(key).filter(|s| !s.is_expired(now))
    }

    fn read(&self, key: &Key, now: Instant) -> MaybeEntry<RawValue> {
        match self.live(key, now) {
            Some(stored) => MaybeEntry::Present(Entry {
                key: key.clone(),
                value: stored.value.clone(),
                versionstamp: stored.versionstamp,
            }),
            None => MaybeEntry::absent(key.clone()),
        }
    }
}

struct Inner {
    state: RwLock<State>,
    watchers: Mutex<WatcherRegistry>,
    queue: Mutex<QueueState>,
    queue_cv: Condvar,
}

/// An in-process [`Store`].
///
/// Cloning is cheap and shares the underlying store; the last clone dropped
/// tears everything down, ending any watch streams.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        MemoryStore {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                watchers: Mutex::new(WatcherRegistry::default()),
                queue: Mutex::new(QueueState::default()),
                queue_cv: Condvar::new(),
            }),
        }
    }

    /// Validate and stage `mutations` against `state`, without applying.
    ///
    /// Returns the staged overlay (`None` marks a delete) plus the messages
    /// to enqueue. Erroring here leaves the store untouched, which is what
    /// makes faults all-or-nothing too, not just conflicts.
    fn stage(
        state: &State,
        mutations: Vec<Mutation>,
        versionstamp: Versionstamp,
        now: Instant,
    ) -> Result<(BTreeMap<Key, Option<Stored>>, Vec<Enqueued>)> {
        let mut staged: BTreeMap<Key, Option<Stored>> = BTreeMap::new();
        let mut enqueues = Vec::new();

        for mutation in mutations {
            match mutation {
                Mutation::Set {
                    key,
                    value,
                    expires_in,
                } => {
                    let key = key.resolve_commit_version(&versionstamp.to_be_bytes());
                    if let RawValue::Blob(bytes) = &value {
                        if bytes.len() > limits::MAX_VALUE_BYTES {
                            return Err(Error::ValueTooLarge {
                                actual: bytes.len(),
                                max: limits::MAX_VALUE_BYTES,
                            });
                        }
                    }
                    staged.insert(
                        key,
                        Some(Stored {
                            value,
                            versionstamp,
                            expires_at: expires_in.map(|ttl| now + ttl),
                        }),
                    );
                }
                Mutation::Delete { key } => {
                    reject_placeholder(&key)?;
                    staged.insert(key, None);
                }
                Mutation::Sum { key, amount } => {
                    Self::stage_counter(state, &mut staged, key, amount, CounterMerge::Sum, versionstamp, now)?;
                }
                Mutation::Min { key, amount } => {
                    Self::stage_counter(state, &mut staged, key, amount, CounterMerge::Min, versionstamp, now)?;
                }
                Mutation::Max { key, amount } => {
                    Self::stage_counter(state, &mut staged, key, amount, CounterMerge::Max, versionstamp, now)?;
                }
                Mutation::Enqueue(enqueued) => enqueues.push(enqueued),
            }
        }
        Ok((staged, enqueues))
    }

    /// Stage one counter merge against the current value as earlier
    /// mutations of this commit see it.
    fn stage_counter(
        state: &State,
        staged: &mut BTreeMap<Key, Option<Stored>>,
        key: Key,
        amount: u64,
        merge: CounterMerge,
        versionstamp: Versionstamp,
        now: Instant,
    ) -> Result<()> {
        reject_placeholder(&key)?;
        let effective = match staged.get(&key) {
            Some(pending) => pending.clone(),
            None => state.live(&key, now).cloned(),
        };
        let current = match effective {
            Some(stored) => Some(stored.value.as_counter().ok_or_else(|| {
                Error::Store(format!("counter mutation on non-counter key {key}"))
            })?),
            None => None,
        };
        let merged = merge_counter(merge, current, amount);
        staged.insert(
            key,
            Some(Stored {
                value: RawValue::Counter(merged),
                versionstamp,
                expires_at: None,
            }),
        );
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum CounterMerge {
    Sum,
    Min,
    Max,
}

/// Merge semantics: wrapping sum; min/max of an absent counter is the
/// staged amount.
fn merge_counter(merge: CounterMerge, current: Option<u64>, amount: u64) -> u64 {
    match (merge, current) {
        (CounterMerge::Sum, Some(n)) => n.wrapping_add(amount),
        (CounterMerge::Min, Some(n)) => n.min(amount),
        (CounterMerge::Max, Some(n)) => n.max(amount),
        (CounterMerge::Sum, None) => amount,
        (CounterMerge::Min | CounterMerge::Max, None) => amount,
    }
}

/// Commit-versionstamp placeholders are only meaningful in `Set` keys.
fn reject_placeholder(key: &Key) -> Result<()> {
    if key.has_commit_version() {
        return Err(Error::MisplacedCommitVersion { key: key.clone() });
    }
    Ok(())
}

/// Whether a `(start, end)` pair denotes an empty range. `BTreeMap::range`
/// panics on inverted bounds, so degenerate ranges short-circuit instead.
fn range_is_empty(start: &Bound<Key>, end: &Bound<Key>) -> bool {
    let (s, inclusive_s) = match start {
        Bound::Included(k) => (k, true),
        Bound::Excluded(k) => (k, false),
        Bound::Unbounded => return false,
    };
    let (e, inclusive_e) = match end {
        Bound::Included(k) => (k, true),
        Bound::Excluded(k) => (k, false),
        Bound::Unbounded => return false,
    };
    match s.cmp(e) {
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => !(inclusive_s && inclusive_e),
        std::cmp::Ordering::Greater => true,
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &Key, _consistency: Consistency) -> Result<MaybeEntry<RawValue>> {
        reject_placeholder(key)?;
        let state = self.inner.state.read();
        Ok(state.read(key, Instant::now()))
    }

    fn get_many(
        &self,
        keys: &[Key],
        _consistency: Consistency,
    ) -> Result<Vec<MaybeEntry<RawValue>>> {
        for key in keys {
            reject_placeholder(key)?;
        }
        let state = self.inner.state.read();
        let now = Instant::now();
        Ok(keys.iter().map(|k| state.read(k, now)).collect())
    }

    fn scan(
        &self,
        range: &ScanRange,
        reverse: bool,
        limit: usize,
        _consistency: Consistency,
    ) -> Result<Vec<Entry<RawValue>>> {
        if limit == 0 || range_is_empty(&range.start, &range.end) {
            return Ok(Vec::new());
        }
        let state = self.inner.state.read();
        let now = Instant::now();
        let bounds = (range.start.as_ref(), range.end.as_ref());
        let live = state
            .entries
            .range::<Key, _>(bounds)
            .filter(|(_, stored)| !stored.is_expired(now))
            .map(|(key, stored)| Entry {
                key: key.clone(),
                value: stored.value.clone(),
                versionstamp: stored.versionstamp,
            });
        let page: Vec<_> = if reverse {
            live.rev().take(limit).collect()
        } else {
            live.take(limit).collect()
        };
        Ok(page)
    }

    fn commit(&self, checks: &[Check], mutations: Vec<Mutation>) -> Result<CommitOutcome> {
        let now = Instant::now();
        let mut state = self.inner.state.write();

        for check in checks {
            reject_placeholder(&check.key)?;
            let current = state.live(&check.key, now).map(|s| s.versionstamp);
            if current != check.versionstamp {
                debug!(
                    target: "typedkv::commit",
                    key = %check.key,
                    "Check failed, commit conflicted"
                );
                return Ok(CommitOutcome::Conflict);
            }
        }

        let versionstamp = Versionstamp::new(state.version + 1);
        let (staged, enqueues) = Self::stage(&state, mutations, versionstamp, now)?;
        state.version += 1;

        let written: Vec<Key> = staged.keys().cloned().collect();
        for (key, pending) in staged {
            match pending {
                Some(stored) => {
                    state.entries.insert(key, stored);
                }
                None => {
                    state.entries.remove(&key);
                }
            }
        }
        debug!(
            target: "typedkv::commit",
            versionstamp = %versionstamp,
            writes = written.len(),
            enqueues = enqueues.len(),
            "Commit applied"
        );

        if !written.is_empty() {
            let mut watchers = self.inner.watchers.lock();
            watchers.notify(&written, |key| state.read(key, now));
            trace!(target: "typedkv::watch", writes = written.len(), "Watchers notified");
        }
        drop(state);

        if !enqueues.is_empty() {
            let mut queue = self.inner.queue.lock();
            for enqueued in enqueues {
                queue.push(enqueued, now);
            }
            drop(queue);
            self.inner.queue_cv.notify_all();
        }

        Ok(CommitOutcome::Committed { versionstamp })
    }

    fn queue_next(&self, wait: Duration) -> Result<Option<QueueMessage>> {
        let deadline = Instant::now() + wait;
        let mut queue = self.inner.queue.lock();
        loop {
            let now = Instant::now();
            if let Some(msg) = queue.claim_ready(now) {
                trace!(target: "typedkv::queue", attempt = msg.attempt, "Message claimed");
                return Ok(Some(msg));
            }
            if now >= deadline {
                return Ok(None);
            }
            let wake_at = queue
                .next_ready_at()
                .map_or(deadline, |ready| ready.min(deadline));
            self.inner.queue_cv.wait_until(&mut queue, wake_at);
        }
    }

    fn queue_finish(&self, id: MessageId, success: bool) -> Result<()> {
        let action = {
            let mut queue = self.inner.queue.lock();
            queue.finish(id, success, Instant::now())
        };
        match action {
            FinishAction::Done => {
                self.inner.queue_cv.notify_all();
                Ok(())
            }
            FinishAction::Unknown => Err(Error::Store("unknown queue message".to_string())),
            FinishAction::WriteMarkers { payload, keys } => {
                warn!(
                    target: "typedkv::queue",
                    markers = keys.len(),
                    "Message undelivered after backoff, writing markers"
                );
                for key in keys {
                    self.commit(
                        &[],
                        vec![Mutation::Set {
                            key,
                            value: payload.clone(),
                            expires_in: None,
                        }],
                    )?;
                }
                Ok(())
            }
        }
    }

    fn watch(&self, keys: &[Key]) -> Result<WatchHandle> {
        for key in keys {
            reject_placeholder(key)?;
        }
        let state = self.inner.state.read();
        let now = Instant::now();
        let initial: Vec<_> = keys.iter().map(|k| state.read(k, now)).collect();
        // Register while still holding the state lock so no commit can slip
        // between the initial snapshot and the registration.
        let mut watchers = self.inner.watchers.lock();
        Ok(watchers.subscribe(keys.to_vec(), initial))
    }
}
