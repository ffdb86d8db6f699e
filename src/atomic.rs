//! The atomic operation builder.
//!
//! An [`AtomicOp`] stages optimistic-concurrency checks and mutations, then
//! submits them as one commit. Every check is evaluated against one
//! consistent snapshot; mutations apply in staged order, all or nothing, and
//! all writes of the commit share a single versionstamp.
//!
//! Builder methods are fluent and infallible at the call site: the first
//! validation failure is stashed and surfaced by [`commit`](AtomicOp::commit)
//! before anything reaches the store.

use crate::queue::EnqueueOptions;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::debug;
use typedkv_core::{
    limits, CommitOutcome, Counter, EncodeValue, Error, Key, KeyPart, KeySpace, MaybeEntry,
    RawValue, Result, TypedKey, ValueKind, ValueOf, Versionstamp,
};
use typedkv_store::{Check, Enqueued, Mutation, Store};

/// The placeholder for "the versionstamp this commit will produce".
///
/// Usable as a key part in `Set` mutations staged through
/// [`AtomicOp::mutate`]; the store substitutes the commit's versionstamp as
/// a big-endian `Bytes` part. Anywhere else it is a construction error.
pub fn commit_versionstamp() -> KeyPart {
    KeyPart::CommitVersion
}

/// A staged atomic operation against one key space.
///
/// Built via [`Kv::atomic`](crate::Kv::atomic).
///
/// # Example
///
/// ```ignore
/// let outcome = kv
///     .atomic()
///     .check(&current)
///     .set(&Preferences("ada".into()), &prefs)
///     .sum(&VisitCount, 1)
///     .commit()?;
/// ```
#[must_use = "an atomic operation does nothing until committed"]
pub struct AtomicOp<'a, S: KeySpace> {
    store: &'a dyn Store,
    checks: Vec<Check>,
    mutations: Vec<Mutation>,
    error: Option<Error>,
    _space: PhantomData<S>,
}

impl<'a, S: KeySpace> AtomicOp<'a, S> {
    pub(crate) fn new(store: &'a dyn Store) -> Self {
        AtomicOp {
            store,
            checks: Vec::new(),
            mutations: Vec::new(),
            error: None,
            _space: PhantomData,
        }
    }

    /// Run `stage` unless an earlier step already failed; stash its error.
    fn stage(mut self, stage: impl FnOnce(&mut Self) -> Result<()>) -> Self {
        if self.error.is_none() {
            if let Err(err) = stage(&mut self) {
                self.error = Some(err);
            }
        }
        self
    }

    fn checked_key<K: TypedKey<S>>(key: &K) -> Result<Key> {
        let key = key.key();
        S::schema().check_key(&key)?;
        Ok(key)
    }

    /// Require the commit to see exactly the state a previous read returned:
    /// the entry's versionstamp if present, absence otherwise.
    pub fn check<V>(self, entry: &MaybeEntry<V>) -> Self {
        let key = entry.key().clone();
        let versionstamp = entry.versionstamp();
        self.check_version_raw(key, versionstamp)
    }

    /// Require `key` to carry `versionstamp` (`None` asserts absence).
    pub fn check_version<K: TypedKey<S>>(
        self,
        key: &K,
        versionstamp: Option<Versionstamp>,
    ) -> Self {
        let key = key.key();
        self.check_version_raw(key, versionstamp)
    }

    fn check_version_raw(self, key: Key, versionstamp: Option<Versionstamp>) -> Self {
        self.stage(|op| {
            S::schema().check_key(&key)?;
            op.checks.push(Check { key, versionstamp });
            Ok(())
        })
    }

    /// Stage an upsert.
    pub fn set<K>(self, key: &K, value: &ValueOf<K, S>) -> Self
    where
        K: TypedKey<S>,
        K::Codec: EncodeValue,
    {
        self.set_inner(key, value, None)
    }

    /// Stage an upsert that the store expires `ttl` after the commit.
    pub fn set_with_ttl<K>(self, key: &K, value: &ValueOf<K, S>, ttl: std::time::Duration) -> Self
    where
        K: TypedKey<S>,
        K::Codec: EncodeValue,
    {
        self.set_inner(key, value, Some(ttl))
    }

    fn set_inner<K>(
        self,
        key: &K,
        value: &ValueOf<K, S>,
        expires_in: Option<std::time::Duration>,
    ) -> Self
    where
        K: TypedKey<S>,
        K::Codec: EncodeValue,
    {
        let key = key.key();
        let value = <K::Codec as EncodeValue>::encode(value);
        self.stage(|op| {
            S::schema().check_key_kind(&key, <K::Codec as EncodeValue>::KIND)?;
            op.mutations.push(Mutation::Set {
                key,
                value: value?,
                expires_in,
            });
            Ok(())
        })
    }

    /// Stage a delete. Deleting an absent key is a no-op.
    pub fn delete<K: TypedKey<S>>(self, key: &K) -> Self {
        self.stage(|op| {
            let key = Self::checked_key(key)?;
            op.mutations.push(Mutation::Delete { key });
            Ok(())
        })
    }

    /// Stage a wrapping add into a counter key.
    pub fn sum<K: TypedKey<S, Codec = Counter>>(self, key: &K, amount: u64) -> Self {
        self.counter_mutation(key, amount, |key, amount| Mutation::Sum { key, amount })
    }

    /// Stage "keep the smaller of stored and `amount`" into a counter key.
    pub fn min<K: TypedKey<S, Codec = Counter>>(self, key: &K, amount: u64) -> Self {
        self.counter_mutation(key, amount, |key, amount| Mutation::Min { key, amount })
    }

    /// Stage "keep the larger of stored and `amount`" into a counter key.
    pub fn max<K: TypedKey<S, Codec = Counter>>(self, key: &K, amount: u64) -> Self {
        self.counter_mutation(key, amount, |key, amount| Mutation::Max { key, amount })
    }

    fn counter_mutation<K: TypedKey<S, Codec = Counter>>(
        self,
        key: &K,
        amount: u64,
        build: fn(Key, u64) -> Mutation,
    ) -> Self {
        self.stage(|op| {
            let key = key.key();
            S::schema().check_key_kind(&key, ValueKind::Counter)?;
            op.mutations.push(build(key, amount));
            Ok(())
        })
    }

    /// Stage a queue message, delivered only if the commit succeeds.
    pub fn enqueue<M: Serialize>(self, message: &M, options: EnqueueOptions) -> Self {
        let payload = RawValue::encode(message);
        self.stage(|op| {
            for key in &options.keys_if_undelivered {
                S::schema().check_key(key)?;
            }
            op.mutations.push(Mutation::Enqueue(Enqueued {
                payload: payload?,
                delay: options.delay,
                keys_if_undelivered: options.keys_if_undelivered,
                backoff_schedule: options.backoff_schedule,
            }));
            Ok(())
        })
    }

    /// Stage pre-built raw mutations.
    ///
    /// The escape hatch for key shapes the typed layer cannot express, such
    /// as `Set` keys carrying a commit-versionstamp placeholder. Keys are
    /// still validated against the schema: counter merges must target
    /// counter keys, and enqueues' undelivered-marker keys must be declared.
    pub fn mutate(self, mutations: impl IntoIterator<Item = Mutation>) -> Self {
        self.stage(|op| {
            for mutation in mutations {
                match &mutation {
                    Mutation::Set { key, .. } | Mutation::Delete { key } => {
                        S::schema().check_key(key)?;
                    }
                    Mutation::Sum { key, .. }
                    | Mutation::Min { key, .. }
                    | Mutation::Max { key, .. } => {
                        S::schema().check_key_kind(key, ValueKind::Counter)?;
                    }
                    Mutation::Enqueue(enqueued) => {
                        for key in &enqueued.keys_if_undelivered {
                            S::schema().check_key(key)?;
                        }
                    }
                }
                op.mutations.push(mutation);
            }
            Ok(())
        })
    }

    /// Submit the staged operation.
    ///
    /// Returns `Ok(CommitOutcome::Conflict)` when a check failed; that is
    /// an outcome to branch on, not an error. `Err` means the operation
    /// never applied: a staging failure surfaced here, or a store fault.
    pub fn commit(self) -> Result<CommitOutcome> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let ops = self.checks.len() + self.mutations.len();
        if ops > limits::MAX_ATOMIC_OPS {
            return Err(Error::TooManyOps {
                actual: ops,
                max: limits::MAX_ATOMIC_OPS,
            });
        }
        debug!(
            target: "typedkv::atomic",
            checks = self.checks.len(),
            mutations = self.mutations.len(),
            "Committing atomic operation"
        );
        self.store.commit(&self.checks, self.mutations)
    }
}
