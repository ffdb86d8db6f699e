//! The typed store facade.
//!
//! [`Kv`] wraps any [`Store`] and narrows every operation through one
//! declared key space: keys are typed values, reads come back as the
//! variant's value type, counter merges only compile against counter keys.

use crate::atomic::AtomicOp;
use crate::list::{ListIter, ListOptions};
use crate::queue::{EnqueueOptions, QueueListener};
use crate::tuple::KeyTuple;
use crate::watch::Watch;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use typedkv_core::{
    limits, CommitOutcome, EncodeValue, Error, Key, KeySpace, ListSelector, MaybeEntry, Raw,
    RawValue, Result, TypedKey, TypedPrefix, ValueCodec, ValueOf, Versionstamp,
};
use typedkv_store::{Consistency, MemoryStore, Store};

/// A typed view over a store.
///
/// Cloning is cheap and shares the underlying store.
///
/// # Example
///
/// ```ignore
/// let kv: Kv<ChatSpace> = Kv::new(MemoryStore::new());
///
/// kv.set(&Preferences("ada".into()), &prefs)?;
/// let entry = kv.get(&Preferences("ada".into()))?;
/// ```
pub struct Kv<S: KeySpace> {
    store: Arc<dyn Store>,
    _space: PhantomData<S>,
}

impl<S: KeySpace> Clone for Kv<S> {
    fn clone(&self) -> Self {
        Kv {
            store: Arc::clone(&self.store),
            _space: PhantomData,
        }
    }
}

impl<S: KeySpace> Kv<S> {
    /// Wrap a store.
    pub fn new(store: impl Store) -> Self {
        Self::from_store(Arc::new(store))
    }

    /// A typed view over a fresh, empty [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Wrap an already-shared store.
    pub fn from_store(store: Arc<dyn Store>) -> Self {
        Kv {
            store,
            _space: PhantomData,
        }
    }

    fn checked_key<K: TypedKey<S>>(key: &K) -> Result<Key> {
        let key = key.key();
        S::schema().check_key(&key)?;
        Ok(key)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read one entry with strong consistency.
    pub fn get<K: TypedKey<S>>(&self, key: &K) -> Result<MaybeEntry<ValueOf<K, S>>> {
        self.get_with(key, Consistency::Strong)
    }

    /// Read one entry at the given consistency level.
    pub fn get_with<K: TypedKey<S>>(
        &self,
        key: &K,
        consistency: Consistency,
    ) -> Result<MaybeEntry<ValueOf<K, S>>> {
        let key = Self::checked_key(key)?;
        let entry = self.store.get(&key, consistency)?;
        entry.try_map(|_, raw| <K::Codec as ValueCodec>::decode(&raw))
    }

    /// Read one entry by raw key, schema-checked but not decoded.
    pub fn get_raw(&self, key: &Key, consistency: Consistency) -> Result<MaybeEntry<RawValue>> {
        S::schema().check_key(key)?;
        self.store.get(key, consistency)
    }

    /// Read several keys of possibly different variants from one consistent
    /// snapshot.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let (prefs, count) = kv.get_many((&Preferences("ada".into()), &VisitCount))?;
    /// ```
    pub fn get_many<T: KeyTuple<S>>(&self, keys: T) -> Result<T::Entries> {
        self.get_many_with(keys, Consistency::Strong)
    }

    /// [`get_many`](Kv::get_many) at the given consistency level.
    pub fn get_many_with<T: KeyTuple<S>>(
        &self,
        keys: T,
        consistency: Consistency,
    ) -> Result<T::Entries> {
        let raw_keys = keys.keys();
        for key in &raw_keys {
            S::schema().check_key(key)?;
        }
        let entries = self.store.get_many(&raw_keys, consistency)?;
        T::decode(entries)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Upsert one entry, returning its new versionstamp.
    pub fn set<K>(&self, key: &K, value: &ValueOf<K, S>) -> Result<Versionstamp>
    where
        K: TypedKey<S>,
        K::Codec: EncodeValue,
    {
        committed(self.atomic().set(key, value).commit()?)
    }

    /// Upsert one entry that the store expires `ttl` after the commit.
    pub fn set_with_ttl<K>(
        &self,
        key: &K,
        value: &ValueOf<K, S>,
        ttl: std::time::Duration,
    ) -> Result<Versionstamp>
    where
        K: TypedKey<S>,
        K::Codec: EncodeValue,
    {
        committed(self.atomic().set_with_ttl(key, value, ttl).commit()?)
    }

    /// Delete one entry. Deleting an absent key is a no-op.
    pub fn delete<K: TypedKey<S>>(&self, key: &K) -> Result<()> {
        committed(self.atomic().delete(key).commit()?).map(|_| ())
    }

    /// Start an atomic operation.
    pub fn atomic(&self) -> AtomicOp<'_, S> {
        AtomicOp::new(&*self.store)
    }

    // =========================================================================
    // Range reads
    // =========================================================================

    /// List every entry strictly under a typed prefix, decoded to the
    /// prefix's value type.
    pub fn list<P: TypedPrefix<S>>(
        &self,
        prefix: &P,
        options: ListOptions,
    ) -> Result<ListIter<P::Codec>> {
        let selector = ListSelector::prefix(prefix.prefix());
        self.list_under(prefix, selector, options)
    }

    /// List with an explicit selector that must lie under the typed prefix,
    /// for resuming from a `start` key or stopping before an `end` key.
    pub fn list_under<P: TypedPrefix<S>>(
        &self,
        prefix: &P,
        selector: ListSelector,
        options: ListOptions,
    ) -> Result<ListIter<P::Codec>> {
        let prefix = prefix.prefix();
        if !selector_within(&selector, &prefix) {
            return Err(Error::InvalidSelector {
                reason: format!("selector does not lie under prefix {prefix}"),
            });
        }
        selector.validate(S::schema())?;
        ListIter::new(Arc::clone(&self.store), selector.resolve(), options)
    }

    /// List with an arbitrary selector. The selector may span variants of
    /// different value types, so entries come back as raw values.
    pub fn list_selector(
        &self,
        selector: ListSelector,
        options: ListOptions,
    ) -> Result<ListIter<Raw>> {
        selector.validate(S::schema())?;
        ListIter::new(Arc::clone(&self.store), selector.resolve(), options)
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Enqueue one message, returning the commit's versionstamp.
    pub fn enqueue<M: Serialize>(
        &self,
        message: &M,
        options: EnqueueOptions,
    ) -> Result<Versionstamp> {
        committed(self.atomic().enqueue(message, options).commit()?)
    }

    /// Spawn a background listener delivering queue messages to `handler`.
    ///
    /// A handler error counts as a failed delivery: the store reschedules
    /// the message per its backoff schedule and, once that is exhausted,
    /// writes the payload to the message's undelivered-marker keys.
    pub fn listen_queue<M, F>(&self, handler: F) -> QueueListener
    where
        M: DeserializeOwned + Send + 'static,
        F: FnMut(M) -> Result<()> + Send + 'static,
    {
        QueueListener::spawn(Arc::clone(&self.store), handler)
    }

    // =========================================================================
    // Watch
    // =========================================================================

    /// Subscribe to changes of up to [`limits::MAX_WATCHED_KEYS`] typed keys
    /// of one variant.
    pub fn watch<K: TypedKey<S>>(&self, keys: &[K]) -> Result<Watch<K::Codec>> {
        let keys = keys
            .iter()
            .map(|key| Self::checked_key(key))
            .collect::<Result<Vec<_>>>()?;
        self.watch_raw_keys(keys).map(Watch::new)
    }

    /// Subscribe to changes of arbitrary keys, possibly spanning variants of
    /// different value types; snapshots carry raw values.
    pub fn watch_keys(&self, keys: Vec<Key>) -> Result<Watch<Raw>> {
        for key in &keys {
            S::schema().check_key(key)?;
        }
        self.watch_raw_keys(keys).map(Watch::new)
    }

    fn watch_raw_keys(&self, keys: Vec<Key>) -> Result<typedkv_store::WatchHandle> {
        if keys.len() > limits::MAX_WATCHED_KEYS {
            return Err(Error::TooManyWatchedKeys {
                actual: keys.len(),
                max: limits::MAX_WATCHED_KEYS,
            });
        }
        self.store.watch(&keys)
    }
}

/// A checkless commit cannot conflict; surface the versionstamp.
fn committed(outcome: CommitOutcome) -> Result<Versionstamp> {
    outcome
        .versionstamp()
        .ok_or_else(|| Error::Store("commit without checks reported a conflict".to_string()))
}

/// Whether every explicit bound of `selector` is `prefix` or an extension
/// of it.
fn selector_within(selector: &ListSelector, prefix: &Key) -> bool {
    match selector {
        ListSelector::Prefix { prefix: p } => p == prefix,
        ListSelector::PrefixStart { prefix: p, start } => {
            p == prefix && start.starts_with(prefix)
        }
        ListSelector::PrefixEnd { prefix: p, end } => p == prefix && end.starts_with(prefix),
        ListSelector::Range { start, end } => {
            start.starts_with(prefix) && end.starts_with(prefix)
        }
    }
}
