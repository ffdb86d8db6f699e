//! Key-change subscriptions.
//!
//! A [`Watch`] is a blocking iterator of snapshots: one [`MaybeEntry`] per
//! watched key, in subscription order. The first emission is the state at
//! subscription time; later emissions follow commits that wrote a watched
//! key. By default intermediate snapshots that piled up while the consumer
//! was busy are skipped in favor of the newest one.

use std::marker::PhantomData;
use typedkv_core::{MaybeEntry, Result, ValueCodec};
use typedkv_store::WatchHandle;

/// A live subscription, decoded through codec `C`.
///
/// Ends (`None`) when the store is dropped.
pub struct Watch<C: ValueCodec> {
    handle: WatchHandle,
    coalesce: bool,
    _codec: PhantomData<C>,
}

impl<C: ValueCodec> Watch<C> {
    pub(crate) fn new(handle: WatchHandle) -> Self {
        Watch {
            handle,
            coalesce: true,
            _codec: PhantomData,
        }
    }

    /// Deliver every snapshot instead of skipping to the newest one.
    pub fn no_coalesce(mut self) -> Self {
        self.coalesce = false;
        self
    }
}

impl<C: ValueCodec> Iterator for Watch<C> {
    type Item = Result<Vec<MaybeEntry<C::Value>>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut snapshot = self.handle.recv()?;
        if self.coalesce {
            while let Some(newer) = self.handle.try_recv() {
                snapshot = newer;
            }
        }
        let decoded: Result<Vec<_>> = snapshot
            .into_iter()
            .map(|entry| entry.try_map(|_, raw| C::decode(&raw)))
            .collect();
        Some(decoded)
    }
}
