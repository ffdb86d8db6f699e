//! Subscriber registry for key-change notifications
//!
//! Each watcher holds the keys it cares about and the sending half of its
//! channel. The store notifies after every commit that wrote a watched key;
//! watchers whose receiving half is gone are pruned on the next send.

use crate::traits::WatchHandle;
use std::sync::mpsc;
use typedkv_core::{Key, MaybeEntry, RawValue};

struct Watcher {
    keys: Vec<Key>,
    sender: mpsc::Sender<Vec<MaybeEntry<RawValue>>>,
}

#[derive(Default)]
pub(crate) struct WatcherRegistry {
    watchers: Vec<Watcher>,
}

impl WatcherRegistry {
    /// Register a watcher and deliver its initial snapshot.
    pub(crate) fn subscribe(
        &mut self,
        keys: Vec<Key>,
        initial: Vec<MaybeEntry<RawValue>>,
    ) -> WatchHandle {
        let (sender, receiver) = mpsc::channel();
        // The receiver is still local, so this cannot fail.
        let _ = sender.send(initial);
        self.watchers.push(Watcher { keys, sender });
        WatchHandle::new(receiver)
    }

    /// Send a fresh snapshot to every watcher interested in a written key.
    ///
    /// `lookup` reads the current entry for a key under whatever lock the
    /// caller already holds, keeping each snapshot internally consistent.
    pub(crate) fn notify(
        &mut self,
        written: &[Key],
        mut lookup: impl FnMut(&Key) -> MaybeEntry<RawValue>,
    ) {
        self.watchers.retain(|watcher| {
            let interested = watcher.keys.iter().any(|k| written.contains(k));
            if !interested {
                return true;
            }
            let snapshot: Vec<_> = watcher.keys.iter().map(&mut lookup).collect();
            watcher.sender.send(snapshot).is_ok()
        });
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.watchers.len()
    }
}
