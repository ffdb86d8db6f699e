//! Paged, ordered range reads.
//!
//! [`ListIter`] pulls entries from the store one page at a time and yields
//! them decoded through the caller's codec. Iteration order is the total key
//! order (or its reverse), and a resumable cursor is available after every
//! yielded entry.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;
use typedkv_core::{Entry, Error, Key, RawValue, Result, ScanRange, ValueCodec};
use typedkv_store::{Consistency, Store};

const DEFAULT_BATCH_SIZE: usize = 100;

/// Options for a list operation.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Stop after yielding this many entries.
    pub limit: Option<usize>,
    /// Resume after the entry a previous iteration's cursor named.
    pub cursor: Option<String>,
    /// Iterate in descending key order.
    pub reverse: bool,
    /// Entries fetched per store round trip; `None` uses a store-friendly
    /// default.
    pub batch_size: Option<usize>,
    /// Read consistency for every page.
    pub consistency: Consistency,
}

/// An iterator over the entries of one resolved range.
///
/// Yields `Result<Entry<_>>`: a decode failure ends the iteration after
/// surfacing the error. [`cursor`](ListIter::cursor) names the last yielded
/// entry and can seed a later [`ListOptions`] to resume.
pub struct ListIter<C: ValueCodec> {
    store: Arc<dyn Store>,
    range: ScanRange,
    reverse: bool,
    remaining: Option<usize>,
    batch_size: usize,
    consistency: Consistency,
    buffer: VecDeque<Entry<RawValue>>,
    exhausted: bool,
    cursor: Option<String>,
    done: bool,
    _codec: PhantomData<C>,
}

impl<C: ValueCodec> ListIter<C> {
    pub(crate) fn new(
        store: Arc<dyn Store>,
        mut range: ScanRange,
        options: ListOptions,
    ) -> Result<Self> {
        if let Some(cursor) = &options.cursor {
            let key = decode_cursor(cursor)?;
            if !range.contains(&key) {
                return Err(Error::InvalidCursor);
            }
            if options.reverse {
                range.resume_before(&key);
            } else {
                range.resume_after(&key);
            }
        }
        Ok(ListIter {
            store,
            range,
            reverse: options.reverse,
            remaining: options.limit,
            batch_size: options.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
            consistency: options.consistency,
            buffer: VecDeque::new(),
            exhausted: false,
            cursor: options.cursor,
            done: false,
            _codec: PhantomData,
        })
    }

    /// Cursor naming the last yielded entry, if any was yielded.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    fn fetch_page(&mut self) -> Result<()> {
        let want = match self.remaining {
            Some(n) => n.min(self.batch_size),
            None => self.batch_size,
        };
        let page = self
            .store
            .scan(&self.range, self.reverse, want, self.consistency)?;
        trace!(target: "typedkv::list", fetched = page.len(), "Fetched list page");
        if page.len() < want {
            self.exhausted = true;
        } else if let Some(last) = page.last() {
            if self.reverse {
                self.range.resume_before(&last.key);
            } else {
                self.range.resume_after(&last.key);
            }
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl<C: ValueCodec> Iterator for ListIter<C> {
    type Item = Result<Entry<C::Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == Some(0) {
            return None;
        }
        if self.buffer.is_empty() {
            if self.exhausted {
                return None;
            }
            if let Err(err) = self.fetch_page() {
                self.done = true;
                return Some(Err(err));
            }
        }
        let entry = self.buffer.pop_front()?;
        if let Some(remaining) = &mut self.remaining {
            *remaining -= 1;
        }
        self.cursor = Some(encode_cursor(&entry.key));
        match entry.try_map(|_, raw| C::decode(&raw)) {
            Ok(entry) => Some(Ok(entry)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn encode_cursor(key: &Key) -> String {
    // Keys always serialize; bincode only fails on IO or depth limits.
    let bytes = bincode::serialize(key).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode_cursor(cursor: &str) -> Result<Key> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| Error::InvalidCursor)?;
    bincode::deserialize(&bytes).map_err(|_| Error::InvalidCursor)
}
