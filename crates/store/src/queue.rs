//! Pending-message state for the in-memory work queue
//!
//! Pure bookkeeping, driven by `MemoryStore` under its queue lock. Timing
//! (condvar waits) and marker writes stay in the store so this state never
//! takes other locks.

use crate::traits::{Enqueued, MessageId, QueueMessage};
use std::time::{Duration, Instant};
use typedkv_core::{limits, Key, RawValue};

/// Default backoff schedule as durations.
pub(crate) fn default_backoff() -> Vec<Duration> {
    limits::DEFAULT_BACKOFF_SCHEDULE_MS
        .iter()
        .map(|ms| Duration::from_millis(*ms))
        .collect()
}

#[derive(Debug)]
struct PendingMessage {
    id: u64,
    payload: RawValue,
    ready_at: Instant,
    /// Deliveries already attempted.
    attempt: u32,
    backoff: Vec<Duration>,
    keys_if_undelivered: Vec<Key>,
    in_flight: bool,
}

/// What `queue_finish` must do after the bookkeeping is done.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FinishAction {
    /// Message handled (or rescheduled); nothing further.
    Done,
    /// Backoff exhausted: write `payload` to each marker key.
    WriteMarkers {
        /// The undelivered payload
        payload: RawValue,
        /// Declared marker keys
        keys: Vec<Key>,
    },
    /// No such in-flight message.
    Unknown,
}

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    messages: Vec<PendingMessage>,
    next_id: u64,
}

impl QueueState {
    pub(crate) fn push(&mut self, enqueued: Enqueued, now: Instant) {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(PendingMessage {
            id,
            payload: enqueued.payload,
            ready_at: now + enqueued.delay.unwrap_or(Duration::ZERO),
            attempt: 0,
            backoff: enqueued.backoff_schedule.unwrap_or_else(default_backoff),
            keys_if_undelivered: enqueued.keys_if_undelivered,
            in_flight: false,
        });
    }

    /// Claim the message with the earliest elapsed `ready_at`, if any.
    pub(crate) fn claim_ready(&mut self, now: Instant) -> Option<QueueMessage> {
        let msg = self
            .messages
            .iter_mut()
            .filter(|m| !m.in_flight && m.ready_at <= now)
            .min_by_key(|m| m.ready_at)?;
        msg.in_flight = true;
        Some(QueueMessage {
            id: MessageId(msg.id),
            payload: msg.payload.clone(),
            attempt: msg.attempt,
        })
    }

    /// When the next message becomes deliverable, among those not in flight.
    pub(crate) fn next_ready_at(&self) -> Option<Instant> {
        self.messages
            .iter()
            .filter(|m| !m.in_flight)
            .map(|m| m.ready_at)
            .min()
    }

    /// Settle an in-flight message.
    pub(crate) fn finish(&mut self, id: MessageId, success: bool, now: Instant) -> FinishAction {
        let Some(pos) = self
            .messages
            .iter()
            .position(|m| m.id == id.0 && m.in_flight)
        else {
            return FinishAction::Unknown;
        };
        if success {
            self.messages.remove(pos);
            return FinishAction::Done;
        }
        let msg = &mut self.messages[pos];
        let retry = msg.attempt as usize;
        if retry < msg.backoff.len() {
            msg.ready_at = now + msg.backoff[retry];
            msg.attempt += 1;
            msg.in_flight = false;
            return FinishAction::Done;
        }
        let msg = self.messages.remove(pos);
        FinishAction::WriteMarkers {
            payload: msg.payload,
            keys: msg.keys_if_undelivered,
        }
    }
}
