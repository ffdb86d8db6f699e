//! Queue
//!
//! Delivery through a background listener, retry with backoff, and
//! undelivered-marker writes once backoff is exhausted.

use crate::common::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use typedkv::{EnqueueOptions, Error};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Delivery
// ============================================================================

#[test]
fn enqueued_messages_reach_the_listener() {
    let kv = chat_kv();
    let (tx, rx) = mpsc::channel();

    let listener = kv.listen_queue(move |message: String| {
        tx.send(message).unwrap();
        Ok(())
    });

    kv.enqueue(&"ping".to_string(), EnqueueOptions::default())
        .unwrap();

    assert_eq!(rx.recv_timeout(DELIVERY_TIMEOUT).unwrap(), "ping");
    listener.stop();
}

#[test]
fn delayed_messages_are_held_back() {
    let kv = chat_kv();
    let (tx, rx) = mpsc::channel();
    let listener = kv.listen_queue(move |message: String| {
        tx.send((message, Instant::now())).unwrap();
        Ok(())
    });

    let delay = Duration::from_millis(50);
    let enqueued_at = Instant::now();
    kv.enqueue(
        &"later".to_string(),
        EnqueueOptions::default().delay(delay),
    )
    .unwrap();

    let (message, delivered_at) = rx.recv_timeout(DELIVERY_TIMEOUT).unwrap();
    assert_eq!(message, "later");
    assert!(delivered_at.duration_since(enqueued_at) >= delay);
    listener.stop();
}

#[test]
fn messages_enqueued_atomically_deliver_only_on_commit() {
    let kv = chat_kv();
    let (tx, rx) = mpsc::channel();
    let listener = kv.listen_queue(move |message: String| {
        tx.send(message).unwrap();
        Ok(())
    });

    let ada = UserPrefs("ada".to_string());
    kv.set(&ada, &prefs("dark")).unwrap();
    let stale = kv.get(&ada).unwrap();
    kv.set(&ada, &prefs("light")).unwrap();

    // Conflicted commit: the staged message must never deliver.
    kv.atomic()
        .check(&stale)
        .enqueue(&"never".to_string(), EnqueueOptions::default())
        .commit()
        .unwrap();
    kv.atomic()
        .enqueue(&"delivered".to_string(), EnqueueOptions::default())
        .commit()
        .unwrap();

    assert_eq!(rx.recv_timeout(DELIVERY_TIMEOUT).unwrap(), "delivered");
    assert!(rx.try_recv().is_err());
    listener.stop();
}

// ============================================================================
// Retry and undelivered markers
// ============================================================================

#[test]
fn failed_handling_retries_per_the_backoff_schedule() {
    let kv = chat_kv();
    let attempts = Arc::new(AtomicU32::new(0));
    let seen = Arc::clone(&attempts);
    let (tx, rx) = mpsc::channel();

    let listener = kv.listen_queue(move |message: String| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(Error::Store("flaky handler".to_string()));
        }
        tx.send(message).unwrap();
        Ok(())
    });

    kv.enqueue(
        &"retry".to_string(),
        EnqueueOptions::default().backoff_schedule([Duration::from_millis(1)]),
    )
    .unwrap();

    assert_eq!(rx.recv_timeout(DELIVERY_TIMEOUT).unwrap(), "retry");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    listener.stop();
}

#[test]
fn exhausted_backoff_writes_the_payload_to_marker_keys() {
    let kv = chat_kv();
    let marker = Event(vec![0xde, 0xad]);
    let listener = kv.listen_queue(move |_message: String| {
        Err(Error::Store("always fails".to_string()))
    });

    // Empty schedule: a single attempt, then markers.
    kv.enqueue(
        &"poison".to_string(),
        EnqueueOptions::default()
            .backoff_schedule(Vec::new())
            .keys_if_undelivered([marker.key()]),
    )
    .unwrap();

    let deadline = Instant::now() + DELIVERY_TIMEOUT;
    loop {
        let entry = kv.get(&marker).unwrap();
        if let Some(value) = entry.value() {
            assert_eq!(value.as_str(), "poison");
            break;
        }
        assert!(Instant::now() < deadline, "marker was never written");
        std::thread::sleep(Duration::from_millis(10));
    }
    listener.stop();
}
