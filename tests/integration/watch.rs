//! Watch
//!
//! Initial snapshots, per-commit emissions, coalescing, and teardown.

use crate::common::*;
use typedkv::Error;

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn first_emission_is_the_state_at_subscription() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());
    kv.set(&ada, &prefs("dark")).unwrap();

    let mut watch = kv
        .watch(&[UserPrefs("ada".to_string()), UserPrefs("bob".to_string())])
        .unwrap();
    let snapshot = watch.next().unwrap().unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].value(), Some(&prefs("dark")));
    assert!(!snapshot[1].is_present());
}

#[test]
fn writes_to_watched_keys_emit_fresh_snapshots() {
    let kv = chat_kv();
    let visits = Visits("ada".to_string());
    let mut watch = kv.watch(&[Visits("ada".to_string())]).unwrap();

    let initial = watch.next().unwrap().unwrap();
    assert!(!initial[0].is_present());

    kv.atomic().sum(&visits, 3).commit().unwrap();
    let snapshot = watch.next().unwrap().unwrap();
    assert_eq!(snapshot[0].value(), Some(&3));

    // An unrelated write emits nothing; the next emission is ada's delete.
    kv.set(&Visits("bob".to_string()), &1).unwrap();
    kv.delete(&visits).unwrap();
    let snapshot = watch.next().unwrap().unwrap();
    assert!(!snapshot[0].is_present());
}

// ============================================================================
// Coalescing
// ============================================================================

#[test]
fn a_slow_consumer_skips_to_the_newest_snapshot() {
    let kv = chat_kv();
    let visits = Visits("ada".to_string());
    let mut watch = kv.watch(&[Visits("ada".to_string())]).unwrap();
    watch.next().unwrap().unwrap();

    for _ in 0..3 {
        kv.atomic().sum(&visits, 1).commit().unwrap();
    }

    // Three emissions piled up; a coalescing watch sees only the last.
    let snapshot = watch.next().unwrap().unwrap();
    assert_eq!(snapshot[0].value(), Some(&3));
}

#[test]
fn no_coalesce_delivers_every_snapshot() {
    let kv = chat_kv();
    let visits = Visits("ada".to_string());
    let mut watch = kv
        .watch(&[Visits("ada".to_string())])
        .unwrap()
        .no_coalesce();
    watch.next().unwrap().unwrap();

    for _ in 0..3 {
        kv.atomic().sum(&visits, 1).commit().unwrap();
    }

    for expected in 1..=3u64 {
        let snapshot = watch.next().unwrap().unwrap();
        assert_eq!(snapshot[0].value(), Some(&expected));
    }
}

// ============================================================================
// Limits and teardown
// ============================================================================

#[test]
fn watching_too_many_keys_is_rejected() {
    let kv = chat_kv();
    let keys: Vec<UserPrefs> = (0..=typedkv::limits::MAX_WATCHED_KEYS)
        .map(|i| UserPrefs(format!("user{i}")))
        .collect();
    let result = kv.watch(&keys);
    assert!(matches!(result, Err(Error::TooManyWatchedKeys { .. })));
}

#[test]
fn dropping_the_store_ends_the_stream() {
    let kv = chat_kv();
    let mut watch = kv.watch(&[UserPrefs("ada".to_string())]).unwrap();
    drop(kv);

    // The buffered initial snapshot still arrives, then the stream ends.
    assert!(watch.next().is_some());
    assert!(watch.next().is_none());
}
