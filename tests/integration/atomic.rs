//! Atomic Operations
//!
//! Optimistic-concurrency checks, all-or-nothing application, counter
//! merges, and commit-versionstamped keys.

use crate::common::*;
use typedkv::{commit_versionstamp, CommitOutcome, Enqueued, Error, Mutation, RawValue};

// ============================================================================
// Checks and conflicts
// ============================================================================

#[test]
fn check_against_a_fresh_read_commits() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());
    kv.set(&ada, &prefs("dark")).unwrap();

    let current = kv.get(&ada).unwrap();
    let outcome = kv
        .atomic()
        .check(&current)
        .set(&ada, &prefs("light"))
        .commit()
        .unwrap();

    assert!(outcome.is_committed());
    assert_eq!(kv.get(&ada).unwrap().value(), Some(&prefs("light")));
}

#[test]
fn stale_check_conflicts_and_applies_nothing() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());
    let visits = Visits("ada".to_string());

    kv.set(&ada, &prefs("dark")).unwrap();
    let stale = kv.get(&ada).unwrap();
    kv.set(&ada, &prefs("light")).unwrap();

    let outcome = kv
        .atomic()
        .check(&stale)
        .set(&ada, &prefs("solarized"))
        .sum(&visits, 1)
        .commit()
        .unwrap();

    assert_eq!(outcome, CommitOutcome::Conflict);
    // Neither mutation of the conflicted commit applied.
    assert_eq!(kv.get(&ada).unwrap().value(), Some(&prefs("light")));
    assert!(!kv.get(&visits).unwrap().is_present());
}

#[test]
fn absence_check_makes_create_once() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());
    let absent = kv.get(&ada).unwrap();

    let first = kv
        .atomic()
        .check(&absent)
        .set(&ada, &prefs("dark"))
        .commit()
        .unwrap();
    assert!(first.is_committed());

    let second = kv
        .atomic()
        .check(&absent)
        .set(&ada, &prefs("light"))
        .commit()
        .unwrap();
    assert_eq!(second, CommitOutcome::Conflict);
    assert_eq!(kv.get(&ada).unwrap().value(), Some(&prefs("dark")));
}

#[test]
fn all_writes_of_a_commit_share_one_versionstamp() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());
    let general = Message::new("general", 1);

    let outcome = kv
        .atomic()
        .set(&ada, &prefs("dark"))
        .set(&general, &"hello".to_string())
        .commit()
        .unwrap();
    let versionstamp = outcome.versionstamp().unwrap();

    assert_eq!(kv.get(&ada).unwrap().versionstamp(), Some(versionstamp));
    assert_eq!(kv.get(&general).unwrap().versionstamp(), Some(versionstamp));
}

// ============================================================================
// Counter merges
// ============================================================================

#[test]
fn sums_accumulate_from_absent() {
    let kv = chat_kv();
    let visits = Visits("ada".to_string());

    for _ in 0..3 {
        kv.atomic().sum(&visits, 1).commit().unwrap();
    }
    assert_eq!(kv.get(&visits).unwrap().value(), Some(&3));
}

#[test]
fn min_and_max_merge_toward_their_extremum() {
    let kv = chat_kv();
    let visits = Visits("ada".to_string());

    kv.atomic().max(&visits, 10).commit().unwrap();
    kv.atomic().max(&visits, 4).commit().unwrap();
    assert_eq!(kv.get(&visits).unwrap().value(), Some(&10));

    kv.atomic().min(&visits, 6).commit().unwrap();
    kv.atomic().min(&visits, 8).commit().unwrap();
    assert_eq!(kv.get(&visits).unwrap().value(), Some(&6));
}

#[test]
fn merges_in_one_commit_apply_in_staged_order() {
    let kv = chat_kv();
    let visits = Visits("ada".to_string());

    kv.atomic()
        .sum(&visits, 5)
        .max(&visits, 3)
        .min(&visits, 4)
        .commit()
        .unwrap();
    assert_eq!(kv.get(&visits).unwrap().value(), Some(&4));
}

// ============================================================================
// Commit-versionstamped keys
// ============================================================================

#[test]
fn versionstamp_placeholder_keys_land_at_the_commit_versionstamp() {
    let kv = chat_kv();
    let key = Key::from(("events",)).append(commit_versionstamp());

    let outcome = kv
        .atomic()
        .mutate([Mutation::Set {
            key,
            value: RawValue::encode(&"created".to_string()).unwrap(),
            expires_in: None,
        }])
        .commit()
        .unwrap();
    let versionstamp = outcome.versionstamp().unwrap();

    let entry = kv.get(&Event(versionstamp.to_be_bytes().to_vec())).unwrap();
    assert_eq!(entry.value(), Some(&"created".to_string()));
}

#[test]
fn event_log_appends_read_back_in_commit_order() {
    let kv = chat_kv();
    for label in ["first", "second", "third"] {
        kv.atomic()
            .mutate([Mutation::Set {
                key: Key::from(("events",)).append(commit_versionstamp()),
                value: RawValue::encode(&label.to_string()).unwrap(),
                expires_in: None,
            }])
            .commit()
            .unwrap();
    }

    let labels: Vec<String> = kv
        .list(&Events, Default::default())
        .unwrap()
        .map(|entry| entry.unwrap().value)
        .collect();
    assert_eq!(labels, ["first", "second", "third"]);
}

// ============================================================================
// Staging errors
// ============================================================================

#[test]
fn staging_errors_surface_at_commit_and_nothing_applies() {
    let kv = chat_kv();
    let visits = Visits("ada".to_string());
    let foreign = Key::from(("drafts", "ada"));

    let result = kv
        .atomic()
        .sum(&visits, 1)
        .mutate([Mutation::Delete { key: foreign }])
        .commit();

    assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    assert!(!kv.get(&visits).unwrap().is_present());
}

#[test]
fn raw_counter_merges_against_blob_keys_fail_at_staging() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());
    kv.set(&ada, &prefs("dark")).unwrap();

    // The raw batch surface enforces counter kinds just like the typed one.
    let result = kv
        .atomic()
        .mutate([Mutation::Sum {
            key: ada.key(),
            amount: 1,
        }])
        .commit();

    assert!(matches!(result, Err(Error::NotACounter { .. })));
    assert_eq!(kv.get(&ada).unwrap().value(), Some(&prefs("dark")));
}

#[test]
fn raw_enqueues_validate_their_marker_keys() {
    let kv = chat_kv();
    let result = kv
        .atomic()
        .mutate([Mutation::Enqueue(Enqueued {
            payload: RawValue::encode(&"msg".to_string()).unwrap(),
            delay: None,
            keys_if_undelivered: vec![Key::from(("drafts", "ada"))],
            backoff_schedule: None,
        })])
        .commit();
    assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
}

#[test]
fn oversized_operations_are_rejected() {
    let kv = chat_kv();
    let visits = Visits("ada".to_string());

    let mut op = kv.atomic();
    for _ in 0..=typedkv::limits::MAX_ATOMIC_OPS {
        op = op.sum(&visits, 1);
    }
    assert!(matches!(op.commit(), Err(Error::TooManyOps { .. })));
    assert!(!kv.get(&visits).unwrap().is_present());
}
