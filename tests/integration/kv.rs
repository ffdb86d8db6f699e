//! Reads and Writes
//!
//! Round trips, absence semantics, expiry, and heterogeneous batched reads.

use crate::common::*;
use std::time::Duration;
use typedkv::{Consistency, Error};

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn set_then_get_round_trips_the_declared_type() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());

    let versionstamp = kv.set(&ada, &prefs("dark")).unwrap();

    let entry = kv.get(&ada).unwrap();
    assert_eq!(entry.value(), Some(&prefs("dark")));
    assert_eq!(entry.versionstamp(), Some(versionstamp));
    assert_eq!(entry.key(), &Key::from(("preferences", "ada")));
}

#[test]
fn counter_keys_read_and_write_as_u64() {
    let kv = chat_kv();
    let visits = Visits("ada".to_string());

    kv.set(&visits, &41).unwrap();
    assert_eq!(kv.get(&visits).unwrap().value(), Some(&41));
}

#[test]
fn overwrite_bumps_the_versionstamp() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());

    let first = kv.set(&ada, &prefs("dark")).unwrap();
    let second = kv.set(&ada, &prefs("light")).unwrap();

    assert!(second > first);
    assert_eq!(kv.get(&ada).unwrap().value(), Some(&prefs("light")));
}

#[test]
fn eventual_reads_work_against_the_memory_store() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());
    kv.set(&ada, &prefs("dark")).unwrap();

    let entry = kv.get_with(&ada, Consistency::Eventual).unwrap();
    assert_eq!(entry.value(), Some(&prefs("dark")));
}

// ============================================================================
// Absence
// ============================================================================

#[test]
fn absent_reads_carry_the_key() {
    let kv = chat_kv();
    let entry = kv.get(&UserPrefs("nobody".to_string())).unwrap();

    assert!(!entry.is_present());
    assert_eq!(entry.key(), &Key::from(("preferences", "nobody")));
    assert_eq!(entry.versionstamp(), None);
}

#[test]
fn delete_removes_and_is_idempotent() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());

    kv.set(&ada, &prefs("dark")).unwrap();
    kv.delete(&ada).unwrap();
    assert!(!kv.get(&ada).unwrap().is_present());

    // Deleting what is not there is a no-op, not an error.
    kv.delete(&ada).unwrap();
}

// ============================================================================
// Expiry
// ============================================================================

#[test]
fn expired_entries_read_absent() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());

    kv.set_with_ttl(&ada, &prefs("dark"), Duration::ZERO).unwrap();
    assert!(!kv.get(&ada).unwrap().is_present());
}

#[test]
fn unexpired_entries_are_still_readable() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());

    kv.set_with_ttl(&ada, &prefs("dark"), Duration::from_secs(3600))
        .unwrap();
    assert!(kv.get(&ada).unwrap().is_present());
}

// ============================================================================
// Batched reads
// ============================================================================

#[test]
fn get_many_narrows_each_key_to_its_own_type() {
    let kv = chat_kv();
    let ada = UserPrefs("ada".to_string());
    let visits = Visits("ada".to_string());

    kv.set(&ada, &prefs("dark")).unwrap();
    kv.set(&visits, &7).unwrap();

    let (prefs_entry, visits_entry, missing) = kv
        .get_many((&ada, &visits, &Message::new("general", 1)))
        .unwrap();

    assert_eq!(prefs_entry.value(), Some(&prefs("dark")));
    assert_eq!(visits_entry.value(), Some(&7));
    assert!(!missing.is_present());
}

#[test]
fn get_many_reads_one_snapshot_in_key_order() {
    let kv = chat_kv();
    kv.set(&Message::new("general", 1), &"hello".to_string())
        .unwrap();
    kv.set(&Message::new("general", 2), &"world".to_string())
        .unwrap();

    let (second, first) = kv
        .get_many((&Message::new("general", 2), &Message::new("general", 1)))
        .unwrap();
    // Entries come back in argument order, not key order.
    assert_eq!(second.value(), Some(&"world".to_string()));
    assert_eq!(first.value(), Some(&"hello".to_string()));
}

// ============================================================================
// Schema enforcement on raw surfaces
// ============================================================================

#[test]
fn raw_keys_outside_the_schema_are_rejected() {
    let kv = chat_kv();
    let foreign = Key::from(("drafts", "ada"));

    let result = kv.watch_keys(vec![foreign.clone()]);
    assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    let result = kv.get_raw(&foreign, Consistency::Strong);
    assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
}

#[test]
fn raw_reads_return_undecoded_values() {
    let kv = Kv::<ChatSpace>::in_memory();
    kv.set(&Visits("ada".to_string()), &7).unwrap();

    let entry = kv
        .get_raw(&Key::from(("visits", "ada")), Consistency::Strong)
        .unwrap();
    assert_eq!(entry.value(), Some(&typedkv::RawValue::Counter(7)));
}
