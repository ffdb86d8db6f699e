//! Entries: the canonical (key, value, versionstamp) record
//!
//! Reads return [`MaybeEntry`], whose `Absent` arm stands for "no record at
//! this key" while still carrying the key that was asked for.

use crate::key::Key;
use crate::version::Versionstamp;

/// A present record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    /// The key the record lives at
    pub key: Key,
    /// The stored value
    pub value: V,
    /// The versionstamp assigned when the record was last written
    pub versionstamp: Versionstamp,
}

impl<V> Entry<V> {
    /// Map the value, keeping key and versionstamp.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Entry<U> {
        Entry {
            key: self.key,
            value: f(self.value),
            versionstamp: self.versionstamp,
        }
    }

    /// Map the value fallibly, keeping key and versionstamp.
    pub fn try_map<U, E>(self, f: impl FnOnce(&Key, V) -> Result<U, E>) -> Result<Entry<U>, E> {
        let value = f(&self.key, self.value)?;
        Ok(Entry {
            key: self.key,
            value,
            versionstamp: self.versionstamp,
        })
    }
}

/// A record or its absent form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaybeEntry<V> {
    /// A record exists at the key.
    Present(Entry<V>),
    /// No record at the key.
    Absent {
        /// The key that was read
        key: Key,
    },
}

impl<V> MaybeEntry<V> {
    /// Build the absent form for `key`.
    pub fn absent(key: Key) -> Self {
        MaybeEntry::Absent { key }
    }

    /// The key this read was about, present or not.
    pub fn key(&self) -> &Key {
        match self {
            MaybeEntry::Present(entry) => &entry.key,
            MaybeEntry::Absent { key } => key,
        }
    }

    /// The value, if present.
    pub fn value(&self) -> Option<&V> {
        match self {
            MaybeEntry::Present(entry) => Some(&entry.value),
            MaybeEntry::Absent { .. } => None,
        }
    }

    /// The versionstamp, if present.
    pub fn versionstamp(&self) -> Option<Versionstamp> {
        match self {
            MaybeEntry::Present(entry) => Some(entry.versionstamp),
            MaybeEntry::Absent { .. } => None,
        }
    }

    /// Whether a record exists.
    pub fn is_present(&self) -> bool {
        matches!(self, MaybeEntry::Present(_))
    }

    /// Consume into the value, if present.
    pub fn into_value(self) -> Option<V> {
        match self {
            MaybeEntry::Present(entry) => Some(entry.value),
            MaybeEntry::Absent { .. } => None,
        }
    }

    /// Consume into the entry, if present.
    pub fn into_entry(self) -> Option<Entry<V>> {
        match self {
            MaybeEntry::Present(entry) => Some(entry),
            MaybeEntry::Absent { .. } => None,
        }
    }

    /// Map the value fallibly, keeping the absent form untouched.
    pub fn try_map<U, E>(
        self,
        f: impl FnOnce(&Key, V) -> Result<U, E>,
    ) -> Result<MaybeEntry<U>, E> {
        match self {
            MaybeEntry::Present(entry) => Ok(MaybeEntry::Present(entry.try_map(f)?)),
            MaybeEntry::Absent { key } => Ok(MaybeEntry::Absent { key }),
        }
    }
}
