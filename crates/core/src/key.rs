//! Keys: ordered sequences of typed parts
//!
//! Keys compare lexicographically by part, with the part order defined in
//! [`crate::part`]. Two consequences the rest of the crate relies on:
//!
//! - a prefix sorts immediately before every key that extends it, and
//! - the set of keys extending a prefix is a contiguous run in key order,
//!   ending just before [`Key::prefix_successor`].

use crate::part::KeyPart;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered sequence of key parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    parts: Vec<KeyPart>,
}

impl Key {
    /// The empty key, used as the all-encompassing list prefix.
    pub fn empty() -> Self {
        Key { parts: Vec::new() }
    }

    /// Build a key from parts.
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Key { parts }
    }

    /// The parts of this key, in order.
    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether this is the empty key.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Append a part, returning the extended key.
    pub fn append(mut self, part: impl Into<KeyPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    /// Whether this key begins with every part of `prefix`.
    ///
    /// Every key starts with the empty key. A key does not count as starting
    /// with itself for listing purposes; see [`Key::is_strict_extension_of`].
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.parts.len() >= prefix.parts.len() && self.parts[..prefix.parts.len()] == prefix.parts
    }

    /// Whether this key extends `prefix` by at least one part.
    pub fn is_strict_extension_of(&self, prefix: &Key) -> bool {
        self.parts.len() > prefix.parts.len() && self.starts_with(prefix)
    }

    /// The key with the last part removed, or `None` for the empty key.
    pub fn parent(&self) -> Option<Key> {
        if self.parts.is_empty() {
            return None;
        }
        Some(Key {
            parts: self.parts[..self.parts.len() - 1].to_vec(),
        })
    }

    /// The smallest key strictly greater than every key extending `self`.
    ///
    /// Returns `None` when no such key exists, i.e. the range extending this
    /// prefix is unbounded above. The empty prefix spans the whole key space.
    pub fn prefix_successor(&self) -> Option<Key> {
        let mut parts = self.parts.clone();
        while let Some(last) = parts.pop() {
            if let Some(next) = last.successor() {
                parts.push(next);
                return Some(Key { parts });
            }
            // Last part is maximal; the subtree ends where the parent's does.
        }
        None
    }

    /// Whether any part is the commit-versionstamp placeholder.
    pub fn has_commit_version(&self) -> bool {
        self.parts.iter().any(KeyPart::is_commit_version)
    }

    /// Replace every commit-versionstamp placeholder with `bytes`.
    pub fn resolve_commit_version(&self, bytes: &[u8]) -> Key {
        Key {
            parts: self
                .parts
                .iter()
                .map(|p| {
                    if p.is_commit_version() {
                        KeyPart::Bytes(bytes.to_vec())
                    } else {
                        p.clone()
                    }
                })
                .collect(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{part}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<KeyPart>> for Key {
    fn from(parts: Vec<KeyPart>) -> Self {
        Key { parts }
    }
}

impl FromIterator<KeyPart> for Key {
    fn from_iter<I: IntoIterator<Item = KeyPart>>(iter: I) -> Self {
        Key {
            parts: iter.into_iter().collect(),
        }
    }
}

// Tuple conversions so raw keys read like the shapes they match:
// `Key::from(("user", "ada"))`.
macro_rules! impl_key_from_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<KeyPart>),+> From<($($name,)+)> for Key {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Key { parts: vec![$($name.into()),+] }
            }
        }
    };
}

impl_key_from_tuple!(A);
impl_key_from_tuple!(A, B);
impl_key_from_tuple!(A, B, C);
impl_key_from_tuple!(A, B, C, D);
impl_key_from_tuple!(A, B, C, D, E);
impl_key_from_tuple!(A, B, C, D, E, F);
