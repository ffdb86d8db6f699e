//! Key components and their total order
//!
//! A key is an ordered sequence of typed parts. Parts order first by type
//! rank (`Bytes < Str < Int < Bool`), then by value within the rank. This
//! order is what makes prefix ranges contiguous: every key extending a
//! prefix sorts immediately after the prefix itself and before any sibling.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One component of a key.
///
/// `CommitVersion` is a placeholder, not a storable part: it may appear only
/// in keys staged through an atomic operation, where the store replaces it
/// with the commit's versionstamp as a `Bytes` part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    /// Raw bytes component
    Bytes(Vec<u8>),
    /// UTF-8 string component
    Str(String),
    /// 64-bit signed integer component
    Int(i64),
    /// Boolean component
    Bool(bool),
    /// Placeholder for the versionstamp the enclosing commit will produce
    CommitVersion,
}

/// The type of a key component, as declared in a schema shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartType {
    /// Raw bytes
    Bytes,
    /// UTF-8 string
    Str,
    /// 64-bit signed integer
    Int,
    /// Boolean
    Bool,
}

impl KeyPart {
    /// Ordering rank of this part's type.
    fn rank(&self) -> u8 {
        match self {
            KeyPart::Bytes(_) => 0,
            KeyPart::Str(_) => 1,
            KeyPart::Int(_) => 2,
            KeyPart::Bool(_) => 3,
            KeyPart::CommitVersion => 4,
        }
    }

    /// The declared type this part matches, if it is storable.
    ///
    /// `CommitVersion` matches `Bytes` because that is what the store
    /// substitutes at commit time.
    pub fn matches(&self, part_type: PartType) -> bool {
        match self {
            KeyPart::Bytes(_) | KeyPart::CommitVersion => part_type == PartType::Bytes,
            KeyPart::Str(_) => part_type == PartType::Str,
            KeyPart::Int(_) => part_type == PartType::Int,
            KeyPart::Bool(_) => part_type == PartType::Bool,
        }
    }

    /// Whether this part is the commit-versionstamp placeholder.
    pub fn is_commit_version(&self) -> bool {
        matches!(self, KeyPart::CommitVersion)
    }

    /// The immediate successor of this part in the total order.
    ///
    /// Used to compute exclusive upper bounds for prefix ranges. Returns
    /// `None` when the part is the maximum of the whole order (`Bool(true)`),
    /// in which case the enclosing range is unbounded at that position.
    pub fn successor(&self) -> Option<KeyPart> {
        match self {
            KeyPart::Bytes(b) => {
                let mut next = b.clone();
                next.push(0);
                Some(KeyPart::Bytes(next))
            }
            KeyPart::Str(s) => {
                let mut next = s.clone();
                next.push('\0');
                Some(KeyPart::Str(next))
            }
            KeyPart::Int(i) => match i.checked_add(1) {
                Some(n) => Some(KeyPart::Int(n)),
                None => Some(KeyPart::Bool(false)),
            },
            KeyPart::Bool(false) => Some(KeyPart::Bool(true)),
            KeyPart::Bool(true) => None,
            // Never stored, so never the last part of a persisted prefix.
            KeyPart::CommitVersion => None,
        }
    }
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Bytes(a), KeyPart::Bytes(b)) => a.cmp(b),
            (KeyPart::Str(a), KeyPart::Str(b)) => a.cmp(b),
            (KeyPart::Int(a), KeyPart::Int(b)) => a.cmp(b),
            (KeyPart::Bool(a), KeyPart::Bool(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            KeyPart::Str(s) => write!(f, "{s:?}"),
            KeyPart::Int(i) => write!(f, "{i}"),
            KeyPart::Bool(b) => write!(f, "{b}"),
            KeyPart::CommitVersion => write!(f, "<commit-versionstamp>"),
        }
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartType::Bytes => "bytes",
            PartType::Str => "str",
            PartType::Int => "int",
            PartType::Bool => "bool",
        };
        write!(f, "{name}")
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Str(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Str(s)
    }
}

impl From<i64> for KeyPart {
    fn from(i: i64) -> Self {
        KeyPart::Int(i)
    }
}

impl From<bool> for KeyPart {
    fn from(b: bool) -> Self {
        KeyPart::Bool(b)
    }
}

impl From<Vec<u8>> for KeyPart {
    fn from(b: Vec<u8>) -> Self {
        KeyPart::Bytes(b)
    }
}

impl From<&[u8]> for KeyPart {
    fn from(b: &[u8]) -> Self {
        KeyPart::Bytes(b.to_vec())
    }
}
