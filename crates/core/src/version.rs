//! Versionstamps and commit outcomes
//!
//! A versionstamp is an opaque, totally ordered token the store assigns at
//! write time. Callers compare and echo them back in preconditions; they
//! never construct meaningful ones themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque optimistic-concurrency token assigned by the store on write.
///
/// Displays as a 20-digit zero-padded lowercase hex token and parses back
/// from that form. Ordering follows assignment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Versionstamp(u64);

impl Versionstamp {
    /// Wrap a store-assigned commit version.
    ///
    /// Only store implementations have business calling this; a fabricated
    /// versionstamp will simply fail its precondition checks.
    pub fn new(version: u64) -> Self {
        Versionstamp(version)
    }

    /// Big-endian byte form, used when a commit-versionstamp placeholder is
    /// resolved into a key part.
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Versionstamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:020x}", self.0)
    }
}

/// Error parsing a versionstamp token.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseVersionstampError;

impl fmt::Display for ParseVersionstampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed versionstamp token")
    }
}

impl std::error::Error for ParseVersionstampError {}

impl FromStr for Versionstamp {
    type Err = ParseVersionstampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 20 {
            return Err(ParseVersionstampError);
        }
        u64::from_str_radix(s, 16)
            .map(Versionstamp)
            .map_err(|_| ParseVersionstampError)
    }
}

/// Result of committing an atomic operation.
///
/// A conflict is a normal, expected outcome of optimistic concurrency, not
/// a fault: callers retry with fresh reads. Transport and store faults are
/// reported separately as [`crate::Error::Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every check held and every mutation applied.
    Committed {
        /// The versionstamp assigned to all writes of this commit
        versionstamp: Versionstamp,
    },
    /// At least one check failed; nothing was applied.
    Conflict,
}

impl CommitOutcome {
    /// Whether the operation committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }

    /// The new versionstamp, if committed.
    pub fn versionstamp(&self) -> Option<Versionstamp> {
        match self {
            CommitOutcome::Committed { versionstamp } => Some(*versionstamp),
            CommitOutcome::Conflict => None,
        }
    }
}
