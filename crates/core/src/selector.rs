//! Range selectors for list operations
//!
//! A selector takes exactly one of four shapes: `{prefix}`,
//! `{prefix, start}`, `{prefix, end}`, or `{start, end}`. Construction
//! rejects malformed combinations (out-of-family bounds, inverted ranges)
//! before any schema is consulted; [`ListSelector::validate`] then checks
//! the selector against a schema, and [`ListSelector::resolve`] lowers it
//! to concrete scan bounds.
//!
//! A prefix selects the *strict* extensions of the prefix key: a record
//! stored at the prefix key itself is not part of the range. `start` is
//! inclusive and `end` exclusive throughout.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::schema::Schema;
use std::ops::Bound;

/// One of the four selector shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSelector {
    /// Every key strictly extending `prefix`.
    Prefix {
        /// The common prefix
        prefix: Key,
    },
    /// Keys extending `prefix`, from `start` (inclusive) onward.
    PrefixStart {
        /// The common prefix
        prefix: Key,
        /// Inclusive lower bound, itself prefixed by `prefix`
        start: Key,
    },
    /// Keys extending `prefix`, up to `end` (exclusive).
    PrefixEnd {
        /// The common prefix
        prefix: Key,
        /// Exclusive upper bound, itself prefixed by `prefix`
        end: Key,
    },
    /// Keys in `[start, end)`.
    Range {
        /// Inclusive lower bound
        start: Key,
        /// Exclusive upper bound
        end: Key,
    },
}

/// Concrete scan bounds a store can execute directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    /// Lower bound
    pub start: Bound<Key>,
    /// Upper bound
    pub end: Bound<Key>,
}

impl ScanRange {
    /// Whether `key` falls inside the bounds.
    pub fn contains(&self, key: &Key) -> bool {
        let above_start = match &self.start {
            Bound::Included(s) => key >= s,
            Bound::Excluded(s) => key > s,
            Bound::Unbounded => true,
        };
        let below_end = match &self.end {
            Bound::Included(e) => key <= e,
            Bound::Excluded(e) => key < e,
            Bound::Unbounded => true,
        };
        above_start && below_end
    }

    /// Narrow the lower bound to strictly after `key` (cursor resumption,
    /// forward scans).
    pub fn resume_after(&mut self, key: &Key) {
        self.start = Bound::Excluded(key.clone());
    }

    /// Narrow the upper bound to strictly before `key` (cursor resumption,
    /// reverse scans).
    pub fn resume_before(&mut self, key: &Key) {
        self.end = Bound::Excluded(key.clone());
    }
}

impl ListSelector {
    /// Select every key strictly extending `prefix`.
    pub fn prefix(prefix: impl Into<Key>) -> ListSelector {
        ListSelector::Prefix {
            prefix: prefix.into(),
        }
    }

    /// Select keys extending `prefix` from `start` onward.
    ///
    /// Errors unless `start` itself begins with `prefix`.
    pub fn prefix_start(prefix: impl Into<Key>, start: impl Into<Key>) -> Result<ListSelector> {
        let (prefix, start) = (prefix.into(), start.into());
        if !start.starts_with(&prefix) {
            return Err(Error::InvalidSelector {
                reason: format!("start {start} does not extend prefix {prefix}"),
            });
        }
        Ok(ListSelector::PrefixStart { prefix, start })
    }

    /// Select keys extending `prefix` up to `end` (exclusive).
    ///
    /// Errors unless `end` itself begins with `prefix`.
    pub fn prefix_end(prefix: impl Into<Key>, end: impl Into<Key>) -> Result<ListSelector> {
        let (prefix, end) = (prefix.into(), end.into());
        if !end.starts_with(&prefix) {
            return Err(Error::InvalidSelector {
                reason: format!("end {end} does not extend prefix {prefix}"),
            });
        }
        Ok(ListSelector::PrefixEnd { prefix, end })
    }

    /// Select keys in `[start, end)`.
    ///
    /// Errors if the range is inverted.
    pub fn range(start: impl Into<Key>, end: impl Into<Key>) -> Result<ListSelector> {
        let (start, end) = (start.into(), end.into());
        if start > end {
            return Err(Error::InvalidSelector {
                reason: format!("start {start} sorts after end {end}"),
            });
        }
        Ok(ListSelector::Range { start, end })
    }

    /// The prefix component, if this selector has one.
    pub fn prefix_key(&self) -> Option<&Key> {
        match self {
            ListSelector::Prefix { prefix }
            | ListSelector::PrefixStart { prefix, .. }
            | ListSelector::PrefixEnd { prefix, .. } => Some(prefix),
            ListSelector::Range { .. } => None,
        }
    }

    /// Check this selector against a schema.
    ///
    /// The prefix must be a valid schema prefix, and every explicit bound
    /// must narrow to at least one variant (be "in family"). For the
    /// `{start, end}` shape, the two bounds' longest common leading
    /// subsequence must itself be a valid prefix, i.e. they must sit under
    /// one common ancestor.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        if let Some(prefix) = self.prefix_key() {
            if !prefix.is_empty() {
                schema.check_prefix(prefix)?;
            }
        }
        match self {
            ListSelector::Prefix { .. } => Ok(()),
            ListSelector::PrefixStart { start: bound, .. }
            | ListSelector::PrefixEnd { end: bound, .. } => check_in_family(schema, bound),
            ListSelector::Range { start, end } => {
                check_in_family(schema, start)?;
                check_in_family(schema, end)?;
                let ancestor = common_prefix(start, end);
                if ancestor.is_empty() || schema.is_prefix(&ancestor) {
                    Ok(())
                } else {
                    Err(Error::InvalidSelector {
                        reason: format!(
                            "start {start} and end {end} share no valid common ancestor"
                        ),
                    })
                }
            }
        }
    }

    /// Lower to concrete scan bounds.
    pub fn resolve(&self) -> ScanRange {
        let prefix_end = |prefix: &Key| match prefix.prefix_successor() {
            Some(succ) => Bound::Excluded(succ),
            None => Bound::Unbounded,
        };
        match self {
            ListSelector::Prefix { prefix } => ScanRange {
                start: Bound::Excluded(prefix.clone()),
                end: prefix_end(prefix),
            },
            ListSelector::PrefixStart { prefix, start } => ScanRange {
                start: Bound::Included(start.clone()),
                end: prefix_end(prefix),
            },
            ListSelector::PrefixEnd { prefix, end } => ScanRange {
                start: Bound::Excluded(prefix.clone()),
                end: Bound::Excluded(end.clone()),
            },
            ListSelector::Range { start, end } => ScanRange {
                start: Bound::Included(start.clone()),
                end: Bound::Excluded(end.clone()),
            },
        }
    }
}

/// The bound must begin some variant's shape.
fn check_in_family(schema: &Schema, bound: &Key) -> Result<()> {
    if schema.variants_with_prefix(bound).is_empty() {
        return Err(Error::InvalidSelector {
            reason: format!("bound {bound} matches no schema variant"),
        });
    }
    Ok(())
}

/// Longest common leading subsequence of two keys.
fn common_prefix(a: &Key, b: &Key) -> Key {
    a.parts()
        .iter()
        .zip(b.parts())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.clone())
        .collect()
}
