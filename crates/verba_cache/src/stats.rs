//! Hit/miss counters for a memo table.

use serde::{Deserialize, Serialize};

/// Running counters for one [`MemoTable`](crate::MemoTable).
///
/// Counters accumulate over the table's lifetime and are never reset by
/// sweeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    /// Lookups that returned a stored output.
    pub hits: u64,
    /// Lookups at a position with no entry.
    pub vacant: u64,
    /// Lookups at a position whose stored inputs differ from the current ones.
    pub stale: u64,
    /// Lookups where fingerprints matched but the inputs compared unequal.
    pub collisions: u64,
    /// Outputs written (new entries and in-place replacements).
    pub stores: u64,
    /// Entries dropped by sweeping.
    pub evictions: u64,
}

impl TableStats {
    /// Total lookups that did not return a stored output.
    pub fn misses(&self) -> u64 {
        self.vacant + self.stale + self.collisions
    }

    /// Total lookups.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses()
    }
}
