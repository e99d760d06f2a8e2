//! Error types for memo table operations.

use crate::path::NodePath;

/// Errors that can occur inside a memo table.
///
/// Lookups never fail on mismatched inputs (that is an ordinary miss). These
/// variants signal a broken internal invariant and abort the compile that
/// hit them.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The position index refers to an arena slot that does not exist.
    #[error("memo table `{table}` lost the entry for {path}")]
    DanglingIndex {
        /// Name of the table.
        table: &'static str,
        /// The position whose index entry is dangling.
        path: NodePath,
    },

    /// A stored entry is filed under a different position than the index says.
    #[error("memo table `{table}` has entry for {found} indexed under {path}")]
    MisfiledEntry {
        /// Name of the table.
        table: &'static str,
        /// The position used for the lookup.
        path: NodePath,
        /// The position recorded in the entry itself.
        found: NodePath,
    },
}
