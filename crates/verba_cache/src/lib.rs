//! Incremental memoization for the verba compile pipeline.
//!
//! A [`MemoTable`] remembers, for each position in an element tree, the
//! inputs a stage last saw there and the output it produced. A later compile
//! that presents structurally equal inputs at the same position gets the
//! stored output back instead of recomputing it. Positions are addressed by
//! [`NodePath`]; entries live in a dense arena and are replaced in place when
//! their inputs change.

#![warn(missing_docs)]

pub mod error;
pub mod path;
pub mod stats;
pub mod table;

pub use error::CacheError;
pub use path::{NodePath, Segment};
pub use stats::TableStats;
pub use table::{EntryId, Lookup, Memo, MemoTable};
