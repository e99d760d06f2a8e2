//! Shared foundational types used across the verba grammar compiler.
//!
//! This crate provides content hashing for memo fingerprints, a canonical
//! byte encoder that feeds those hashes, and dense ID-indexed arena storage.

#![warn(missing_docs)]

pub mod arena;
pub mod hash;

pub use arena::{Arena, ArenaId};
pub use hash::{ContentHash, FingerprintBuilder};
