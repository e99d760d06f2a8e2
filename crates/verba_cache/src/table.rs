//! Position-indexed memo table.

use std::collections::{HashMap, HashSet};

use verba_common::{define_id, Arena, ContentHash};

use crate::error::CacheError;
use crate::path::NodePath;
use crate::stats::TableStats;

define_id!(
    /// Opaque, copyable ID for an entry in a [`MemoTable`].
    EntryId
);

/// A stored computation: the inputs it ran on and the output it produced.
#[derive(Debug, Clone)]
pub struct Memo<I, O> {
    /// Position this entry belongs to.
    pub path: NodePath,
    /// Fingerprint of `inputs`.
    pub fingerprint: ContentHash,
    /// The inputs the output was computed from.
    pub inputs: I,
    /// The stored output.
    pub output: O,
    /// Generation in which the entry was last stored or reused.
    generation: u64,
}

/// Outcome of a [`MemoTable::lookup`].
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<O> {
    /// The stored inputs equal the current ones; here is the stored output.
    Hit(O),
    /// An entry exists at this position but its inputs differ.
    Stale,
    /// No entry exists at this position.
    Vacant,
}

impl<O> Lookup<O> {
    /// Returns the stored output on a hit.
    pub fn hit(self) -> Option<O> {
        match self {
            Lookup::Hit(output) => Some(output),
            Lookup::Stale | Lookup::Vacant => None,
        }
    }
}

/// Memo storage for one pipeline stage, keyed by tree position.
///
/// An entry is reusable only if the current inputs have the same fingerprint
/// as the stored ones *and* compare equal to them. Each position holds at most
/// one entry; storing at an occupied position replaces the entry in place.
pub struct MemoTable<I, O> {
    name: &'static str,
    entries: Arena<EntryId, Memo<I, O>>,
    index: HashMap<NodePath, EntryId>,
    generation: u64,
    /// Positions whose whole subtree was reused during the current generation.
    live_roots: HashSet<NodePath>,
    stats: TableStats,
}

impl<I: PartialEq, O: Clone> MemoTable<I, O> {
    /// Creates an empty table. `name` labels log events and errors.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Arena::new(),
            index: HashMap::new(),
            generation: 0,
            live_roots: HashSet::new(),
            stats: TableStats::default(),
        }
    }

    /// Returns the table's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Starts a new compile generation and returns its number.
    pub fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.live_roots.clear();
        self.generation
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Looks up the entry at `path` against the current inputs.
    ///
    /// A hit marks the entry live for the current generation.
    pub fn lookup(
        &mut self,
        path: &NodePath,
        fingerprint: ContentHash,
        inputs: &I,
    ) -> Result<Lookup<O>, CacheError> {
        let Some(&id) = self.index.get(path) else {
            self.stats.vacant += 1;
            return Ok(Lookup::Vacant);
        };
        let generation = self.generation;
        let name = self.name;
        let memo = self
            .entries
            .try_get_mut(id)
            .ok_or_else(|| CacheError::DanglingIndex {
                table: name,
                path: path.clone(),
            })?;
        if memo.path != *path {
            return Err(CacheError::MisfiledEntry {
                table: name,
                path: path.clone(),
                found: memo.path.clone(),
            });
        }

        if memo.fingerprint != fingerprint {
            self.stats.stale += 1;
            return Ok(Lookup::Stale);
        }
        if memo.inputs != *inputs {
            tracing::warn!(
                table = name,
                path = %path,
                fingerprint = %fingerprint,
                "memo: fingerprint collision, recomputing"
            );
            self.stats.collisions += 1;
            return Ok(Lookup::Stale);
        }

        memo.generation = generation;
        self.stats.hits += 1;
        Ok(Lookup::Hit(memo.output.clone()))
    }

    /// Stores `output` for `inputs` at `path`, replacing any previous entry.
    pub fn store(
        &mut self,
        path: NodePath,
        fingerprint: ContentHash,
        inputs: I,
        output: O,
    ) -> Result<EntryId, CacheError> {
        let memo = Memo {
            path: path.clone(),
            fingerprint,
            inputs,
            output,
            generation: self.generation,
        };
        self.stats.stores += 1;

        let existing = self.index.get(&path).copied();
        match existing {
            Some(id) => {
                let slot = self
                    .entries
                    .try_get_mut(id)
                    .ok_or_else(|| CacheError::DanglingIndex {
                        table: self.name,
                        path: path.clone(),
                    })?;
                *slot = memo;
                Ok(id)
            }
            None => {
                let id = self.entries.alloc(memo);
                self.index.insert(path, id);
                Ok(id)
            }
        }
    }

    /// Marks every entry at or below `root` live for the current generation.
    ///
    /// Used when a whole subtree is reused without visiting its positions.
    pub fn keep_subtree(&mut self, root: &NodePath) {
        self.live_roots.insert(root.clone());
    }

    /// Drops every entry that was neither reused nor stored in the current
    /// generation, and is not below a kept subtree. Returns the number of
    /// entries dropped.
    pub fn sweep(&mut self) -> usize {
        let generation = self.generation;
        let live_roots = &self.live_roots;
        let entries = std::mem::take(&mut self.entries);
        let before = entries.len();

        let (survivors, _) = entries.compact(|_, memo| {
            memo.generation == generation
                || memo.path.ancestors().any(|a| live_roots.contains(&a))
        });

        self.index = survivors
            .iter()
            .map(|(id, memo)| (memo.path.clone(), id))
            .collect();
        self.entries = survivors;

        let evicted = before - self.entries.len();
        self.stats.evictions += evicted as u64;
        if evicted > 0 {
            tracing::debug!(
                table = self.name,
                evicted,
                remaining = self.entries.len(),
                "memo: sweep"
            );
        }
        evicted
    }

    /// Removes every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.stats.evictions += self.entries.len() as u64;
        self.entries = Arena::new();
        self.index.clear();
        self.live_roots.clear();
    }

    /// Returns the entry stored at `path`, if any.
    pub fn get(&self, path: &NodePath) -> Option<&Memo<I, O>> {
        self.index.get(path).and_then(|&id| self.entries.try_get(id))
    }

    /// Returns `true` if an entry exists at `path`.
    pub fn contains(&self, path: &NodePath) -> bool {
        self.index.contains_key(path)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the table's running counters.
    pub fn stats(&self) -> TableStats {
        self.stats
    }
}
