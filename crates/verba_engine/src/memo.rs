//! Memo tables backing incremental compiles.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use verba_cache::{MemoTable, NodePath, TableStats};
use verba_common::{ContentHash, FingerprintBuilder};

use crate::element::{Element, Kind, Props};
use crate::expanded::Expanded;
use crate::fingerprint::Canonical;
use crate::value::Value;

/// The inputs `observe` (or an external source) sees at a position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ObserveInputs {
    pub kind: Kind,
    pub props: Props,
    pub children: Vec<Element>,
}

impl ObserveInputs {
    pub fn of(element: &Element) -> Self {
        Self {
            kind: element.kind().clone(),
            props: element.props().clone(),
            children: element.children().to_vec(),
        }
    }

    pub fn fingerprint(&self) -> ContentHash {
        let mut fp = FingerprintBuilder::new();
        fp.tag(b'o');
        self.kind.write_canonical(&mut fp);
        self.props.write_canonical(&mut fp);
        self.children.as_slice().write_canonical(&mut fp);
        fp.finish()
    }
}

/// The inputs `describe` sees at a position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DescribeInputs {
    pub kind: Kind,
    pub props: Props,
    pub children: Vec<Element>,
    pub data: Option<Value>,
}

impl DescribeInputs {
    pub fn of(element: &Element, data: Option<Value>) -> Self {
        Self {
            kind: element.kind().clone(),
            props: element.props().clone(),
            children: element.children().to_vec(),
            data,
        }
    }

    pub fn fingerprint(&self) -> ContentHash {
        let mut fp = FingerprintBuilder::new();
        fp.tag(b'd');
        self.kind.write_canonical(&mut fp);
        self.props.write_canonical(&mut fp);
        self.children.as_slice().write_canonical(&mut fp);
        self.data.write_canonical(&mut fp);
        fp.finish()
    }
}

/// An element expanded outside the compiled tree, during traversal.
struct AdHocExpansion {
    element: Element,
    expanded: Arc<Expanded>,
    generation: u64,
}

/// Per-position memo of derived data and describe expansions, plus the
/// expansions of elements that `visit` hands to the traverser.
pub(crate) struct MemoStore {
    pub observations: MemoTable<ObserveInputs, Option<Value>>,
    pub expansions: MemoTable<DescribeInputs, Arc<Expanded>>,
    ad_hoc: HashMap<ContentHash, AdHocExpansion>,
    ad_hoc_stats: TableStats,
    generation: u64,
}

impl Default for MemoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoStore {
    pub fn new() -> Self {
        Self {
            observations: MemoTable::new("observe"),
            expansions: MemoTable::new("describe"),
            ad_hoc: HashMap::new(),
            ad_hoc_stats: TableStats::default(),
            generation: 0,
        }
    }

    pub fn begin_generation(&mut self) -> u64 {
        self.observations.begin_generation();
        self.generation = self.expansions.begin_generation();
        self.generation
    }

    /// Keeps every entry below a reused expansion alive through the next sweep.
    pub fn keep_subtree(&mut self, root: &NodePath) {
        self.observations.keep_subtree(root);
        self.expansions.keep_subtree(root);
    }

    /// Returns the stored expansion of an element traversed ad hoc.
    pub fn ad_hoc(&mut self, element: &Element) -> Option<Arc<Expanded>> {
        let generation = self.generation;
        let Some(entry) = self.ad_hoc.get_mut(&element.content_hash()) else {
            self.ad_hoc_stats.vacant += 1;
            return None;
        };
        if entry.element != *element {
            self.ad_hoc_stats.collisions += 1;
            return None;
        }
        entry.generation = generation;
        self.ad_hoc_stats.hits += 1;
        Some(Arc::clone(&entry.expanded))
    }

    pub fn store_ad_hoc(&mut self, element: Element, expanded: Arc<Expanded>) {
        self.ad_hoc_stats.stores += 1;
        self.ad_hoc.insert(
            element.content_hash(),
            AdHocExpansion {
                element,
                expanded,
                generation: self.generation,
            },
        );
    }

    /// Drops unreached positions, and ad hoc expansions that neither the
    /// current compile's parsers nor the previous one's have used.
    pub fn sweep(&mut self) -> usize {
        let floor = self.generation.saturating_sub(1);
        let before = self.ad_hoc.len();
        self.ad_hoc.retain(|_, entry| entry.generation >= floor);
        let dropped = before - self.ad_hoc.len();
        self.ad_hoc_stats.evictions += dropped as u64;

        self.observations.sweep() + self.expansions.sweep() + dropped
    }

    pub fn clear(&mut self) {
        self.observations.clear();
        self.expansions.clear();
        self.ad_hoc_stats.evictions += self.ad_hoc.len() as u64;
        self.ad_hoc.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            observe: self.observations.stats(),
            describe: self.expansions.stats(),
            ad_hoc: self.ad_hoc_stats,
            observe_entries: self.observations.len(),
            describe_entries: self.expansions.len(),
            ad_hoc_entries: self.ad_hoc.len(),
        }
    }
}

/// Snapshot of a processor's memo cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Counters for memoized observations (observe, sources, registration).
    pub observe: TableStats,
    /// Counters for memoized describe expansions.
    pub describe: TableStats,
    /// Counters for elements expanded during traversal.
    pub ad_hoc: TableStats,
    /// Observation entries currently stored.
    pub observe_entries: usize,
    /// Expansion entries currently stored.
    pub describe_entries: usize,
    /// Traversal-time expansions currently stored.
    pub ad_hoc_entries: usize,
}
