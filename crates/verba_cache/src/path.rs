//! Tree positions used as memo keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step from a node to a node below it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Segment {
    /// The structural child at this index.
    Child(u32),
    /// The tree produced by the node's own `describe`.
    Expansion,
}

/// A position in the element tree, from the root down.
///
/// Positions are stable across compiles as long as the shape above them is
/// unchanged, which is what lets a child keep its memo entry while its parent
/// is re-described.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodePath(Vec<Segment>);

impl NodePath {
    /// The root position.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// The position of structural child `index` below this one.
    pub fn child(&self, index: usize) -> Self {
        self.with(Segment::Child(index as u32))
    }

    /// The position of this node's describe output.
    pub fn expansion(&self) -> Self {
        self.with(Segment::Expansion)
    }

    fn with(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Self(segments)
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The segments from the root down.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Returns `true` if `ancestor` is this path or lies above it.
    pub fn starts_with(&self, ancestor: &NodePath) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    /// Iterates over this path and every path above it, deepest first.
    pub fn ancestors(&self) -> impl Iterator<Item = NodePath> + '_ {
        (0..=self.0.len()).rev().map(|len| NodePath(self.0[..len].to_vec()))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            match segment {
                Segment::Child(i) => write!(f, "/{i}")?,
                Segment::Expansion => write!(f, "/@")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath({self})")
    }
}
