//! The fully expanded structural tree produced by a compile.
//!
//! Expanded nodes are immutable and shared through `Arc`, so the memo cache
//! can hand back a whole previously built subtree without copying it.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::element::Element;
use crate::value::Value;

/// What lies below an expanded node.
#[derive(Debug, Clone)]
pub enum Body {
    /// The node's structural children, each expanded in place.
    Structural(Vec<Arc<Expanded>>),
    /// The expansion of the node's `describe` output.
    Described(Arc<Expanded>),
}

/// An element together with its derived data and its expansion.
#[derive(Debug, Clone)]
pub struct Expanded {
    element: Element,
    data: Option<Value>,
    body: Body,
}

impl Expanded {
    /// A node whose children are expanded in place.
    pub fn structural(
        element: Element,
        data: Option<Value>,
        children: Vec<Arc<Expanded>>,
    ) -> Self {
        Self {
            element,
            data,
            body: Body::Structural(children),
        }
    }

    /// A node replaced by the expansion of its `describe` output.
    pub fn from_description(
        element: Element,
        data: Option<Value>,
        expansion: Arc<Expanded>,
    ) -> Self {
        Self {
            element,
            data,
            body: Body::Described(expansion),
        }
    }

    /// The element as written, before expansion.
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// The node's derived data, if it observes anything.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// What lies below the node.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// The expansion of the node's `describe` output, if it was described.
    pub fn described(&self) -> Option<&Expanded> {
        match &self.body {
            Body::Described(inner) => Some(inner),
            Body::Structural(_) => None,
        }
    }

    /// The expanded structural children; empty for described nodes.
    pub fn children(&self) -> &[Arc<Expanded>] {
        match &self.body {
            Body::Structural(children) => children,
            Body::Described(_) => &[],
        }
    }

    /// Total number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + match &self.body {
            Body::Structural(children) => children.iter().map(|c| c.node_count()).sum(),
            Body::Described(inner) => inner.node_count(),
        }
    }

    /// Follows `describe` outputs down to the first node that was not described.
    pub fn innermost(&self) -> &Expanded {
        let mut node = self;
        while let Some(inner) = node.described() {
            node = inner;
        }
        node
    }
}

impl Serialize for Expanded {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Expanded", 4)?;
        s.serialize_field("kind", self.element.kind_name())?;
        s.serialize_field("props", self.element.props())?;
        s.serialize_field("data", &self.data)?;
        match &self.body {
            Body::Structural(children) => {
                let children: Vec<&Expanded> = children.iter().map(|c| c.as_ref()).collect();
                s.serialize_field("children", &children)?;
            }
            Body::Described(inner) => s.serialize_field("described", inner.as_ref())?,
        }
        s.end()
    }
}
