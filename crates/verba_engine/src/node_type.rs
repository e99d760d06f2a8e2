//! Caller-defined node types and their capabilities.
//!
//! A node type may implement any subset of `observe`, `describe`, and
//! `visit`. Each slot is an explicit [`Capability`]; an absent slot selects
//! the pass-through behaviour of its stage.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::element::{Element, Props};
use crate::error::NodeFault;
use crate::expanded::Expanded;
use crate::option::ParseOption;
use crate::traverse::Traverser;
use crate::value::Value;

/// Input to `observe`.
#[derive(Debug, Clone, Copy)]
pub struct ObserveContext<'a> {
    /// The element's props.
    pub props: &'a Props,
    /// The element's children; empty if it has none.
    pub children: &'a [Element],
}

/// Input to `describe`.
#[derive(Debug, Clone, Copy)]
pub struct DescribeContext<'a> {
    /// The node's derived data; `None` if the node observes nothing.
    pub data: Option<&'a Value>,
    /// The element's props.
    pub props: &'a Props,
    /// The element's children.
    pub children: &'a [Element],
}

/// Input to `visit`.
#[derive(Debug, Clone, Copy)]
pub struct VisitContext<'a> {
    /// The node's derived data, the same value `describe` received.
    pub data: Option<&'a Value>,
    /// The element's props.
    pub props: &'a Props,
    /// The expanded node being visited.
    pub node: &'a Expanded,
}

impl<'a> VisitContext<'a> {
    /// The tree produced by the node's `describe`, if it has one.
    pub fn described(&self) -> Option<&'a Expanded> {
        self.node.described()
    }
}

/// Computes a raw value from a node's props and children.
pub type ObserveFn = Arc<dyn Fn(&ObserveContext<'_>) -> Result<Value, NodeFault> + Send + Sync>;

/// Expands a node into a structural element tree given its data.
pub type DescribeFn =
    Arc<dyn Fn(&DescribeContext<'_>) -> Result<Element, NodeFault> + Send + Sync>;

/// Produces parse options for a node, optionally delegating to the traverser.
pub type VisitFn = Arc<
    dyn Fn(&ParseOption, &VisitContext<'_>, &Traverser<'_>) -> Result<Vec<ParseOption>, NodeFault>
        + Send
        + Sync,
>;

/// An optional capability slot.
#[derive(Clone)]
pub enum Capability<F> {
    /// The node type does not implement this capability.
    Absent,
    /// The node type implements this capability.
    Present(F),
}

impl<F> Capability<F> {
    /// Returns `true` if the capability is implemented.
    pub fn is_present(&self) -> bool {
        matches!(self, Capability::Present(_))
    }

    /// Returns the implementation, if present.
    pub fn get(&self) -> Option<&F> {
        match self {
            Capability::Present(f) => Some(f),
            Capability::Absent => None,
        }
    }
}

/// Names of the three node-type capabilities.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CapabilityName {
    /// `observe`
    Observe,
    /// `describe`
    Describe,
    /// `visit`
    Visit,
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapabilityName::Observe => "observe",
            CapabilityName::Describe => "describe",
            CapabilityName::Visit => "visit",
        };
        f.write_str(name)
    }
}

static NEXT_NODE_TYPE_ID: AtomicU64 = AtomicU64::new(0);

/// A caller-defined node type.
///
/// Every node type gets a process-unique id at construction, so two types
/// that happen to share a name never share memo entries.
///
/// ```ignore
/// let greeting = Arc::new(
///     NodeType::new("Greeting")
///         .observe(|_| Ok(Value::from(3)))
///         .describe(|ctx| Ok(Element::literal("hello").with_prop("value", ctx.data.cloned()))),
/// );
/// ```
pub struct NodeType {
    id: u64,
    name: String,
    observe: Capability<ObserveFn>,
    describe: Capability<DescribeFn>,
    visit: Capability<VisitFn>,
}

impl NodeType {
    /// Creates a node type with no capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_NODE_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            observe: Capability::Absent,
            describe: Capability::Absent,
            visit: Capability::Absent,
        }
    }

    /// Sets the `observe` capability.
    pub fn observe<F>(mut self, f: F) -> Self
    where
        F: Fn(&ObserveContext<'_>) -> Result<Value, NodeFault> + Send + Sync + 'static,
    {
        self.observe = Capability::Present(Arc::new(f));
        self
    }

    /// Sets the `describe` capability.
    pub fn describe<F>(mut self, f: F) -> Self
    where
        F: Fn(&DescribeContext<'_>) -> Result<Element, NodeFault> + Send + Sync + 'static,
    {
        self.describe = Capability::Present(Arc::new(f));
        self
    }

    /// Sets the `visit` capability.
    pub fn visit<F>(mut self, f: F) -> Self
    where
        F: Fn(
                &ParseOption,
                &VisitContext<'_>,
                &Traverser<'_>,
            ) -> Result<Vec<ParseOption>, NodeFault>
            + Send
            + Sync
            + 'static,
    {
        self.visit = Capability::Present(Arc::new(f));
        self
    }

    /// Process-unique id of this node type.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The node type's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `observe` slot.
    pub fn observer(&self) -> &Capability<ObserveFn> {
        &self.observe
    }

    /// The `describe` slot.
    pub fn describer(&self) -> &Capability<DescribeFn> {
        &self.describe
    }

    /// The `visit` slot.
    pub fn visitor(&self) -> &Capability<VisitFn> {
        &self.visit
    }

    /// Returns `true` if the named capability is implemented.
    pub fn has(&self, capability: CapabilityName) -> bool {
        match capability {
            CapabilityName::Observe => self.observe.is_present(),
            CapabilityName::Describe => self.describe.is_present(),
            CapabilityName::Visit => self.visit.is_present(),
        }
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("observe", &self.observe.is_present())
            .field("describe", &self.describe.is_present())
            .field("visit", &self.visit.is_present())
            .finish()
    }
}
