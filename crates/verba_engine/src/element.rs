//! Immutable element trees: the declarative grammar description.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use verba_common::{ContentHash, FingerprintBuilder};

use crate::fingerprint::Canonical;

use crate::node_type::NodeType;
use crate::value::Value;

/// Property mapping of an element. Keys are unique and ordered.
pub type Props = BTreeMap<String, Value>;

/// The built-in structural vocabulary understood by default traversal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Primitive {
    /// Matches the `text` prop against the input.
    Literal,
    /// Matches every child, in order.
    Sequence,
    /// Matches any one child.
    Choice,
    /// Matches its child or nothing.
    Optional,
    /// Matches its child one or more times.
    Repeat,
}

impl Primitive {
    /// The name used for this primitive in messages and serialized trees.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Literal => "literal",
            Primitive::Sequence => "sequence",
            Primitive::Choice => "choice",
            Primitive::Optional => "optional",
            Primitive::Repeat => "repeat",
        }
    }

    /// Stable discriminant written into fingerprints.
    pub(crate) fn tag(self) -> u8 {
        match self {
            Primitive::Literal => 1,
            Primitive::Sequence => 2,
            Primitive::Choice => 3,
            Primitive::Optional => 4,
            Primitive::Repeat => 5,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The type of an element: a built-in primitive or a caller-defined node type.
#[derive(Clone, Debug)]
pub enum Kind {
    /// A built-in structural primitive.
    Primitive(Primitive),
    /// A caller-defined node type.
    Custom(Arc<NodeType>),
}

impl Kind {
    /// The kind's name.
    pub fn name(&self) -> &str {
        match self {
            Kind::Primitive(p) => p.name(),
            Kind::Custom(ty) => ty.name(),
        }
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Kind::Primitive(a), Kind::Primitive(b)) => a == b,
            (Kind::Custom(a), Kind::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Primitive> for Kind {
    fn from(p: Primitive) -> Self {
        Kind::Primitive(p)
    }
}

impl From<Arc<NodeType>> for Kind {
    fn from(ty: Arc<NodeType>) -> Self {
        Kind::Custom(ty)
    }
}

impl From<&Arc<NodeType>> for Kind {
    fn from(ty: &Arc<NodeType>) -> Self {
        Kind::Custom(Arc::clone(ty))
    }
}

#[derive(Clone, Debug)]
struct ElementData {
    kind: Kind,
    props: Props,
    children: Vec<Element>,
    /// Canonical hash of the three fields above. Children contribute their
    /// own stored hash, so sealing a node never walks its subtree.
    hash: ContentHash,
}

impl ElementData {
    fn sealed(kind: Kind, props: Props, children: Vec<Element>) -> Self {
        let hash = Self::compute_hash(&kind, &props, &children);
        Self {
            kind,
            props,
            children,
            hash,
        }
    }

    fn reseal(&mut self) {
        self.hash = Self::compute_hash(&self.kind, &self.props, &self.children);
    }

    fn compute_hash(kind: &Kind, props: &Props, children: &[Element]) -> ContentHash {
        let mut fp = FingerprintBuilder::new();
        kind.write_canonical(&mut fp);
        props.write_canonical(&mut fp);
        fp.len(children.len());
        for child in children {
            fp.hash(child.content_hash());
        }
        fp.finish()
    }
}

impl PartialEq for ElementData {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.kind == other.kind
            && self.props == other.props
            && self.children == other.children
    }
}

/// An immutable grammar node: a kind, its props, and ordered children.
///
/// Cloning is cheap (the node is shared). The builder methods
/// ([`with_prop`](Self::with_prop), [`with_child`](Self::with_child)) copy the
/// node only when it is shared, so trees can be assembled fluently.
#[derive(Clone)]
pub struct Element(Arc<ElementData>);

impl Element {
    /// Creates an element from its parts.
    pub fn new(kind: impl Into<Kind>, props: Props, children: Vec<Element>) -> Self {
        Self(Arc::new(ElementData::sealed(kind.into(), props, children)))
    }

    /// Creates an element of a caller-defined node type with no props.
    pub fn of(ty: &Arc<NodeType>) -> Self {
        Self::new(ty, Props::new(), Vec::new())
    }

    /// Creates a `literal` matching `text`.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(Primitive::Literal, Props::new(), Vec::new()).with_prop("text", text.into())
    }

    /// Creates a `sequence` of `children`.
    pub fn sequence(children: Vec<Element>) -> Self {
        Self::new(Primitive::Sequence, Props::new(), children)
    }

    /// Creates a `choice` among `children`.
    pub fn choice(children: Vec<Element>) -> Self {
        Self::new(Primitive::Choice, Props::new(), children)
    }

    /// Creates an `optional` wrapping `child`.
    pub fn optional(child: Element) -> Self {
        Self::new(Primitive::Optional, Props::new(), vec![child])
    }

    /// Creates a `repeat` of `child`.
    pub fn repeat(child: Element) -> Self {
        Self::new(Primitive::Repeat, Props::new(), vec![child])
    }

    /// Returns this element with `key` set to `value`.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let data = Arc::make_mut(&mut self.0);
        data.props.insert(key.into(), value.into());
        data.reseal();
        self
    }

    /// Returns this element with `child` appended.
    pub fn with_child(mut self, child: Element) -> Self {
        let data = Arc::make_mut(&mut self.0);
        data.children.push(child);
        data.reseal();
        self
    }

    /// Canonical hash of the whole subtree, computed when the node was built.
    ///
    /// Structurally equal trees have equal hashes regardless of how they
    /// were assembled.
    pub fn content_hash(&self) -> ContentHash {
        self.0.hash
    }

    /// The element's kind.
    pub fn kind(&self) -> &Kind {
        &self.0.kind
    }

    /// The element's kind name.
    pub fn kind_name(&self) -> &str {
        self.0.kind.name()
    }

    /// The element's props.
    pub fn props(&self) -> &Props {
        &self.0.props
    }

    /// Looks up a single prop.
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.0.props.get(key)
    }

    /// The element's children.
    pub fn children(&self) -> &[Element] {
        &self.0.children
    }

    /// Returns the built-in primitive, if this is one.
    pub fn primitive(&self) -> Option<Primitive> {
        match &self.0.kind {
            Kind::Primitive(p) => Some(*p),
            Kind::Custom(_) => None,
        }
    }

    /// Returns `true` if both handles share the same node.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Element");
        s.field("kind", &self.kind_name());
        if !self.0.props.is_empty() {
            s.field("props", &self.0.props);
        }
        if !self.0.children.is_empty() {
            s.field("children", &self.0.children);
        }
        s.finish()
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Element", 3)?;
        s.serialize_field("kind", self.kind_name())?;
        s.serialize_field("props", &self.0.props)?;
        s.serialize_field("children", &self.0.children)?;
        s.end()
    }
}
