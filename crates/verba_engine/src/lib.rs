//! Incremental compiler from element trees to natural-language parsers.
//!
//! A grammar is written as a tree of [`Element`]s. Built-in primitives
//! (`literal`, `sequence`, `choice`, `optional`, `repeat`) match text
//! directly; caller-defined [`NodeType`]s add three optional capabilities:
//!
//! - **observe** derives a data value from the node's props and children,
//!   which the [`Processor`] then registers;
//! - **describe** rewrites the node into another element tree, given that
//!   data;
//! - **visit** takes over traversal of the node at parse time.
//!
//! [`Compiler::compile`] runs observe and describe over the whole tree and
//! returns a [`Parser`]. The compiler memoizes both stages by tree position,
//! so recompiling an edited tree only re-runs callbacks for nodes whose
//! inputs changed. [`Parser::parse`] walks the expanded tree against an input
//! string and returns every [`ParseOption`] that consumed it exactly or
//! continues it as a suggested completion.

#![warn(missing_docs)]

mod compiler;
mod element;
mod error;
mod expand;
mod expanded;
pub mod fingerprint;
mod memo;
mod node_type;
mod observe;
mod option;
mod primitives;
mod processor;
mod traverse;
mod value;

pub use compiler::{compile, Compiler, Parser};
pub use element::{Element, Kind, Primitive, Props};
pub use error::{CompileError, NodeFault, Stage};
pub use expanded::{Body, Expanded};
pub use memo::CacheStats;
pub use node_type::{
    Capability, CapabilityName, DescribeContext, DescribeFn, NodeType, ObserveContext, ObserveFn,
    VisitContext, VisitFn,
};
pub use option::{ParseOption, Word};
pub use processor::{Processor, RegisterFn, SourceFn};
pub use traverse::Traverser;
pub use value::Value;

pub use verba_cache::{NodePath, TableStats};
pub use verba_config::EngineConfig;
