//! Traverse stage: turns an expanded tree and raw input into parse options.

use std::cell::Cell;
use std::sync::Arc;

use verba_config::EngineConfig;

use crate::element::{Element, Kind};
use crate::error::{CompileError, Stage};
use crate::expand::Expander;
use crate::expanded::Expanded;
use crate::node_type::{CapabilityName, VisitContext};
use crate::option::ParseOption;
use crate::primitives;
use crate::processor::Processor;

/// Walks expanded trees on behalf of a parse call.
///
/// A node type's `visit` receives the traverser so it can hand a substitute
/// tree back to default traversal and post-process what comes out.
pub struct Traverser<'a> {
    processor: &'a Processor,
    config: &'a EngineConfig,
    depth: Cell<usize>,
}

impl<'a> Traverser<'a> {
    pub(crate) fn new(processor: &'a Processor, config: &'a EngineConfig) -> Self {
        Self {
            processor,
            config,
            depth: Cell::new(0),
        }
    }

    /// The configuration of the compile that produced the tree.
    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Traverses an element that was not part of the compiled tree.
    ///
    /// Custom nodes inside `element` are observed and described the first
    /// time a structurally equal element comes through. The expansion is kept
    /// in the processor's memo cache, so later parses traverse it without
    /// re-running any callback.
    pub fn traverse(
        &self,
        element: &Element,
        option: &ParseOption,
    ) -> Result<Vec<ParseOption>, CompileError> {
        let expanded = self.expand_ad_hoc(element)?;
        self.traverse_expanded(&expanded, option)
    }

    fn expand_ad_hoc(&self, element: &Element) -> Result<Arc<Expanded>, CompileError> {
        if !self.config.cache.enabled {
            return Expander::transient(self.processor, self.config).expand_root(element);
        }

        // The lock is released before expanding, since describe callbacks
        // may compile or parse with the same processor.
        let cached = self.processor.cache().lock().ad_hoc(element);
        if let Some(expanded) = cached {
            tracing::trace!(kind = element.kind_name(), "traverse: reused ad hoc expansion");
            return Ok(expanded);
        }

        tracing::debug!(kind = element.kind_name(), "traverse: expanding ad hoc element");
        let expanded = Expander::transient(self.processor, self.config).expand_root(element)?;
        self.processor
            .cache()
            .lock()
            .store_ad_hoc(element.clone(), Arc::clone(&expanded));
        Ok(expanded)
    }

    /// Traverses an already expanded node.
    pub fn traverse_expanded(
        &self,
        node: &Expanded,
        option: &ParseOption,
    ) -> Result<Vec<ParseOption>, CompileError> {
        let limit = self.config.expansion.max_depth;
        let depth = self.depth.get();
        if depth > limit {
            return Err(CompileError::TraversalDepthExceeded {
                limit,
                kind: node.element().kind_name().to_string(),
            });
        }

        self.depth.set(depth + 1);
        let result = self.dispatch(node, option);
        self.depth.set(depth);
        result
    }

    fn dispatch(
        &self,
        node: &Expanded,
        option: &ParseOption,
    ) -> Result<Vec<ParseOption>, CompileError> {
        match node.element().kind() {
            Kind::Primitive(primitive) => primitives::traverse(*primitive, node, option, self),
            Kind::Custom(ty) => {
                if let Some(visit) = ty.visitor().get() {
                    tracing::trace!(kind = ty.name(), "traverse: visit");
                    let ctx = VisitContext {
                        data: node.data(),
                        props: node.element().props(),
                        node,
                    };
                    return visit(option, &ctx, self)
                        .map_err(|fault| fault.into_compile_error(ty.name(), Stage::Visit));
                }
                match node.described() {
                    Some(inner) => self.traverse_expanded(inner, option),
                    None => Err(CompileError::MissingCapability {
                        kind: ty.name().to_string(),
                        capability: CapabilityName::Describe,
                    }),
                }
            }
        }
    }
}
