//! Describe stage: expands custom nodes into structural trees.
//!
//! Expansion is a recursive rewrite. A custom node with `describe` is
//! replaced by the expansion of whatever `describe` returns, which may itself
//! contain custom nodes. Every node is memoized at its tree position, so a
//! node whose inputs are unchanged since the last compile is reused whole,
//! and a re-described parent still reuses any child whose own inputs held
//! steady.

use std::sync::Arc;

use verba_cache::{Lookup, NodePath};
use verba_config::EngineConfig;

use crate::element::{Element, Kind};
use crate::error::{CompileError, Stage};
use crate::expanded::Expanded;
use crate::memo::{DescribeInputs, MemoStore};
use crate::node_type::{DescribeContext, NodeType};
use crate::processor::Processor;

/// Runs observe and describe over an element tree.
pub(crate) struct Expander<'a> {
    pub(crate) processor: &'a Processor,
    pub(crate) config: &'a EngineConfig,
    pub(crate) memo: Option<&'a mut MemoStore>,
}

impl<'a> Expander<'a> {
    /// An expander that reads and writes `memo`.
    pub(crate) fn memoized(
        processor: &'a Processor,
        config: &'a EngineConfig,
        memo: &'a mut MemoStore,
    ) -> Self {
        Self {
            processor,
            config,
            memo: Some(memo),
        }
    }

    /// An expander that recomputes everything and remembers nothing.
    pub(crate) fn transient(processor: &'a Processor, config: &'a EngineConfig) -> Self {
        Self {
            processor,
            config,
            memo: None,
        }
    }

    /// Expands `root` and everything below it.
    pub(crate) fn expand_root(&mut self, root: &Element) -> Result<Arc<Expanded>, CompileError> {
        self.expand(root, NodePath::root())
    }

    fn expand(&mut self, element: &Element, path: NodePath) -> Result<Arc<Expanded>, CompileError> {
        let limit = self.config.expansion.max_depth;
        if path.depth() > limit {
            return Err(CompileError::DepthExceeded { limit, path });
        }

        match element.kind() {
            Kind::Primitive(_) => {
                let children = self.expand_children(element, &path)?;
                Ok(Arc::new(Expanded::structural(element.clone(), None, children)))
            }
            Kind::Custom(ty) => self.expand_custom(element, ty, path),
        }
    }

    fn expand_children(
        &mut self,
        element: &Element,
        path: &NodePath,
    ) -> Result<Vec<Arc<Expanded>>, CompileError> {
        element
            .children()
            .iter()
            .enumerate()
            .map(|(i, child)| self.expand(child, path.child(i)))
            .collect()
    }

    fn expand_custom(
        &mut self,
        element: &Element,
        ty: &NodeType,
        path: NodePath,
    ) -> Result<Arc<Expanded>, CompileError> {
        let data = self.derive_data(element, ty, &path)?;

        let Some(describe) = ty.describer().get() else {
            // Nothing to describe: the node stays as written and its children
            // are expanded in place.
            let children = self.expand_children(element, &path)?;
            return Ok(Arc::new(Expanded::structural(element.clone(), data, children)));
        };

        let inputs = DescribeInputs::of(element, data);
        let fingerprint = inputs.fingerprint();
        if let Some(memo) = self.memo.as_deref_mut() {
            if let Lookup::Hit(expanded) = memo.expansions.lookup(&path, fingerprint, &inputs)? {
                tracing::trace!(path = %path, kind = ty.name(), "describe: memo hit");
                memo.keep_subtree(&path.expansion());
                return Ok(expanded);
            }
        }

        tracing::debug!(
            path = %path,
            kind = ty.name(),
            fingerprint = %fingerprint,
            "describe: expanding"
        );
        let ctx = DescribeContext {
            data: inputs.data.as_ref(),
            props: element.props(),
            children: element.children(),
        };
        let output =
            describe(&ctx).map_err(|fault| fault.into_compile_error(ty.name(), Stage::Describe))?;
        let body = self.expand(&output, path.expansion())?;
        let expanded = Arc::new(Expanded::from_description(
            element.clone(),
            inputs.data.clone(),
            body,
        ));

        if let Some(memo) = self.memo.as_deref_mut() {
            memo.expansions
                .store(path, fingerprint, inputs, Arc::clone(&expanded))?;
        }
        Ok(expanded)
    }
}
