//! Observe stage: derives a node's data from its props and children.

use verba_cache::{Lookup, NodePath};

use crate::element::Element;
use crate::error::{CompileError, Stage};
use crate::expand::Expander;
use crate::memo::ObserveInputs;
use crate::node_type::{NodeType, ObserveContext};
use crate::value::Value;

impl Expander<'_> {
    /// Returns the data for a custom node at `path`.
    ///
    /// Nodes of an external-source type get their data from the type's source
    /// processor. Other nodes with `observe` run observe, the fallback source
    /// and registration in turn. Nodes with neither have no data. The result
    /// is memoized by the node's kind, props and children, so an unchanged
    /// node never re-runs its callbacks.
    pub(crate) fn derive_data(
        &mut self,
        element: &Element,
        ty: &NodeType,
        path: &NodePath,
    ) -> Result<Option<Value>, CompileError> {
        let external = self.processor.source_for(ty).is_some();
        if !external && !ty.observer().is_present() {
            return Ok(None);
        }

        let inputs = ObserveInputs::of(element);
        let fingerprint = inputs.fingerprint();
        if let Some(memo) = self.memo.as_deref_mut() {
            if let Lookup::Hit(data) = memo.observations.lookup(path, fingerprint, &inputs)? {
                tracing::trace!(path = %path, kind = ty.name(), "observe: memo hit");
                return Ok(data);
            }
        }

        tracing::debug!(path = %path, kind = ty.name(), external, "observe: computing data");
        let data = self.compute_data(element, ty)?;

        if let Some(memo) = self.memo.as_deref_mut() {
            memo.observations
                .store(path.clone(), fingerprint, inputs, Some(data.clone()))?;
        }
        Ok(Some(data))
    }

    fn compute_data(&self, element: &Element, ty: &NodeType) -> Result<Value, CompileError> {
        let kind = ty.name();

        if let Some(source) = self.processor.source_for(ty) {
            return source(&Value::Element(element.clone()))
                .map_err(|fault| fault.into_compile_error(kind, Stage::Source));
        }

        let Some(observe) = ty.observer().get() else {
            return Ok(Value::Null);
        };
        let ctx = ObserveContext {
            props: element.props(),
            children: element.children(),
        };
        let mut raw =
            observe(&ctx).map_err(|fault| fault.into_compile_error(kind, Stage::Observe))?;

        if let Some(source) = self.processor.fallback_source() {
            raw = source(&raw).map_err(|fault| fault.into_compile_error(kind, Stage::Source))?;
        }

        self.processor
            .register(&raw)
            .map_err(|fault| fault.into_compile_error(kind, Stage::Register))
    }
}
