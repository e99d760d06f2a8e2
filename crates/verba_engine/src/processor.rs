//! Registration callback and external source processors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::NodeFault;
use crate::memo::{CacheStats, MemoStore};
use crate::node_type::NodeType;
use crate::value::Value;

/// Turns an observed raw value into a node's data.
pub type RegisterFn = Arc<dyn Fn(&Value) -> Result<Value, NodeFault> + Send + Sync>;

/// Resolves data outside the observe pipeline.
pub type SourceFn = Arc<dyn Fn(&Value) -> Result<Value, NodeFault> + Send + Sync>;

/// The strategies a compile uses to turn observations into data.
///
/// For an element whose node type is registered with [`with_source_for`], the
/// type's source processor receives the element (as [`Value::Element`]) and
/// its return value is the data; `observe` and registration are not
/// consulted. For every other element that implements `observe`:
///
/// 1. `raw = observe(props, children)`
/// 2. `raw = source(raw)` if a fallback source was set with [`with_source`]
/// 3. `data = register(raw)` if a registration callback is configured,
///    otherwise `data = raw`
///
/// Both callbacks are assumed pure: the memo cache only re-runs them when the
/// observed node's inputs change.
///
/// The processor also owns that memo cache. Clones share it, so compiling
/// an unchanged tree again with a clone of the same processor reuses every
/// observation and expansion.
///
/// [`with_source_for`]: Processor::with_source_for
/// [`with_source`]: Processor::with_source
#[derive(Clone, Default)]
pub struct Processor {
    register: Option<RegisterFn>,
    fallback_source: Option<SourceFn>,
    /// Keyed by [`NodeType::id`]; the name is kept for diagnostics.
    sources: HashMap<u64, (String, SourceFn)>,
    cache: Arc<Mutex<MemoStore>>,
}

impl Processor {
    /// Creates a processor with the given registration callback.
    pub fn new<F>(register: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, NodeFault> + Send + Sync + 'static,
    {
        Self {
            register: Some(Arc::new(register)),
            ..Self::default()
        }
    }

    /// Creates a processor without registration: data is the raw observed value.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Sets the source processor applied to every observed raw value before
    /// registration.
    pub fn with_source<F>(mut self, source: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, NodeFault> + Send + Sync + 'static,
    {
        self.fallback_source = Some(Arc::new(source));
        self
    }

    /// Marks the node type `ty` as an external source resolved by `source`.
    ///
    /// Only that node type is affected; another type with the same name is
    /// observed as usual.
    pub fn with_source_for<F>(mut self, ty: &NodeType, source: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, NodeFault> + Send + Sync + 'static,
    {
        self.sources
            .insert(ty.id(), (ty.name().to_string(), Arc::new(source)));
        self
    }

    /// Returns the external source processor for `ty`, if registered.
    pub fn source_for(&self, ty: &NodeType) -> Option<&SourceFn> {
        self.sources.get(&ty.id()).map(|(_, source)| source)
    }

    /// Returns the fallback source processor, if set.
    pub fn fallback_source(&self) -> Option<&SourceFn> {
        self.fallback_source.as_ref()
    }

    /// Returns `true` if a registration callback is configured.
    pub fn has_register(&self) -> bool {
        self.register.is_some()
    }

    /// Applies the registration callback, or passes `raw` through.
    pub fn register(&self, raw: &Value) -> Result<Value, NodeFault> {
        match &self.register {
            Some(register) => register(raw),
            None => Ok(raw.clone()),
        }
    }

    /// Counters and sizes of the memo cache shared by this processor's clones.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Forgets every memoized observation and expansion.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub(crate) fn cache(&self) -> &Mutex<MemoStore> {
        &self.cache
    }

    /// Moves the memo store out so a compile can run its callbacks without
    /// holding the lock. Pair with [`restore_cache`](Self::restore_cache).
    pub(crate) fn take_cache(&self) -> MemoStore {
        std::mem::take(&mut *self.cache.lock())
    }

    pub(crate) fn restore_cache(&self, store: MemoStore) {
        *self.cache.lock() = store;
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self
            .sources
            .values()
            .map(|(name, _)| name.as_str())
            .collect();
        kinds.sort_unstable();
        f.debug_struct("Processor")
            .field("register", &self.register.is_some())
            .field("fallback_source", &self.fallback_source.is_some())
            .field("sources", &kinds)
            .finish()
    }
}
