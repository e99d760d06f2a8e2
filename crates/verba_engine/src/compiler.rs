//! Compile entry points and the resulting parser.

use std::sync::Arc;

use verba_config::EngineConfig;

use crate::element::Element;
use crate::error::CompileError;
use crate::expand::Expander;
use crate::expanded::Expanded;
use crate::memo::{CacheStats, MemoStore};
use crate::option::ParseOption;
use crate::processor::Processor;
use crate::traverse::Traverser;

/// Compiles element trees into parsers under an explicit configuration.
///
/// Observations and describe expansions are memoized by tree position in the
/// processor's cache, which every clone of the processor shares. Compiling an
/// edited tree re-runs callbacks only where a node's inputs changed;
/// everything else is reused from the previous compile.
pub struct Compiler {
    processor: Arc<Processor>,
    config: Arc<EngineConfig>,
}

impl Compiler {
    /// Creates a compiler with the default configuration.
    pub fn new(processor: Processor) -> Self {
        Self::with_config(processor, EngineConfig::default())
    }

    /// Creates a compiler with an explicit configuration.
    pub fn with_config(processor: Processor, config: EngineConfig) -> Self {
        Self {
            processor: Arc::new(processor),
            config: Arc::new(config),
        }
    }

    /// The configuration this compiler runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The processor this compiler runs with.
    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Runs observe and describe over `root` and returns a parser for it.
    ///
    /// On error nothing is returned, but memo entries written before the
    /// failure stay valid and are reused by the next compile.
    pub fn compile(&mut self, root: &Element) -> Result<Parser, CompileError> {
        let mut memo = self.processor.take_cache();
        let result = self.compile_with(&mut memo, root);
        self.processor.restore_cache(memo);
        result
    }

    fn compile_with(&self, memo: &mut MemoStore, root: &Element) -> Result<Parser, CompileError> {
        let generation = memo.begin_generation();
        tracing::debug!(generation, root = root.kind_name(), "compile: start");

        let expanded = if self.config.cache.enabled {
            Expander::memoized(&self.processor, &self.config, memo).expand_root(root)?
        } else {
            Expander::transient(&self.processor, &self.config).expand_root(root)?
        };

        if self.config.cache.enabled && self.config.cache.sweep {
            let evicted = memo.sweep();
            if evicted > 0 {
                tracing::debug!(generation, evicted, "compile: swept unreached entries");
            }
        }

        let stats = memo.stats();
        tracing::debug!(
            generation,
            nodes = expanded.node_count(),
            observe_hits = stats.observe.hits,
            observe_misses = stats.observe.misses(),
            describe_hits = stats.describe.hits,
            describe_misses = stats.describe.misses(),
            "compile: done"
        );

        Ok(Parser {
            root: expanded,
            processor: Arc::clone(&self.processor),
            config: Arc::clone(&self.config),
        })
    }

    /// Counters and sizes of the memo cache.
    pub fn stats(&self) -> CacheStats {
        self.processor.cache_stats()
    }

    /// Forgets every memoized observation and expansion.
    pub fn clear_cache(&mut self) {
        self.processor.clear_cache();
    }
}

/// Compiles `root` with the default configuration.
///
/// The memo cache lives in `processor`: passing clones of one processor to
/// successive calls makes each compile reuse the work of the last.
pub fn compile(root: &Element, processor: Processor) -> Result<Parser, CompileError> {
    Compiler::new(processor).compile(root)
}

/// A compiled tree, ready to parse input.
///
/// Parsers are cheap to clone and independent of the compiler that made
/// them; recompiling does not affect an existing parser.
#[derive(Clone)]
pub struct Parser {
    root: Arc<Expanded>,
    processor: Arc<Processor>,
    config: Arc<EngineConfig>,
}

impl Parser {
    /// Returns every interpretation of `input`.
    ///
    /// An option is reported when it consumed the input exactly, or when it
    /// ran out of input and continues as a suggested completion. Options are
    /// in discovery order.
    pub fn parse(&self, input: &str) -> Result<Vec<ParseOption>, CompileError> {
        let traverser = Traverser::new(&self.processor, &self.config);
        let mut options: Vec<ParseOption> = traverser
            .traverse_expanded(&self.root, &ParseOption::new(input))?
            .into_iter()
            .filter(ParseOption::is_accepted)
            .collect();

        let limit = self.config.traversal.max_options;
        if limit > 0 {
            options.truncate(limit);
        }
        tracing::trace!(input, options = options.len(), "parse");
        Ok(options)
    }

    /// The expanded tree this parser walks.
    pub fn expansion(&self) -> &Arc<Expanded> {
        &self.root
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("nodes", &self.root.node_count())
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}
