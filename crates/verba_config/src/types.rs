//! Configuration types deserialized from `verba.toml`.

use serde::Deserialize;

/// Default recursion limit for nested describe expansion.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default iteration bound for `repeat` nodes without an explicit `max`.
pub const DEFAULT_MAX_REPEAT: usize = 32;

/// The top-level engine configuration parsed from `verba.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Settings for the observe/describe expansion pass.
    #[serde(default)]
    pub expansion: ExpansionConfig,
    /// Settings for the memo cache shared across compiles.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Settings for per-parse traversal.
    #[serde(default)]
    pub traversal: TraversalConfig,
}

/// Expansion settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpansionConfig {
    /// Maximum nesting of describe outputs and structural children before the
    /// expansion is aborted.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Memo cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// When `false`, every compile recomputes every observation and expansion.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// When `true`, entries not reached by a compile are dropped after it.
    #[serde(default = "default_true")]
    pub sweep: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep: true,
        }
    }
}

/// Traversal settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraversalConfig {
    /// Iteration bound for `repeat` nodes that carry no `max` prop.
    #[serde(default = "default_max_repeat")]
    pub max_repeat: usize,
    /// Maximum number of options returned by a parse call; `0` means unlimited.
    #[serde(default)]
    pub max_options: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_repeat: DEFAULT_MAX_REPEAT,
            max_options: 0,
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_repeat() -> usize {
    DEFAULT_MAX_REPEAT
}

fn default_true() -> bool {
    true
}
