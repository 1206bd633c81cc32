//! Plugin and stage abstractions (§4.8, §9's "polymorphism over plugin
//! kinds" note): a plugin is a value with a category tag and a
//! `configure(options) -> stage` behavior, not an inheritance tree. The
//! four categories carry no common state beyond name and argument.

use std::collections::HashMap;

use crate::error::Result;
use crate::pool::ResourcePool;

/// Which of the four ordered groups a plugin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Drop entries matching predicates.
    Filter,
    /// Rewrite entry bytes.
    Transformer,
    /// Replace entry bytes with a compressed representation.
    Compressor,
    /// Reorder entries for spatial locality.
    Sorter,
}

/// A configured, ready-to-run pipeline step. Deterministic given the same
/// input pool and configuration (§4.8's stage contract).
pub trait Stage: Send + Sync {
    /// Consume the immutable input pool, producing a fresh output pool.
    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool>;
}

/// A stage that leaves the pool unchanged, used when a plugin's `argument`
/// resolves to `off` (§4.8: "off disables the stage entirely").
pub struct NoopStage;

impl Stage for NoopStage {
    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        Ok(input.iter().cloned().collect())
    }
}

/// A registered plugin: a name, its category, and a way to turn raw
/// configuration into a [`Stage`].
pub trait Plugin: Send + Sync {
    /// Registry key, matched against `resources.<category>[.N] = <name>`.
    fn name(&self) -> &'static str;

    /// Additional registry keys this plugin answers to, alongside `name()`
    /// (§4.8 names some plugins with more than one accepted key, e.g.
    /// `zip` / `default-compress`). Empty for plugins with a single name.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Category this plugin always runs under.
    fn category(&self) -> Category;

    /// Whether this plugin has a tri-state `on|off` argument. Plugins
    /// without one (none in the default set) are always enabled.
    fn has_on_off_argument(&self) -> bool {
        true
    }

    /// Build a stage from `enabled` (resolved from the `argument` option,
    /// defaulting to `false`, i.e. "off") and the plugin's own options.
    fn configure(&self, enabled: bool, options: &HashMap<String, String>) -> Result<Box<dyn Stage>>;
}
