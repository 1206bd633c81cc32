//! Flat `key=value` configuration parser (§6), shared by the plugin
//! pipeline and the linker-level `--config` file (SPEC_FULL §9).

use std::collections::HashMap;

use crate::error::{LinkError, Result};
use crate::pipeline::stage::Category;

/// One `resources.<category>[.N] = <plugin_name>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// Category this declaration belongs to.
    pub category: Category,
    /// Numeric suffix (`.0`, `.1`, …); `0` if absent.
    pub order: u32,
    /// Registry key of the plugin to run at this slot.
    pub plugin_name: String,
}

/// A parsed configuration: ordered stage declarations plus per-plugin
/// option maps (including the `argument` tri-state key, if present).
///
/// Reused verbatim for the linker-level `--config` file (a flat
/// `module-path=...`/`output=...`/`endian=...` key set with no dots):
/// any key without a `resources.*` prefix or a `.` separator lands in
/// `global` instead of erroring, so one parser serves both syntaxes.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Stage declarations in the order they were parsed (each category is
    /// later sorted by `order`, ties broken by this declaration order).
    pub stages: Vec<StageSpec>,
    /// `plugin_name -> { option_key -> value }`.
    pub plugin_options: HashMap<String, HashMap<String, String>>,
    /// Top-level `key = value` assignments with no `.` separator, used by
    /// the linker-level config file.
    pub global: HashMap<String, String>,
}

impl PipelineConfig {
    /// Options for `plugin_name`, or an empty map if none were set.
    pub fn options_for(&self, plugin_name: &str) -> HashMap<String, String> {
        self.plugin_options.get(plugin_name).cloned().unwrap_or_default()
    }

    /// Whether `plugin_name`'s `argument` resolves to `on`. Defaults to
    /// `false` when the argument is absent (§4.8).
    pub fn is_enabled(&self, plugin_name: &str) -> bool {
        self.plugin_options
            .get(plugin_name)
            .and_then(|opts| opts.get("argument"))
            .map(|v| v.eq_ignore_ascii_case("on"))
            .unwrap_or(false)
    }

    /// Stage declarations for one category, ordered by numeric suffix
    /// (ties broken by declaration order, which the stable sort below
    /// preserves).
    pub fn stages_in(&self, category: Category) -> Vec<&StageSpec> {
        let mut matching: Vec<&StageSpec> = self.stages.iter().filter(|s| s.category == category).collect();
        matching.sort_by_key(|s| s.order);
        matching
    }
}

fn parse_stage_key(key: &str) -> Option<(Category, u32)> {
    let rest = key.strip_prefix("resources.")?;
    let (cat_str, order) = match rest.split_once('.') {
        Some((c, suffix)) => (c, suffix.parse::<u32>().ok()?),
        None => (rest, 0),
    };
    let category = match cat_str {
        "filter" => Category::Filter,
        "transformer" => Category::Transformer,
        "compressor" => Category::Compressor,
        "sorter" => Category::Sorter,
        _ => return None,
    };
    Some((category, order))
}

/// Parse the flat `key=value` text format: one assignment per line, `#`
/// starts a comment, blank lines ignored.
pub fn parse(text: &str) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(LinkError::PluginConfig(format!("line {}: missing '='", lineno + 1)));
        };
        let key = key.trim();
        let value = value.trim().to_string();

        if let Some((category, order)) = parse_stage_key(key) {
            config.stages.push(StageSpec { category, order, plugin_name: value });
            continue;
        }

        match key.split_once('.') {
            Some((plugin_name, option)) => {
                config.plugin_options.entry(plugin_name.to_string()).or_default().insert(option.to_string(), value);
            }
            None => {
                config.global.insert(key.to_string(), value);
            }
        }
    }

    Ok(config)
}
