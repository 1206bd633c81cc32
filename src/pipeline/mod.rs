//! Plugin pipeline (§4.8): runs the four ordered stage categories
//! (filter, transformer, compressor, sorter) over a [`ResourcePool`],
//! driven by a [`PipelineConfig`].

pub mod config;
pub mod plugins;
pub mod stage;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{LinkError, Result};
use crate::pool::ResourcePool;
use config::PipelineConfig;
use stage::{Category, Plugin, Stage};

/// Registry mapping a plugin's name to the plugin itself. Built once per
/// invocation and shared across partitions (§4.8, §5: plugins carry no
/// per-run state of their own, only the options handed to `configure`).
pub struct PluginRegistry {
    plugins: HashMap<&'static str, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        PluginRegistry { plugins: HashMap::new() }
    }

    /// Register a plugin under its own name and every alias it declares,
    /// overwriting any previous registration under the same key.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.insert(plugin.name(), plugin.clone());
        for alias in plugin.aliases() {
            self.plugins.insert(alias, plugin.clone());
        }
    }

    fn lookup(&self, name: &str) -> Result<&Arc<dyn Plugin>> {
        self.plugins.get(name).ok_or_else(|| LinkError::PluginConfig(format!("unknown plugin '{name}'")))
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        PluginRegistry::new()
    }
}

/// The six default plugins named in §4.8's table, pre-registered under
/// their canonical names.
pub fn default_registry(
    classfile_editor: Arc<dyn plugins::strip_debug::ClassfileEditor>,
    cp_compactor: Arc<dyn plugins::compact_cp::ConstantPoolCompactor>,
) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(plugins::ExcludeResourcesPlugin));
    registry.register(Arc::new(plugins::ExcludeFilesPlugin));
    registry.register(Arc::new(plugins::StripJavaDebugPlugin::new(classfile_editor)));
    registry.register(Arc::new(plugins::CompactCpPlugin::new(cp_compactor)));
    registry.register(Arc::new(plugins::SortResourcesPlugin));
    registry.register(Arc::new(plugins::DefaultCompressPlugin));
    registry
}

fn build_stages(registry: &PluginRegistry, config: &PipelineConfig, category: Category) -> Result<Vec<Box<dyn Stage>>> {
    config
        .stages_in(category)
        .into_iter()
        .map(|spec| {
            let plugin = registry.lookup(&spec.plugin_name)?;
            let enabled = !plugin.has_on_off_argument() || config.is_enabled(&spec.plugin_name);
            plugin.configure(enabled, &config.options_for(&spec.plugin_name))
        })
        .collect()
}

fn run_stages(stages: &[Box<dyn Stage>], mut pool: ResourcePool) -> Result<ResourcePool> {
    for stage in stages {
        pool = stage.apply(&pool)?;
    }
    Ok(pool)
}

/// Byte length of every entry's content immediately after the transformer
/// stages complete, keyed by `(module, path)`. The compressor stages that
/// follow replace `bytes` in place, so this is the only point at which the
/// pre-compression length is still recoverable for the image writer's
/// `uncompressed_size` field (§4.3, §4.9).
pub struct PipelineOutput {
    /// The pool after all four stage categories have run.
    pub pool: ResourcePool,
    /// Pre-compression byte length per entry, as it stood right after the
    /// transformer stages and before any compressor ran.
    pub uncompressed_sizes: HashMap<(String, String), u64>,
}

/// A plugin pipeline configured for one run: an ordered list of stages per
/// category, built once from a [`PipelineConfig`] and reused across every
/// partition the image builder processes (§4.9).
pub struct Pipeline {
    filters: Vec<Box<dyn Stage>>,
    transformers: Vec<Box<dyn Stage>>,
    compressors: Vec<Box<dyn Stage>>,
    sorters: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Resolve `config` against `registry`, building every stage up front
    /// so a configuration error (unknown plugin, bad option) surfaces
    /// before any partition is processed.
    pub fn build(registry: &PluginRegistry, config: &PipelineConfig) -> Result<Self> {
        Ok(Pipeline {
            filters: build_stages(registry, config, Category::Filter)?,
            transformers: build_stages(registry, config, Category::Transformer)?,
            compressors: build_stages(registry, config, Category::Compressor)?,
            sorters: build_stages(registry, config, Category::Sorter)?,
        })
    }

    /// Run the four stage groups in order: filter, transform, compress,
    /// sort. Captures each surviving entry's size right after the
    /// transformer group, before compression can shrink it.
    pub fn run(&self, input: ResourcePool) -> Result<PipelineOutput> {
        let filtered = run_stages(&self.filters, input)?;
        let transformed = run_stages(&self.transformers, filtered)?;

        let uncompressed_sizes = transformed
            .iter()
            .map(|e| ((e.module.clone(), e.path.clone()), e.bytes.len() as u64))
            .collect();

        let compressed = run_stages(&self.compressors, transformed)?;
        let sorted = run_stages(&self.sorters, compressed)?;

        Ok(PipelineOutput { pool: sorted, uncompressed_sizes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceEntry;
    use plugins::compact_cp::ConstantPoolCompactor;
    use plugins::strip_debug::ClassfileEditor;

    struct IdentityEditor;
    impl ClassfileEditor for IdentityEditor {
        fn strip_attributes(&self, class_bytes: &[u8], _names: &[&str]) -> Result<Vec<u8>> {
            Ok(class_bytes.to_vec())
        }
    }

    struct IdentityCompactor;
    impl ConstantPoolCompactor for IdentityCompactor {
        fn compact(&self, classes: &[(String, Vec<u8>)]) -> Result<(Vec<Vec<u8>>, Vec<u8>)> {
            Ok((classes.iter().map(|(_, b)| b.clone()).collect(), Vec::new()))
        }
    }

    fn test_registry() -> PluginRegistry {
        default_registry(Arc::new(IdentityEditor), Arc::new(IdentityCompactor))
    }

    #[test]
    fn runs_filter_then_compress_and_tracks_pre_compression_size() {
        let text = "
            resources.filter = exclude-resources
            exclude-resources.argument = on
            exclude-resources.exclude = *.jcov
            resources.compressor = default-compress
            default-compress.argument = on
        ";
        let config = config::parse(text).unwrap();
        let pipeline = Pipeline::build(&test_registry(), &config).unwrap();

        let mut pool = ResourcePool::new();
        pool.add(ResourceEntry::meta_inf("a", "a.jcov", vec![1])).unwrap();
        let big = vec![b'x'; 2048];
        pool.add(ResourceEntry::class_resource("a", "pkg/Big.class", big.clone())).unwrap();

        let output = pipeline.run(pool).unwrap();
        assert_eq!(output.pool.len(), 1);
        let key = ("a".to_string(), "/a/pkg/Big.class".to_string());
        assert_eq!(output.uncompressed_sizes[&key], big.len() as u64);

        let entry = output.pool.get("a", "/a/pkg/Big.class").unwrap();
        assert!(entry.bytes.len() < big.len());
    }

    #[test]
    fn compressor_config_accepts_the_zip_alias_as_well_as_its_canonical_name() {
        let config = config::parse("resources.compressor = zip\nzip.argument = on\n").unwrap();
        let pipeline = Pipeline::build(&test_registry(), &config).unwrap();

        let mut pool = ResourcePool::new();
        let big = vec![b'x'; 2048];
        pool.add(ResourceEntry::class_resource("a", "pkg/Big.class", big.clone())).unwrap();

        let output = pipeline.run(pool).unwrap();
        let entry = output.pool.get("a", "/a/pkg/Big.class").unwrap();
        assert!(entry.bytes.len() < big.len());
    }

    #[test]
    fn unknown_plugin_name_is_a_config_error() {
        let config = config::parse("resources.filter = does-not-exist\n").unwrap();
        let err = Pipeline::build(&test_registry(), &config).unwrap_err();
        assert!(matches!(err, LinkError::PluginConfig(_)));
    }
}
