//! Image builder (§4.9): the top-level driver wiring finder → resolver →
//! resource pool → plugin pipeline → image writer, and laying out the
//! on-disk tree described in §6.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use rayon::prelude::*;

use crate::error::{LinkError, Result};
use crate::finder::{ArtifactOpener, ModuleFinder};
use crate::image::{Endian, ImageWriter};
use crate::layout::ImageLayout;
use crate::model::{ModuleArtifact, ResourceEntry, ResourceKind};
use crate::pipeline::plugins::compress::COMPRESSOR_ID_DEFLATE;
use crate::pipeline::Pipeline;
use crate::pool::ResourcePool;
use crate::resolver::{self, ResolvedGraph};

/// One of the three class-loading scopes a module can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loader {
    /// The platform/bootstrap loader.
    Boot,
    /// The extension/platform-extensions loader.
    Ext,
    /// The application loader; the default for unmatched modules.
    App,
}

impl Loader {
    /// Name used for the image file and the synthetic module-info path.
    pub fn name(self) -> &'static str {
        match self {
            Loader::Boot => "boot",
            Loader::Ext => "ext",
            Loader::App => "app",
        }
    }

    /// Fixed emission order (§4.9 step 3).
    pub const ORDER: [Loader; 3] = [Loader::Boot, Loader::Ext, Loader::App];
}

/// Assigns modules to loader partitions by name. §9 leaves the real table
/// unspecified by the source this was distilled from; this crate takes it
/// as configuration input rather than hardcoding module names.
#[derive(Debug, Clone, Default)]
pub struct LoaderTable {
    assignments: HashMap<String, Loader>,
}

impl LoaderTable {
    /// An empty table: every module defaults to `app`.
    pub fn new() -> Self {
        LoaderTable::default()
    }

    /// Assign `module` to `loader`.
    pub fn assign(mut self, module: impl Into<String>, loader: Loader) -> Self {
        self.assignments.insert(module.into(), loader);
        self
    }

    /// Unmatched modules default to `app` (§4.9 step 2).
    pub fn loader_for(&self, module_name: &str) -> Loader {
        self.assignments.get(module_name).copied().unwrap_or(Loader::App)
    }
}

/// A synthetic per-loader summary written at
/// `/<loader>/module/names/module-infos` (§4.9 step 3c): the readability
/// graph and exports restricted to this loader's modules. Serialized as
/// JSON since no class-file encoding of this data is in scope; a real
/// class loader reads it through a mechanism external to this crate.
#[derive(Debug, Clone, serde::Serialize)]
struct LoaderModuleInfos {
    loader: String,
    modules: Vec<LoaderModuleSummary>,
}

#[derive(Debug, Clone, serde::Serialize)]
struct LoaderModuleSummary {
    name: String,
    reads: BTreeSet<String>,
    exports: Vec<String>,
}

fn build_loader_module_infos(loader: Loader, graph: &ResolvedGraph, members: &[String]) -> Vec<u8> {
    let modules = members
        .iter()
        .map(|name| {
            let reads = graph.readability.get(name).cloned().unwrap_or_default();
            let exports = graph
                .selected
                .get(name)
                .map(|d| d.exports.iter().map(|e| e.package.clone()).collect())
                .unwrap_or_default();
            LoaderModuleSummary { name: name.clone(), reads, exports }
        })
        .collect();
    let infos = LoaderModuleInfos { loader: loader.name().to_string(), modules };
    serde_json::to_vec(&infos).expect("LoaderModuleInfos has no non-serializable field")
}

fn gather_module_resources(opener: &dyn ArtifactOpener, artifact: &ModuleArtifact) -> Result<Vec<ResourceEntry>> {
    let location = Path::new(&artifact.location);
    let reader = opener.open(location, artifact.shape.clone())?;
    let module_name = &artifact.descriptor.name;

    let mut entries = vec![ResourceEntry::module_info(module_name, reader.module_info_bytes()?)];
    for raw_path in reader.class_paths()? {
        let inner = raw_path.strip_prefix("classes/").unwrap_or(&raw_path);
        let bytes = reader.read_resource(&raw_path)?;
        entries.push(ResourceEntry::class_resource(module_name, inner, bytes));
    }
    for (raw_path, kind) in reader.other_resources()? {
        let bytes = reader.read_resource(&raw_path)?;
        entries.push(ResourceEntry::other_resource(module_name, &raw_path, bytes, kind));
    }
    Ok(entries)
}

/// Summary of a completed build, for the CLI to report.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Every selected module name, in the order it was written across
    /// `boot → ext → app`.
    pub modules: Vec<String>,
}

/// Ties together the finder, resolver, plugin pipeline, and image writer
/// into the single `link` operation (§4.9).
pub struct ImageBuilder {
    finder: Box<dyn ModuleFinder>,
    opener: Arc<dyn ArtifactOpener>,
    pipeline: Pipeline,
    loaders: LoaderTable,
    endian: Endian,
    windows: bool,
}

impl ImageBuilder {
    /// Build a driver from its collaborators. `windows` selects the
    /// native-directory placement rule (§6); pass `cfg!(windows)` in
    /// production code, a fixed value in tests.
    pub fn new(
        finder: Box<dyn ModuleFinder>,
        opener: Arc<dyn ArtifactOpener>,
        pipeline: Pipeline,
        loaders: LoaderTable,
        endian: Endian,
        windows: bool,
    ) -> Self {
        ImageBuilder { finder, opener, pipeline, loaders, endian, windows }
    }

    /// Run the full `link` operation: resolve `roots`, partition into
    /// loaders, pipeline each partition, write its image file, and place
    /// non-resource entries into the on-disk tree rooted at `output_root`.
    pub fn build(&self, roots: &[String], output_root: &Path) -> Result<BuildReport> {
        let graph = resolver::resolve(self.finder.as_ref(), roots)?;
        let layout = ImageLayout::new(output_root);
        fs::create_dir_all(layout.modules_dir())?;

        let mut partitions: HashMap<Loader, Vec<String>> = HashMap::new();
        for name in graph.module_names() {
            partitions.entry(self.loaders.loader_for(name)).or_default().push(name.to_string());
        }
        for members in partitions.values_mut() {
            members.sort();
        }

        // Each loader's image file is independent of the others (§4.9 step 3),
        // so the partitions run concurrently and join before the on-disk
        // tree is assembled (§5's "join barrier before writer emission").
        let results: Vec<(Loader, &Vec<String>, Result<Vec<ResourceEntry>>)> = Loader::ORDER
            .par_iter()
            .filter_map(|&loader| partitions.get(&loader).map(|members| (loader, members)))
            .map(|(loader, members)| {
                info!("building {} partition with {} module(s)", loader.name(), members.len());
                (loader, members, self.build_partition(loader, members, &graph, &layout))
            })
            .collect();

        let mut written_modules = Vec::new();
        let mut disk_entries: Vec<ResourceEntry> = Vec::new();
        for (_, members, result) in results {
            disk_entries.extend(result?);
            written_modules.extend(members.iter().cloned());
        }

        self.place_non_resource_entries(&disk_entries, &layout)?;
        self.write_release_file(&layout, &written_modules)?;

        Ok(BuildReport { modules: written_modules })
    }

    fn build_partition(
        &self,
        loader: Loader,
        members: &[String],
        graph: &ResolvedGraph,
        layout: &ImageLayout,
    ) -> Result<Vec<ResourceEntry>> {
        let mut input = ResourcePool::new();
        for name in members {
            let artifact = self.finder.find(name)?.ok_or_else(|| LinkError::ModuleNotFound {
                module: name.clone(),
                required_by: "<resolved graph>".to_string(),
            })?;
            for entry in gather_module_resources(self.opener.as_ref(), &artifact)? {
                input.add(entry)?;
            }
        }

        let output = self.pipeline.run(input)?;

        let (image_entries, disk_entries): (Vec<_>, Vec<_>) =
            output.pool.into_entries().into_iter().partition(|e| e.kind == ResourceKind::ClassOrResource || e.kind == ResourceKind::Other);

        let mut final_pool = ResourcePool::new();
        let infos_path = format!("/{}/module/names/module-infos", loader.name());
        final_pool.add(ResourceEntry {
            module: String::new(),
            path: infos_path,
            bytes: build_loader_module_infos(loader, graph, members),
            kind: ResourceKind::Other,
        })?;
        for entry in image_entries {
            final_pool.add(entry)?;
        }

        let image_path = layout.loader_image_path(loader.name());
        let partial_path = image_path.with_extension("jimage.partial");
        if let Err(err) = self.write_image(&final_pool, &output.uncompressed_sizes, &partial_path) {
            let _ = fs::remove_file(&partial_path);
            return Err(err);
        }
        fs::rename(&partial_path, &image_path)?;

        Ok(disk_entries)
    }

    fn write_image(
        &self,
        pool: &ResourcePool,
        uncompressed_sizes: &HashMap<(String, String), u64>,
        out_path: &Path,
    ) -> Result<()> {
        let mut writer = ImageWriter::new();
        let mut content = Vec::new();
        let mut offset = 0u64;

        for entry in pool.iter() {
            let key = (entry.module.clone(), entry.path.clone());
            let stored_len = entry.bytes.len() as u64;
            let (compressed_size, uncompressed_size, compressor_id) = match uncompressed_sizes.get(&key) {
                Some(&original) if stored_len < original => (stored_len, original, COMPRESSOR_ID_DEFLATE),
                Some(&original) => (0, original, 0),
                None => (0, stored_len, 0),
            };
            writer.add_location(&entry.path, offset, compressed_size, uncompressed_size, compressor_id);
            content.extend_from_slice(&entry.bytes);
            offset += stored_len;
        }

        let file = fs::File::create(out_path)?;
        let mut out = BufWriter::new(file);
        writer.write_header_and_tables(&mut out, self.endian)?;
        out.write_all(&content)?;
        out.flush()?;
        Ok(())
    }

    fn place_non_resource_entries(&self, entries: &[ResourceEntry], layout: &ImageLayout) -> Result<()> {
        for entry in entries {
            let file_name = entry.path.rsplit('/').next().unwrap_or(&entry.path);
            let Some(dest) = layout.destination_for(entry.kind, file_name, self.windows) else {
                warn!("resource {} ({:?}) has no on-disk destination, skipping", entry.path, entry.kind);
                continue;
            };
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&dest, &entry.bytes)?;
        }
        Ok(())
    }

    fn write_release_file(&self, layout: &ImageLayout, modules: &[String]) -> Result<()> {
        let csv = modules.join(",");
        let contents = format!("MODULES={csv}\n");
        fs::write(layout.release_path(), contents)?;
        Ok(())
    }
}
