//! End-to-end builder pipeline tests against an in-memory fake artifact
//! finder, covering the resolve → pipeline → image-write → on-disk tree
//! path as a whole rather than one module at a time.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use flate2::read::ZlibDecoder;
use std::io::Read;
use tempfile::tempdir;

use modlink::builder::{ImageBuilder, Loader, LoaderTable};
use modlink::default_collaborators::{DirectoryArtifactOpener, JsonDescriptorParser};
use modlink::error::{LinkError, Result};
use modlink::finder::{ArtifactOpener, ArtifactReader, DescriptorParser, DirectoryFinder, ModuleFinder};
use modlink::image::{Endian, ImageReader};
use modlink::model::{ArtifactShape, Dependence, ModuleArtifact, ModuleDescriptor};
use modlink::pipeline::plugins::compact_cp::ConstantPoolCompactor;
use modlink::pipeline::plugins::strip_debug::ClassfileEditor;
use modlink::pipeline::{config, default_registry, Pipeline};

fn descriptor(name: &str, deps: Vec<Dependence>) -> ModuleDescriptor {
    ModuleDescriptor {
        name: name.to_string(),
        version: None,
        dependences: deps.into_iter().collect(),
        exports: HashSet::new(),
        uses: Default::default(),
        provides: Default::default(),
        main_class: None,
        conceals: Default::default(),
    }
}

struct MapFinder(HashMap<String, ModuleDescriptor>);

struct MapArtifactReader {
    module_info: Vec<u8>,
    classes: Vec<(String, Vec<u8>)>,
}

impl ArtifactReader for MapArtifactReader {
    fn module_info_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.module_info.clone())
    }
    fn class_paths(&self) -> Result<Vec<String>> {
        Ok(self.classes.iter().map(|(p, _)| p.clone()).collect())
    }
    fn read_resource(&self, raw_path: &str) -> Result<Vec<u8>> {
        self.classes
            .iter()
            .find(|(p, _)| p == raw_path)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| LinkError::format(format!("no such resource {raw_path}")))
    }
}

struct MapOpener(HashMap<String, Vec<(String, Vec<u8>)>>);

impl ArtifactOpener for MapOpener {
    fn probe(&self, _path: &Path) -> Result<Option<ArtifactShape>> {
        Ok(Some(ArtifactShape::Expanded))
    }
    fn open(&self, path: &Path, _shape: ArtifactShape) -> Result<Box<dyn ArtifactReader>> {
        let name = path.file_stem().unwrap().to_string_lossy().to_string();
        let classes = self.0.get(&name).cloned().unwrap_or_default();
        Ok(Box::new(MapArtifactReader { module_info: name.into_bytes(), classes }))
    }
}

impl ModuleFinder for MapFinder {
    fn find(&self, name: &str) -> Result<Option<ModuleArtifact>> {
        Ok(self.0.get(name).map(|descriptor| ModuleArtifact {
            descriptor: descriptor.clone(),
            packages: Default::default(),
            location: format!("/fake/{name}.mod"),
            shape: ArtifactShape::Expanded,
        }))
    }
    fn all(&self) -> Result<Vec<ModuleArtifact>> {
        Ok(self
            .0
            .values()
            .map(|descriptor| ModuleArtifact {
                descriptor: descriptor.clone(),
                packages: Default::default(),
                location: format!("/fake/{}.mod", descriptor.name),
                shape: ArtifactShape::Expanded,
            })
            .collect())
    }
}

struct NoopEditor;
impl ClassfileEditor for NoopEditor {
    fn strip_attributes(&self, class_bytes: &[u8], _names: &[&str]) -> Result<Vec<u8>> {
        Ok(class_bytes.to_vec())
    }
}

/// Fake "class format": a newline-joined attribute-name list, matching the
/// convention the `strip-java-debug` unit tests use for their own fake
/// editor, so this plugin can be exercised without a real bytecode parser.
struct LineAttributeEditor;
impl ClassfileEditor for LineAttributeEditor {
    fn strip_attributes(&self, class_bytes: &[u8], names: &[&str]) -> Result<Vec<u8>> {
        let text = String::from_utf8_lossy(class_bytes);
        let kept: Vec<&str> = text.lines().filter(|line| !names.contains(line)).collect();
        Ok(kept.join("\n").into_bytes())
    }
}

struct NoopCompactor;
impl ConstantPoolCompactor for NoopCompactor {
    fn compact(&self, classes: &[(String, Vec<u8>)]) -> Result<(Vec<Vec<u8>>, Vec<u8>)> {
        Ok((classes.iter().map(|(_, b)| b.clone()).collect(), Vec::new()))
    }
}

fn empty_pipeline() -> Pipeline {
    let registry = default_registry(Arc::new(NoopEditor), Arc::new(NoopCompactor));
    Pipeline::build(&registry, &config::PipelineConfig::default()).unwrap()
}

/// Scenario 1: a module requiring nothing, rooted alone, lands in its
/// assigned loader partition as a single `module-info.class` plus class.
#[test]
fn minimal_resolve_writes_single_module_image() {
    let mut modules = HashMap::new();
    modules.insert("a".to_string(), descriptor("a", vec![]));
    let finder = Box::new(MapFinder(modules));
    let mut classes = HashMap::new();
    classes.insert("a".to_string(), vec![("classes/a/Main.class".to_string(), b"CODE".to_vec())]);
    let opener: Arc<dyn ArtifactOpener> = Arc::new(MapOpener(classes));

    let loaders = LoaderTable::new().assign("a", Loader::Boot);
    let builder = ImageBuilder::new(finder, opener, empty_pipeline(), loaders, Endian::Native, false);

    let out = tempdir().unwrap();
    let report = builder.build(&["a".to_string()], out.path()).unwrap();
    assert_eq!(report.modules, vec!["a".to_string()]);

    let image_path = out.path().join("lib/modules/boot.jimage");
    assert!(image_path.exists());
    let reader = ImageReader::open(&image_path, Endian::Native).unwrap();
    assert_eq!(reader.format_version(), (0, 1));
    let loc = reader.find("/module-info.class").unwrap().expect("module-info present");
    assert_eq!(loc.content_offset + loc.stored_size(), reader.content().len() as u64);
}

/// Scenario 2: `a requires public b`, `b requires c`. `a` must be able to
/// read `c` transitively, and the synthetic per-loader summary records it.
#[test]
fn public_reexport_extends_readability_in_loader_module_infos() {
    let mut modules = HashMap::new();
    modules.insert("a".to_string(), descriptor("a", vec![Dependence::new("b").public()]));
    modules.insert("b".to_string(), descriptor("b", vec![Dependence::new("c")]));
    modules.insert("c".to_string(), descriptor("c", vec![]));
    let finder = Box::new(MapFinder(modules));
    let opener: Arc<dyn ArtifactOpener> = Arc::new(MapOpener(HashMap::new()));

    let builder = ImageBuilder::new(finder, opener, empty_pipeline(), LoaderTable::new(), Endian::Native, false);
    let out = tempdir().unwrap();
    let report = builder.build(&["a".to_string()], out.path()).unwrap();
    assert_eq!(report.modules.len(), 3);

    let reader = ImageReader::open(&out.path().join("lib/modules/app.jimage"), Endian::Native).unwrap();
    let loc = reader.find("/app/module/names/module-infos").unwrap().expect("synthetic entry present");
    assert_eq!(loc.content_offset, 0, "synthetic module-infos must be the first entry in the content region");

    let bytes = &reader.content()[loc.content_offset as usize..(loc.content_offset + loc.uncompressed_size) as usize];
    let infos: serde_json::Value = serde_json::from_slice(bytes).unwrap();
    let a_reads: Vec<String> = infos["modules"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == "a")
        .unwrap()["reads"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert!(a_reads.contains(&"c".to_string()));
}

/// Scenario 3: an optional `requires` with no matching artifact does not
/// fail the build.
#[test]
fn optional_missing_module_does_not_fail_build() {
    let mut modules = HashMap::new();
    modules.insert("a".to_string(), descriptor("a", vec![Dependence::new("z").optional()]));
    let finder = Box::new(MapFinder(modules));
    let opener: Arc<dyn ArtifactOpener> = Arc::new(MapOpener(HashMap::new()));

    let builder = ImageBuilder::new(finder, opener, empty_pipeline(), LoaderTable::new(), Endian::Native, false);
    let out = tempdir().unwrap();
    let report = builder.build(&["a".to_string()], out.path()).unwrap();
    assert_eq!(report.modules, vec!["a".to_string()]);
}

/// Scenario 4: two artifacts declaring the same module name in one
/// directory is a hard conflict, not a silent pick.
#[test]
fn duplicate_module_in_directory_is_rejected() {
    struct FixedNameOpener;
    impl ArtifactOpener for FixedNameOpener {
        fn probe(&self, path: &Path) -> Result<Option<ArtifactShape>> {
            if path.extension().and_then(|e| e.to_str()) == Some("fakemod") {
                Ok(Some(ArtifactShape::Packed))
            } else {
                Ok(None)
            }
        }
        fn open(&self, _path: &Path, _shape: ArtifactShape) -> Result<Box<dyn ArtifactReader>> {
            Ok(Box::new(MapArtifactReader { module_info: b"foo".to_vec(), classes: vec![] }))
        }
    }
    struct FixedNameParser;
    impl DescriptorParser for FixedNameParser {
        fn parse(&self, bytes: &[u8]) -> Result<ModuleDescriptor> {
            Ok(descriptor(&String::from_utf8_lossy(bytes), vec![]))
        }
    }

    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("one.fakemod"), "foo").unwrap();
    std::fs::write(dir.path().join("two.fakemod"), "foo").unwrap();

    let finder = DirectoryFinder::new(vec![dir.path().to_path_buf()], Arc::new(FixedNameOpener), Arc::new(FixedNameParser));
    let err = finder.find("foo").unwrap_err();
    assert!(matches!(err, LinkError::ModuleVersionConflict { .. }));
}

/// Scenario 5: `strip-java-debug` plus `default-compress` together shrink
/// a class and drop its `LineNumberTable` attribute, verified by
/// decompressing the written bytes back out of the image.
#[test]
fn compress_and_strip_pipeline_removes_debug_attributes_and_shrinks_size() {
    let filler: String = std::iter::repeat("NoOpPadding\n").take(400).collect();
    let class_text = format!("Code\nLineNumberTable\nSourceFile\n{filler}");
    let original_len = class_text.len() as u64;

    let mut modules = HashMap::new();
    let mut classes = HashMap::new();
    classes.insert("a".to_string(), vec![("classes/a/Main.class".to_string(), class_text.into_bytes())]);
    modules.insert("a".to_string(), descriptor("a", vec![]));
    let finder = Box::new(MapFinder(modules));
    let opener: Arc<dyn ArtifactOpener> = Arc::new(MapOpener(classes));

    let text = "
        resources.transformer = strip-java-debug
        strip-java-debug.argument = on
        resources.compressor = default-compress
        default-compress.argument = on
    ";
    let pipeline_config = config::parse(text).unwrap();
    let registry = default_registry(Arc::new(LineAttributeEditor), Arc::new(NoopCompactor));
    let pipeline = Pipeline::build(&registry, &pipeline_config).unwrap();

    let builder = ImageBuilder::new(finder, opener, pipeline, LoaderTable::new(), Endian::Native, false);
    let out = tempdir().unwrap();
    builder.build(&["a".to_string()], out.path()).unwrap();

    let reader = ImageReader::open(&out.path().join("lib/modules/app.jimage"), Endian::Native).unwrap();
    let loc = reader.find("/a/Main.class").unwrap().expect("class entry present");
    assert_eq!(loc.compressor_id, 1);
    assert!(loc.compressed_size > 0 && loc.compressed_size < original_len);

    let packed = &reader.content()[loc.content_offset as usize..(loc.content_offset + loc.compressed_size) as usize];
    let mut decoder = ZlibDecoder::new(packed);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).unwrap();
    let text = String::from_utf8(decompressed).unwrap();
    assert!(!text.contains("LineNumberTable"));
    assert!(!text.contains("SourceFile"));
    assert!(text.contains("Code"));
}

/// Scenario 6: `exclude-resources` drops matching entries before they
/// ever reach the writer.
#[test]
fn exclude_filter_drops_jcov_entries_from_image() {
    let mut modules = HashMap::new();
    let mut classes = HashMap::new();
    classes.insert(
        "a".to_string(),
        vec![
            ("classes/a/Main.class".to_string(), b"CODE".to_vec()),
            ("classes/coverage.jcov".to_string(), b"COV".to_vec()),
        ],
    );
    modules.insert("a".to_string(), descriptor("a", vec![]));
    let finder = Box::new(MapFinder(modules));
    let opener: Arc<dyn ArtifactOpener> = Arc::new(MapOpener(classes));

    let text = "
        resources.filter = exclude-resources
        exclude-resources.argument = on
        exclude-resources.exclude = *.jcov
    ";
    let pipeline_config = config::parse(text).unwrap();
    let registry = default_registry(Arc::new(NoopEditor), Arc::new(NoopCompactor));
    let pipeline = Pipeline::build(&registry, &pipeline_config).unwrap();

    let builder = ImageBuilder::new(finder, opener, pipeline, LoaderTable::new(), Endian::Native, false);
    let out = tempdir().unwrap();
    builder.build(&["a".to_string()], out.path()).unwrap();

    let reader = ImageReader::open(&out.path().join("lib/modules/app.jimage"), Endian::Native).unwrap();
    assert!(reader.find("/a/coverage.jcov").unwrap().is_none());
    assert!(reader.find("/a/Main.class").unwrap().is_some());
}

/// A module carrying a native library, a native command, and a config file
/// alongside its classes gets each placed into the parallel on-disk tree
/// (§4.9 step 4) rather than packed into the image.
#[test]
fn native_and_config_resources_are_placed_into_on_disk_tree() {
    let module_dir = tempdir().unwrap();
    std::fs::write(module_dir.path().join("module-info.json"), br#"{"name":"a"}"#).unwrap();
    std::fs::create_dir_all(module_dir.path().join("a/pkg")).unwrap();
    std::fs::write(module_dir.path().join("a/pkg/Main.class"), b"CODE").unwrap();
    std::fs::create_dir_all(module_dir.path().join("native")).unwrap();
    std::fs::write(module_dir.path().join("native/libfoo.so"), b"LIB").unwrap();
    std::fs::create_dir_all(module_dir.path().join("bin")).unwrap();
    std::fs::write(module_dir.path().join("bin/launcher"), b"BIN").unwrap();
    std::fs::create_dir_all(module_dir.path().join("conf")).unwrap();
    std::fs::write(module_dir.path().join("conf/settings.properties"), b"k=v").unwrap();

    let module_path_dir = tempdir().unwrap();
    std::fs::rename(module_dir.path(), module_path_dir.path().join("a")).unwrap();

    let opener: Arc<dyn ArtifactOpener> = Arc::new(DirectoryArtifactOpener);
    let parser = Arc::new(JsonDescriptorParser);
    let finder = Box::new(DirectoryFinder::new(vec![module_path_dir.path().to_path_buf()], opener.clone(), parser));

    let builder = ImageBuilder::new(finder, opener, empty_pipeline(), LoaderTable::new(), Endian::Native, false);
    let out = tempdir().unwrap();
    builder.build(&["a".to_string()], out.path()).unwrap();

    assert_eq!(std::fs::read(out.path().join("lib/libfoo.so")).unwrap(), b"LIB");
    assert_eq!(std::fs::read(out.path().join("bin/launcher")).unwrap(), b"BIN");
    assert_eq!(std::fs::read(out.path().join("conf/settings.properties")).unwrap(), b"k=v");

    let reader = ImageReader::open(&out.path().join("lib/modules/app.jimage"), Endian::Native).unwrap();
    assert!(reader.find("/a/a/pkg/Main.class").unwrap().is_some());
}
