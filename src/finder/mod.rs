//! Module artifact finder (§4.5).
//!
//! Archive I/O (`.jmod`/`.jar` parsing) and class-file descriptor parsing
//! are out of scope for this crate (§1's external collaborators); this
//! module owns the part that *is* in scope — recognizing which of the
//! three artifact shapes a module-path entry is, enumerating directories
//! in order with first-match-wins semantics, detecting duplicate module
//! names within one directory, deriving a package set from a raw class
//! path listing, and composing an "upgrade shadows system" finder chain.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{LinkError, Result};
use crate::model::{ArtifactShape, ModuleArtifact, ModuleDescriptor, ResourceKind};

/// Raw access to one located artifact, supplied by the embedder. Opening
/// the actual `.jmod`/`.jar` bytes or walking an expanded directory's
/// classes is external to this crate; this trait is the seam.
pub trait ArtifactReader: Send + Sync {
    /// Raw bytes of the module's descriptor (`module-info.class`),
    /// wherever this shape stores it.
    fn module_info_bytes(&self) -> Result<Vec<u8>>;

    /// Every class resource path in the artifact, exactly as stored
    /// (e.g. `classes/java/lang/Object.class` for a packed artifact, or
    /// `java/lang/Object.class` for an expanded one) — the finder applies
    /// the `classes/`-stripping and `/`-to-`.` translation itself.
    fn class_paths(&self) -> Result<Vec<String>>;

    /// Raw bytes of one resource, addressed by the same raw path shape
    /// `class_paths` returned it in. Used by the image builder to pull
    /// resource content into the pool; out of scope for the finder itself.
    fn read_resource(&self, raw_path: &str) -> Result<Vec<u8>>;

    /// Every non-class resource in the artifact (native libraries, native
    /// commands, configuration files), paired with the kind the builder
    /// places it on disk by (§4.9 step 4, §6). Read through
    /// [`ArtifactReader::read_resource`] the same way a class path is.
    /// Most shapes carry none; the default is empty rather than forcing
    /// every implementor to declare so.
    fn other_resources(&self) -> Result<Vec<(String, ResourceKind)>> {
        Ok(Vec::new())
    }
}

/// Recognizes and opens artifacts on a module path. The embedder supplies
/// this; this crate never reads a zip/jmod container directly.
pub trait ArtifactOpener: Send + Sync {
    /// Inspect `path` (one entry within a scanned directory) and report
    /// which shape it is, or `None` if it should be ignored.
    fn probe(&self, path: &Path) -> Result<Option<ArtifactShape>>;

    /// Open a previously-probed `path` as `shape`.
    fn open(&self, path: &Path, shape: ArtifactShape) -> Result<Box<dyn ArtifactReader>>;
}

/// Parses a `module-info.class` byte stream into a descriptor. An opaque
/// collaborator per §1; this crate carries no classfile parser.
pub trait DescriptorParser: Send + Sync {
    /// Parse `bytes` into a [`ModuleDescriptor`].
    fn parse(&self, bytes: &[u8]) -> Result<ModuleDescriptor>;
}

/// Derive a package set from a raw class-path listing (§4.5): strip a
/// leading `classes/`, drop the file component, translate `/` to `.`,
/// and exclude the entry that yields no package (`module-info.class`
/// itself, at the synthetic empty prefix).
pub fn derive_packages(class_paths: &[String]) -> std::collections::BTreeSet<String> {
    let mut packages = std::collections::BTreeSet::new();
    for raw in class_paths {
        let stripped = raw.strip_prefix("classes/").unwrap_or(raw);
        let Some(slash) = stripped.rfind('/') else {
            continue; // no directory component: root-level file, no package
        };
        let dir = &stripped[..slash];
        if dir.is_empty() {
            continue;
        }
        packages.insert(dir.replace('/', "."));
    }
    packages
}

/// Something that can answer "who provides module `name`".
pub trait ModuleFinder: Send + Sync {
    /// Lazily scan until `name` is found or the search space is exhausted.
    fn find(&self, name: &str) -> Result<Option<ModuleArtifact>>;

    /// Eagerly scan every reachable artifact.
    fn all(&self) -> Result<Vec<ModuleArtifact>>;
}

/// An ordered list of directories scanned in order; within one directory,
/// two artifacts declaring the same module name fail the scan.
pub struct DirectoryFinder {
    directories: Vec<PathBuf>,
    opener: Arc<dyn ArtifactOpener>,
    parser: Arc<dyn DescriptorParser>,
}

impl DirectoryFinder {
    /// Build a finder over `directories`, scanned in the given order.
    pub fn new(directories: Vec<PathBuf>, opener: Arc<dyn ArtifactOpener>, parser: Arc<dyn DescriptorParser>) -> Self {
        DirectoryFinder { directories, opener, parser }
    }

    fn scan_directory(&self, dir: &Path) -> Result<HashMap<String, ModuleArtifact>> {
        let mut found = HashMap::new();
        let read_dir = match fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e.into()),
        };
        for entry in read_dir {
            let entry = entry?;
            let path = entry.path();
            let Some(shape) = self.opener.probe(&path)? else { continue };
            let artifact = self.build_artifact(&path, shape)?;
            let name = artifact.descriptor.name.clone();
            if let Some(existing) = found.insert(name.clone(), artifact) {
                return Err(LinkError::ModuleVersionConflict {
                    module: name,
                    first: existing.location,
                    second: path.display().to_string(),
                });
            }
        }
        Ok(found)
    }

    fn build_artifact(&self, path: &Path, shape: ArtifactShape) -> Result<ModuleArtifact> {
        let reader = self.opener.open(path, shape.clone())?;
        let descriptor = self.parser.parse(&reader.module_info_bytes()?)?;
        let packages = derive_packages(&reader.class_paths()?);
        Ok(ModuleArtifact { descriptor, packages, location: path.display().to_string(), shape })
    }
}

impl ModuleFinder for DirectoryFinder {
    fn find(&self, name: &str) -> Result<Option<ModuleArtifact>> {
        for dir in &self.directories {
            if let Some(artifact) = self.scan_directory(dir)?.remove(name) {
                return Ok(Some(artifact));
            }
        }
        Ok(None)
    }

    fn all(&self) -> Result<Vec<ModuleArtifact>> {
        let mut seen = HashMap::new();
        for dir in &self.directories {
            for (name, artifact) in self.scan_directory(dir)? {
                seen.entry(name).or_insert(artifact);
            }
        }
        Ok(seen.into_values().collect())
    }
}

/// Composes two finders so that `upgrade` shadows `system` for any module
/// name it defines; shadowing is not a conflict (§4.6).
pub struct ChainedFinder {
    upgrade: Box<dyn ModuleFinder>,
    system: Box<dyn ModuleFinder>,
}

impl ChainedFinder {
    /// Build a chain where `upgrade` is consulted first.
    pub fn new(upgrade: Box<dyn ModuleFinder>, system: Box<dyn ModuleFinder>) -> Self {
        ChainedFinder { upgrade, system }
    }
}

impl ModuleFinder for ChainedFinder {
    fn find(&self, name: &str) -> Result<Option<ModuleArtifact>> {
        if let Some(artifact) = self.upgrade.find(name)? {
            return Ok(Some(artifact));
        }
        self.system.find(name)
    }

    fn all(&self) -> Result<Vec<ModuleArtifact>> {
        let mut by_name: HashMap<String, ModuleArtifact> = HashMap::new();
        for artifact in self.upgrade.all()? {
            by_name.insert(artifact.descriptor.name.clone(), artifact);
        }
        for artifact in self.system.all()? {
            by_name.entry(artifact.descriptor.name.clone()).or_insert(artifact);
        }
        Ok(by_name.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dependence, ModuleDescriptor};
    use std::collections::{BTreeSet, HashSet};

    #[test]
    fn derives_packages_and_excludes_module_info() {
        let paths = vec![
            "classes/module-info.class".to_string(),
            "classes/java/lang/Object.class".to_string(),
            "classes/java/lang/String.class".to_string(),
            "classes/java/util/List.class".to_string(),
        ];
        let packages = derive_packages(&paths);
        let expected: BTreeSet<String> = ["java.lang", "java.util"].into_iter().map(String::from).collect();
        assert_eq!(packages, expected);
    }

    struct FakeOpener {
        shape: ArtifactShape,
    }

    impl ArtifactOpener for FakeOpener {
        fn probe(&self, path: &Path) -> Result<Option<ArtifactShape>> {
            if path.extension().and_then(|e| e.to_str()) == Some("fakemod") {
                Ok(Some(self.shape.clone()))
            } else {
                Ok(None)
            }
        }

        fn open(&self, path: &Path, shape: ArtifactShape) -> Result<Box<dyn ArtifactReader>> {
            let name = path.file_stem().unwrap().to_string_lossy().to_string();
            Ok(Box::new(FakeReader { name, shape }))
        }
    }

    struct FakeReader {
        name: String,
        #[allow(dead_code)]
        shape: ArtifactShape,
    }

    impl ArtifactReader for FakeReader {
        fn module_info_bytes(&self) -> Result<Vec<u8>> {
            Ok(self.name.clone().into_bytes())
        }
        fn class_paths(&self) -> Result<Vec<String>> {
            Ok(vec![format!("classes/{}/Main.class", self.name)])
        }
        fn read_resource(&self, raw_path: &str) -> Result<Vec<u8>> {
            Ok(raw_path.as_bytes().to_vec())
        }
    }

    struct FakeParser;

    impl DescriptorParser for FakeParser {
        fn parse(&self, bytes: &[u8]) -> Result<ModuleDescriptor> {
            let name = String::from_utf8(bytes.to_vec()).unwrap();
            Ok(ModuleDescriptor {
                name,
                version: None,
                dependences: HashSet::from([Dependence::new("other")]),
                exports: HashSet::new(),
                uses: BTreeSet::new(),
                provides: Default::default(),
                main_class: None,
                conceals: BTreeSet::new(),
            })
        }
    }

    #[test]
    fn duplicate_module_in_one_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.fakemod"), "foo").unwrap();
        std::fs::write(dir.path().join("b.fakemod"), "foo").unwrap();

        let finder = DirectoryFinder::new(
            vec![dir.path().to_path_buf()],
            Arc::new(FakeOpener { shape: ArtifactShape::Packed }),
            Arc::new(FakeParser),
        );
        let err = finder.find("foo").unwrap_err();
        assert!(matches!(err, LinkError::ModuleVersionConflict { .. }));
    }

    #[test]
    fn upgrade_shadows_system_without_conflict() {
        let upgrade_dir = tempfile::tempdir().unwrap();
        let system_dir = tempfile::tempdir().unwrap();
        std::fs::write(upgrade_dir.path().join("foo.fakemod"), "foo").unwrap();
        std::fs::write(system_dir.path().join("foo.fakemod"), "foo").unwrap();
        std::fs::write(system_dir.path().join("bar.fakemod"), "bar").unwrap();

        let opener: Arc<dyn ArtifactOpener> = Arc::new(FakeOpener { shape: ArtifactShape::Packed });
        let parser: Arc<dyn DescriptorParser> = Arc::new(FakeParser);
        let upgrade = DirectoryFinder::new(vec![upgrade_dir.path().to_path_buf()], opener.clone(), parser.clone());
        let system = DirectoryFinder::new(vec![system_dir.path().to_path_buf()], opener, parser);
        let chained = ChainedFinder::new(Box::new(upgrade), Box::new(system));

        assert!(chained.find("foo").unwrap().is_some());
        assert!(chained.find("bar").unwrap().is_some());
        assert_eq!(chained.all().unwrap().len(), 2);
    }
}
