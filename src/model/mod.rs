//! Core data model shared by the resolver, pool, and pipeline.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// A module name: non-empty, dot-separated identifier segments.
///
/// Equality and hashing are by name only; a version tag disambiguates
/// artifact selection but never identity within a resolved graph.
#[derive(Debug, Clone, Eq)]
pub struct ModuleId {
    name: String,
    version: Option<String>,
}

impl ModuleId {
    /// Build a module id. Panics only via `debug_assert` on an empty name,
    /// since every caller in this crate derives names from parsed
    /// descriptors or tests, never from unchecked user input.
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty(), "module name must not be empty");
        ModuleId { name, version }
    }

    /// The module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The optional version tag.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl PartialEq for ModuleId {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl std::hash::Hash for ModuleId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{v}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A dependency edge modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    /// `requires public`: readability propagates transitively through the
    /// requirer.
    Public,
    /// `requires optional`: a missing target is not an error.
    Optional,
    /// `requires synthetic`: generated by tooling, otherwise an ordinary
    /// dependence.
    Synthetic,
}

/// A `(target_name, modifiers)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependence {
    /// Name of the required module.
    pub target_name: String,
    /// Modifier set on this dependence.
    pub modifiers: BTreeSet<Modifier>,
}

impl Dependence {
    /// Build a dependence with no modifiers.
    pub fn new(target_name: impl Into<String>) -> Self {
        Dependence { target_name: target_name.into(), modifiers: BTreeSet::new() }
    }

    /// Builder-style: mark as `public`.
    pub fn public(mut self) -> Self {
        self.modifiers.insert(Modifier::Public);
        self
    }

    /// Builder-style: mark as `optional`.
    pub fn optional(mut self) -> Self {
        self.modifiers.insert(Modifier::Optional);
        self
    }

    /// Builder-style: mark as `synthetic`.
    pub fn synthetic(mut self) -> Self {
        self.modifiers.insert(Modifier::Synthetic);
        self
    }

    /// Whether this dependence propagates readability through its requirer.
    pub fn is_public(&self) -> bool {
        self.modifiers.contains(&Modifier::Public)
    }

    /// Whether a missing target is tolerated.
    pub fn is_optional(&self) -> bool {
        self.modifiers.contains(&Modifier::Optional)
    }
}

/// An export declaration: a package, optionally qualified to a set of
/// friend modules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Export {
    /// Exported package name.
    pub package: String,
    /// `None` means exported to everyone; `Some` restricts to the named
    /// modules (a qualified export).
    pub to: Option<BTreeSet<String>>,
}

/// The parsed contents of a module's metadata declaration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ModuleDescriptor {
    /// Module name.
    pub name: String,
    /// Optional version tag.
    pub version: Option<String>,
    /// `requires` edges.
    #[serde(skip)]
    pub dependences: HashSet<Dependence>,
    /// `exports` declarations.
    #[serde(skip)]
    pub exports: HashSet<Export>,
    /// `uses` service names.
    pub uses: BTreeSet<String>,
    /// `provides` map: service name to the set of implementation class
    /// names providing it.
    pub provides: HashMap<String, BTreeSet<String>>,
    /// Optional entry-point class.
    pub main_class: Option<String>,
    /// Non-exported ("concealed") packages.
    pub conceals: BTreeSet<String>,
}

// serde::Serialize is not derivable for HashSet<Dependence>/HashSet<Export>
// without Serialize on those types; rather than derive it there (they have
// no reader-facing JSON shape of their own) the debug dump below renders
// them explicitly.
impl serde::Serialize for Dependence {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Dependence", 2)?;
        s.serialize_field("target_name", &self.target_name)?;
        let modifiers: Vec<&'static str> = self
            .modifiers
            .iter()
            .map(|m| match m {
                Modifier::Public => "public",
                Modifier::Optional => "optional",
                Modifier::Synthetic => "synthetic",
            })
            .collect();
        s.serialize_field("modifiers", &modifiers)?;
        s.end()
    }
}

impl serde::Serialize for Export {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Export", 2)?;
        s.serialize_field("package", &self.package)?;
        s.serialize_field("to", &self.to)?;
        s.end()
    }
}

impl ModuleDescriptor {
    /// A debug JSON rendering including the declarations skipped by the
    /// derive above, for `--describe-module`.
    pub fn to_debug_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "version": self.version,
            "dependences": self.dependences,
            "exports": self.exports,
            "uses": self.uses,
            "provides": self.provides,
            "main_class": self.main_class,
            "conceals": self.conceals,
        })
    }
}

/// An identifier for the concrete on-disk form a module was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactShape {
    /// A `.jmod`-style packed archive.
    Packed,
    /// A `.jar`-style compressed archive carrying `module-info.class`.
    Compressed,
    /// A directory with `module-info.class` at its root.
    Expanded,
}

/// An immutable, fully-scanned module artifact.
#[derive(Debug, Clone)]
pub struct ModuleArtifact {
    /// The module's parsed descriptor.
    pub descriptor: ModuleDescriptor,
    /// Every package containing at least one class, derived by a single
    /// scan at construction time.
    pub packages: BTreeSet<String>,
    /// Location of the artifact on disk (a path, used as the url-like
    /// handle this crate treats artifact locations as).
    pub location: String,
    /// Which of the three recognized shapes this artifact was found as.
    pub shape: ArtifactShape,
}

/// The kind of a resource entry, used for on-disk tree placement (§6) and
/// by filter/transformer plugins that target one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A class file or ordinary packaged resource, placed inside the image.
    ClassOrResource,
    /// A native shared library.
    NativeLib,
    /// A native executable.
    NativeCmd,
    /// A configuration file.
    Config,
    /// Anything else (release/bom-adjacent data).
    Other,
}

/// A single `(module, path, bytes, kind)` flowing through the pipeline.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    /// Owning module name.
    pub module: String,
    /// Path within the module. Class resources carry a leading
    /// `/<module>/<inner>` qualifier; `META-INF/*` entries are bare;
    /// `module-info.class` is `/` prefixed and bare.
    pub path: String,
    /// Entry content.
    pub bytes: Vec<u8>,
    /// Entry kind.
    pub kind: ResourceKind,
}

impl ResourceEntry {
    /// Build a class-or-resource entry with the `/<module>/<inner>`
    /// qualifier applied.
    pub fn class_resource(module: impl Into<String>, inner: &str, bytes: Vec<u8>) -> Self {
        let module = module.into();
        let path = format!("/{module}/{inner}");
        ResourceEntry { module, path, bytes, kind: ResourceKind::ClassOrResource }
    }

    /// Build a bare `META-INF/*`-style entry.
    pub fn meta_inf(module: impl Into<String>, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        ResourceEntry { module: module.into(), path: path.into(), bytes, kind: ResourceKind::ClassOrResource }
    }

    /// Build the synthetic `module-info.class` entry for a module: a bare,
    /// `/`-prefixed path with no module qualifier (the owning module is
    /// disambiguated by the pool's `(module, path)` key).
    pub fn module_info(module: impl Into<String>, bytes: Vec<u8>) -> Self {
        ResourceEntry {
            module: module.into(),
            path: "/module-info.class".to_string(),
            bytes,
            kind: ResourceKind::ClassOrResource,
        }
    }

    /// Build a native-library, native-command, or config entry (§4.9 step 4):
    /// placed into the parallel on-disk tree rather than packed into an
    /// image, keyed by its raw path within the artifact so duplicates across
    /// modules are still caught by the pool.
    pub fn other_resource(module: impl Into<String>, raw_path: &str, bytes: Vec<u8>, kind: ResourceKind) -> Self {
        let module = module.into();
        let path = format!("/{module}/{raw_path}");
        ResourceEntry { module, path, bytes, kind }
    }
}
