//! Error taxonomy for the linker core.
//!
//! One variant per kind named in the error handling design: `io`, `format`,
//! `module-not-found`, `module-version-conflict`, `duplicate-entry`,
//! `plugin-config`, `plugin-runtime`, `hash-collision-exhausted`.
//! `wrong-endian`/`wrong-version` are carried inside `Format` via
//! [`ImageReadError`] since both are image-header rejections.

use std::fmt;

/// Image header rejection reasons, nested under [`LinkError::Format`].
#[derive(Debug, thiserror::Error)]
pub enum ImageReadError {
    /// The 32-bit magic matched the byte-swapped value: the reader opened
    /// the image with the wrong endianness.
    #[error("wrong endian: expected magic 0x{expected:08X}, found 0x{found:08X}")]
    WrongEndian {
        /// Expected magic (`0xCAFEDADA`).
        expected: u32,
        /// Magic actually read from the header.
        found: u32,
    },

    /// Major version is newer than this reader supports, or minor version
    /// is newer within the same major version.
    #[error(
        "wrong version: image is {found_major}.{found_minor}, reader supports up to {max_major}.{max_minor}"
    )]
    WrongVersion {
        /// Major version found in the header.
        found_major: u16,
        /// Minor version found in the header.
        found_minor: u16,
        /// Highest major version this reader accepts.
        max_major: u16,
        /// Highest minor version this reader accepts at `max_major`.
        max_minor: u16,
    },

    /// Header or table bytes could not be parsed at all.
    #[error("malformed image: {0}")]
    Malformed(String),
}

/// Top-level error type for every fallible linker operation.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Underlying read/write failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact, descriptor, or image content was malformed.
    #[error("format: {detail}")]
    Format {
        /// Human-readable explanation.
        detail: String,
        /// Offending artifact or image path, if known.
        path: Option<String>,
    },

    /// Resolver could not satisfy a non-optional `requires`.
    #[error("module-not-found: {module} required by {required_by}")]
    ModuleNotFound {
        /// The module name that could not be located.
        module: String,
        /// The module whose `requires` clause named it.
        required_by: String,
    },

    /// Two distinct descriptors claim the same module name.
    #[error("module-version-conflict: {module} ({first} vs {second})")]
    ModuleVersionConflict {
        /// Conflicting module name.
        module: String,
        /// Description of the first artifact seen.
        first: String,
        /// Description of the second, conflicting artifact.
        second: String,
    },

    /// A resource pool insert collided on `(module, path)`.
    #[error("duplicate-entry: {module}:{path}")]
    DuplicateEntry {
        /// Owning module.
        module: String,
        /// Colliding path.
        path: String,
    },

    /// Unknown plugin name or a bad argument in the pipeline configuration.
    #[error("plugin-config: {0}")]
    PluginConfig(String),

    /// A pipeline stage failed while processing an entry.
    #[error("plugin-runtime: {plugin}: {detail}")]
    PluginRuntime {
        /// Plugin that failed.
        plugin: String,
        /// Failure detail.
        detail: String,
    },

    /// The writer exhausted its salt search while building the redirect
    /// table.
    #[error("hash-collision-exhausted: {0} entries")]
    HashCollisionExhausted(usize),
}

impl LinkError {
    /// Construct a [`LinkError::Format`] without an associated path.
    pub fn format(detail: impl Into<String>) -> Self {
        LinkError::Format { detail: detail.into(), path: None }
    }

    /// Construct a [`LinkError::Format`] with an associated artifact/image
    /// path, for the "offending artifact path and module name" requirement
    /// on user-visible diagnostics.
    pub fn format_at(detail: impl Into<String>, path: impl Into<String>) -> Self {
        LinkError::Format { detail: detail.into(), path: Some(path.into()) }
    }
}

impl From<ImageReadError> for LinkError {
    fn from(err: ImageReadError) -> Self {
        LinkError::format(err.to_string())
    }
}

/// `kind: detail` rendering used by the CLI's one-line diagnostics.
pub struct Diagnostic<'a>(pub &'a LinkError);

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LinkError>;
