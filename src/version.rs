//! Version information for modlink binaries.

/// Current version of the linker, taken from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Image format version emitted by this build (major, minor).
pub const IMAGE_FORMAT_VERSION: (u16, u16) = (0, 1);
