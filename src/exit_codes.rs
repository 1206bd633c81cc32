//! Process exit codes shared by both binaries.

use crate::error::LinkError;

/// Successful execution.
pub const EXIT_SUCCESS: i32 = 0;

/// Usage error: bad CLI arguments.
pub const EXIT_USAGE: i32 = 1;

/// Resolve error: `module-not-found`, `module-version-conflict`, or a
/// malformed descriptor/artifact.
pub const EXIT_RESOLVE_ERROR: i32 = 2;

/// I/O error reading an artifact or writing the image.
pub const EXIT_IO_ERROR: i32 = 3;

/// Plugin configuration or runtime error.
pub const EXIT_PLUGIN_ERROR: i32 = 4;

/// Map a [`LinkError`] to its exit code (§6), for call sites like
/// `build()` that can surface any variant rather than one known up front.
pub fn for_error(err: &LinkError) -> i32 {
    match err {
        LinkError::Io(_) => EXIT_IO_ERROR,
        LinkError::PluginConfig(_) | LinkError::PluginRuntime { .. } => EXIT_PLUGIN_ERROR,
        LinkError::Format { .. }
        | LinkError::ModuleNotFound { .. }
        | LinkError::ModuleVersionConflict { .. }
        | LinkError::DuplicateEntry { .. }
        | LinkError::HashCollisionExhausted(_) => EXIT_RESOLVE_ERROR,
    }
}
