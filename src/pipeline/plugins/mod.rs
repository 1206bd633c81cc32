//! Concrete plugins (§4.8's plugin table).

pub mod compact_cp;
pub mod compress;
pub mod exclude;
pub mod sort;
pub mod strip_debug;

pub use compact_cp::CompactCpPlugin;
pub use compress::DefaultCompressPlugin;
pub use exclude::{ExcludeFilesPlugin, ExcludeResourcesPlugin};
pub use sort::SortResourcesPlugin;
pub use strip_debug::StripJavaDebugPlugin;
