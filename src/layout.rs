//! On-disk image tree layout (§6): where per-loader image files, native
//! artifacts, configuration, and release metadata land under an image root.

use std::path::{Path, PathBuf};

use crate::model::ResourceKind;

/// Root-relative paths making up a built image tree.
#[derive(Debug, Clone)]
pub struct ImageLayout {
    root: PathBuf,
}

const WINDOWS_BIN_EXTENSIONS: &[&str] = &[".dll", ".diz", ".pdb", ".map"];

impl ImageLayout {
    /// A layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ImageLayout { root: root.into() }
    }

    /// The image root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `lib/modules/`, holding the per-loader `.jimage` files.
    pub fn modules_dir(&self) -> PathBuf {
        self.root.join("lib").join("modules")
    }

    /// `lib/modules/<loader>.jimage`.
    pub fn loader_image_path(&self, loader: &str) -> PathBuf {
        self.modules_dir().join(format!("{loader}.jimage"))
    }

    /// `bin/`: native commands, and on Windows a subset of native libraries.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// `lib/`: native libraries (all of them on POSIX).
    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    /// `conf/`: configuration entries.
    pub fn conf_dir(&self) -> PathBuf {
        self.root.join("conf")
    }

    /// `release`: a properties file augmented with `MODULES=<csv>`.
    pub fn release_path(&self) -> PathBuf {
        self.root.join("release")
    }

    /// `bom`: optional build manifest.
    pub fn bom_path(&self) -> PathBuf {
        self.root.join("bom")
    }

    /// Where a non-resource entry lands, or `None` for kinds that belong
    /// inside an image file instead of the on-disk tree.
    pub fn destination_for(&self, kind: ResourceKind, file_name: &str, windows: bool) -> Option<PathBuf> {
        match kind {
            ResourceKind::Config => Some(self.conf_dir().join(file_name)),
            ResourceKind::NativeCmd => Some(self.bin_dir().join(file_name)),
            ResourceKind::NativeLib => Some(self.native_dir(file_name, windows).join(file_name)),
            ResourceKind::ClassOrResource | ResourceKind::Other => None,
        }
    }

    fn native_dir(&self, file_name: &str, windows: bool) -> PathBuf {
        if windows && WINDOWS_BIN_EXTENSIONS.iter().any(|ext| file_name.ends_with(ext)) {
            self.bin_dir()
        } else {
            self.lib_dir()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_dll_goes_to_bin_others_go_to_lib() {
        let layout = ImageLayout::new("/out");
        assert_eq!(
            layout.destination_for(ResourceKind::NativeLib, "foo.dll", true),
            Some(layout.bin_dir().join("foo.dll"))
        );
        assert_eq!(
            layout.destination_for(ResourceKind::NativeLib, "libfoo.so", true),
            Some(layout.lib_dir().join("libfoo.so"))
        );
    }

    #[test]
    fn posix_always_uses_lib_dir() {
        let layout = ImageLayout::new("/out");
        assert_eq!(
            layout.destination_for(ResourceKind::NativeLib, "foo.dll", false),
            Some(layout.lib_dir().join("foo.dll"))
        );
    }

    #[test]
    fn class_or_resource_has_no_disk_destination() {
        let layout = ImageLayout::new("/out");
        assert_eq!(layout.destination_for(ResourceKind::ClassOrResource, "A.class", false), None);
    }
}
