//! `strip-java-debug` transformer plugin (§4.8): drops
//! `LineNumberTable`, `LocalVariableTable`, `LocalVariableTypeTable`,
//! `SourceFile`, and `SourceDebugExtension` attributes from class files.
//!
//! Parsing and rewriting the class file attribute table is itself a
//! classfile-format concern, the same category of work as the
//! `read_module_info` descriptor parser that §1 treats as an external
//! collaborator; this plugin is generic over a [`ClassfileEditor`] the
//! embedder supplies, rather than carrying its own bytecode parser.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::model::ResourceKind;
use crate::pipeline::stage::{Category, NoopStage, Plugin, Stage};
use crate::pool::ResourcePool;

/// Attribute names this plugin always strips.
pub const DEBUG_ATTRIBUTE_NAMES: &[&str] =
    &["LineNumberTable", "LocalVariableTable", "LocalVariableTypeTable", "SourceFile", "SourceDebugExtension"];

/// Rewrites a single class file's attribute table. An opaque collaborator;
/// this crate carries no classfile parser of its own.
pub trait ClassfileEditor: Send + Sync {
    /// Return `class_bytes` with every attribute named in `names` removed
    /// from every method, field, and the class itself.
    fn strip_attributes(&self, class_bytes: &[u8], names: &[&str]) -> Result<Vec<u8>>;
}

struct StripDebugStage {
    editor: Arc<dyn ClassfileEditor>,
}

impl Stage for StripDebugStage {
    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        let mut out = ResourcePool::new();
        for entry in input.iter() {
            let mut rewritten = entry.clone();
            if entry.kind == ResourceKind::ClassOrResource && entry.path.ends_with(".class") {
                rewritten.bytes = self.editor.strip_attributes(&entry.bytes, DEBUG_ATTRIBUTE_NAMES)?;
            }
            out.add(rewritten)?;
        }
        Ok(out)
    }
}

/// `strip-java-debug`.
pub struct StripJavaDebugPlugin {
    editor: Arc<dyn ClassfileEditor>,
}

impl StripJavaDebugPlugin {
    /// Build the plugin around an injected classfile editor.
    pub fn new(editor: Arc<dyn ClassfileEditor>) -> Self {
        StripJavaDebugPlugin { editor }
    }
}

impl Plugin for StripJavaDebugPlugin {
    fn name(&self) -> &'static str {
        "strip-java-debug"
    }
    fn category(&self) -> Category {
        Category::Transformer
    }
    fn configure(&self, enabled: bool, _options: &HashMap<String, String>) -> Result<Box<dyn Stage>> {
        if !enabled {
            return Ok(Box::new(NoopStage));
        }
        Ok(Box::new(StripDebugStage { editor: self.editor.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceEntry;

    struct FakeEditor;

    impl ClassfileEditor for FakeEditor {
        fn strip_attributes(&self, class_bytes: &[u8], names: &[&str]) -> Result<Vec<u8>> {
            // A fake class "format": a newline-joined attribute-name list;
            // stripping removes lines naming an attribute in `names`.
            let text = String::from_utf8_lossy(class_bytes);
            let kept: Vec<&str> = text.lines().filter(|line| !names.contains(line)).collect();
            Ok(kept.join("\n").into_bytes())
        }
    }

    #[test]
    fn strips_configured_debug_attributes() {
        let plugin = StripJavaDebugPlugin::new(Arc::new(FakeEditor));
        let stage = plugin.configure(true, &HashMap::new()).unwrap();

        let mut pool = ResourcePool::new();
        let bytes = "Code\nLineNumberTable\nSourceFile".as_bytes().to_vec();
        pool.add(ResourceEntry::class_resource("m", "A.class", bytes)).unwrap();

        let out = stage.apply(&pool).unwrap();
        let entry = out.get("m", "/m/A.class").unwrap();
        let text = String::from_utf8_lossy(&entry.bytes);
        assert!(!text.contains("LineNumberTable"));
        assert!(!text.contains("SourceFile"));
        assert!(text.contains("Code"));
    }
}
