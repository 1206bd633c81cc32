//! `compact-cp` transformer plugin (§4.8): rebuilds class constant pools
//! to share UTF-8 entries across classes via an external shared-string
//! section referenced by a synthetic indirection.
//!
//! Like `strip-java-debug`, constant-pool surgery is classfile-format work
//! external to this crate; the actual rewrite is delegated to an injected
//! [`ConstantPoolCompactor`]. This plugin owns the cross-class sharing
//! policy: collecting every class's bytes for one invocation, handing them
//! to the compactor together (so it can observe repeats across classes),
//! and emitting the compactor's shared-string blob as a synthetic pool
//! entry the image builder places alongside the per-loader module-info
//! blob.
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{ResourceEntry, ResourceKind};
use crate::pipeline::stage::{Category, NoopStage, Plugin, Stage};
use crate::pool::ResourcePool;

/// Path of the synthetic entry holding the shared UTF-8 section, read back
/// by a class loader via the synthetic indirection `compact-cp` writes
/// into each rewritten class's constant pool.
pub const SHARED_STRINGS_PATH: &str = "/compact-cp/shared-strings";

/// Rewrites a batch of class files to share UTF-8 constant-pool entries.
/// An opaque collaborator; this crate carries no constant-pool codec.
pub trait ConstantPoolCompactor: Send + Sync {
    /// Given every class's `(path, bytes)` in one invocation, return the
    /// rewritten classes (same order) plus one shared-string blob every
    /// rewritten class's synthetic indirection now points into.
    fn compact(&self, classes: &[(String, Vec<u8>)]) -> Result<(Vec<Vec<u8>>, Vec<u8>)>;
}

struct CompactCpStage {
    compactor: Arc<dyn ConstantPoolCompactor>,
}

impl Stage for CompactCpStage {
    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        let classes: Vec<(String, Vec<u8>)> = input
            .iter()
            .filter(|e| e.kind == ResourceKind::ClassOrResource && e.path.ends_with(".class"))
            .map(|e| (e.path.clone(), e.bytes.clone()))
            .collect();

        let (rewritten, shared_blob) = self.compactor.compact(&classes)?;
        let rewritten_by_path: HashMap<&str, &Vec<u8>> =
            classes.iter().map(|(p, _)| p.as_str()).zip(rewritten.iter()).collect();

        let mut out = ResourcePool::new();
        for entry in input.iter() {
            if let Some(&bytes) = rewritten_by_path.get(entry.path.as_str()) {
                let mut rewritten_entry = entry.clone();
                rewritten_entry.bytes = bytes.clone();
                out.add(rewritten_entry)?;
            } else {
                out.add(entry.clone())?;
            }
        }
        if !shared_blob.is_empty() {
            out.add(ResourceEntry {
                module: String::new(),
                path: SHARED_STRINGS_PATH.to_string(),
                bytes: shared_blob,
                kind: ResourceKind::Other,
            })?;
        }
        Ok(out)
    }
}

/// `compact-cp`.
pub struct CompactCpPlugin {
    compactor: Arc<dyn ConstantPoolCompactor>,
}

impl CompactCpPlugin {
    /// Build the plugin around an injected constant-pool compactor.
    pub fn new(compactor: Arc<dyn ConstantPoolCompactor>) -> Self {
        CompactCpPlugin { compactor }
    }
}

impl Plugin for CompactCpPlugin {
    fn name(&self) -> &'static str {
        "compact-cp"
    }
    fn category(&self) -> Category {
        Category::Transformer
    }
    fn configure(&self, enabled: bool, _options: &HashMap<String, String>) -> Result<Box<dyn Stage>> {
        if !enabled {
            return Ok(Box::new(NoopStage));
        }
        Ok(Box::new(CompactCpStage { compactor: self.compactor.clone() }))
    }
}
