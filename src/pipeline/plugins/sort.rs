//! `sort-resources` sorter plugin (§4.8): moves entries whose path matches
//! a configured prefix list to the front, preserving relative order;
//! everything else keeps its original relative order after them.

use std::collections::HashMap;

use crate::error::Result;
use crate::pipeline::stage::{Category, NoopStage, Plugin, Stage};
use crate::pool::ResourcePool;

struct SortStage {
    prefixes: Vec<String>,
}

impl Stage for SortStage {
    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        let mut front = Vec::new();
        let mut rest = Vec::new();
        for entry in input.iter() {
            if self.prefixes.iter().any(|p| entry.path.starts_with(p.as_str())) {
                front.push(entry.clone());
            } else {
                rest.push(entry.clone());
            }
        }
        front.extend(rest);
        Ok(front.into_iter().collect())
    }
}

/// `sort-resources`.
pub struct SortResourcesPlugin;

impl Plugin for SortResourcesPlugin {
    fn name(&self) -> &'static str {
        "sort-resources"
    }
    fn category(&self) -> Category {
        Category::Sorter
    }
    fn configure(&self, enabled: bool, options: &HashMap<String, String>) -> Result<Box<dyn Stage>> {
        if !enabled {
            return Ok(Box::new(NoopStage));
        }
        let prefixes = options
            .get("order")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        Ok(Box::new(SortStage { prefixes }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceEntry;

    #[test]
    fn moves_matching_prefixes_to_front_preserving_relative_order() {
        let plugin = SortResourcesPlugin;
        let mut options = HashMap::new();
        options.insert("order".to_string(), "/java.base/".to_string());
        let stage = plugin.configure(true, &options).unwrap();

        let mut pool = ResourcePool::new();
        pool.add(ResourceEntry::meta_inf("z", "META-INF/x", vec![])).unwrap();
        pool.add(ResourceEntry::class_resource("java.base", "a/A.class", vec![])).unwrap();
        pool.add(ResourceEntry::meta_inf("z", "META-INF/y", vec![])).unwrap();
        pool.add(ResourceEntry::class_resource("java.base", "b/B.class", vec![])).unwrap();

        let out = stage.apply(&pool).unwrap();
        let paths: Vec<&str> = out.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/java.base/a/A.class", "/java.base/b/B.class", "META-INF/x", "META-INF/y"]);
    }
}
