//! `exclude-resources` / `exclude-files` filter plugins (§4.8).
//!
//! Globs: `*` matches within one path segment, `**` spans segments, a
//! leading `^` anchors the match to the start of the path. Hand-rolled
//! rather than the `glob` crate, which matches real filesystem paths and
//! has no equivalent of the `^` anchor this format defines.

use std::collections::HashMap;

use crate::error::{LinkError, Result};
use crate::model::ResourceKind;
use crate::pipeline::stage::{Category, NoopStage, Plugin, Stage};
use crate::pool::ResourcePool;

fn segment_matches(seg: &[u8], pat: &[u8]) -> bool {
    match (seg, pat) {
        ([], []) => true,
        ([], [b'*', rest @ ..]) => segment_matches([].as_slice(), rest),
        ([], _) => false,
        (_, [b'*', rest @ ..]) => segment_matches(&seg[1..], pat) || segment_matches(seg, rest),
        ([c, srest @ ..], [p, prest @ ..]) if c == p => segment_matches(srest, prest),
        _ => false,
    }
}

fn match_segments(path_segs: &[&str], pat_segs: &[&str]) -> bool {
    match pat_segs.split_first() {
        None => path_segs.is_empty(),
        Some((&"**", rest)) => {
            if match_segments(path_segs, rest) {
                return true;
            }
            match path_segs.split_first() {
                Some((_, path_rest)) => match_segments(path_rest, pat_segs),
                None => false,
            }
        }
        Some((p, rest)) => match path_segs.split_first() {
            Some((s, path_rest)) if segment_matches(s.as_bytes(), p.as_bytes()) => match_segments(path_rest, rest),
            _ => false,
        },
    }
}

/// Whether `path` matches the exclude glob `pattern`.
pub fn glob_matches(path: &str, pattern: &str) -> bool {
    let anchored = pattern.starts_with('^');
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    let pat_segs: Vec<&str> = pattern.trim_start_matches('/').split('/').collect();
    let path_segs: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    if anchored {
        match_segments(&path_segs, &pat_segs)
    } else {
        (0..=path_segs.len()).any(|start| match_segments(&path_segs[start..], &pat_segs))
    }
}

fn parse_globs(options: &HashMap<String, String>) -> Vec<String> {
    options
        .get("exclude")
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

struct ExcludeStage {
    globs: Vec<String>,
    non_class_only: bool,
}

impl Stage for ExcludeStage {
    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        let mut out = ResourcePool::new();
        for entry in input.iter() {
            let is_class = entry.kind == ResourceKind::ClassOrResource && entry.path.ends_with(".class");
            let scoped = !self.non_class_only || !is_class;
            let matches = scoped && self.globs.iter().any(|g| glob_matches(&entry.path, g));
            if !matches {
                out.add(entry.clone())?;
            }
        }
        Ok(out)
    }
}

/// `exclude-resources`: removes entries matching any configured glob,
/// regardless of kind.
pub struct ExcludeResourcesPlugin;

impl Plugin for ExcludeResourcesPlugin {
    fn name(&self) -> &'static str {
        "exclude-resources"
    }
    fn category(&self) -> Category {
        Category::Filter
    }
    fn configure(&self, enabled: bool, options: &HashMap<String, String>) -> Result<Box<dyn Stage>> {
        if !enabled {
            return Ok(Box::new(NoopStage));
        }
        let globs = parse_globs(options);
        if globs.is_empty() {
            return Err(LinkError::PluginConfig("exclude-resources: missing 'exclude' option".to_string()));
        }
        Ok(Box::new(ExcludeStage { globs, non_class_only: false }))
    }
}

/// `exclude-files`: same glob matching, scoped to non-class resources.
pub struct ExcludeFilesPlugin;

impl Plugin for ExcludeFilesPlugin {
    fn name(&self) -> &'static str {
        "exclude-files"
    }
    fn category(&self) -> Category {
        Category::Filter
    }
    fn configure(&self, enabled: bool, options: &HashMap<String, String>) -> Result<Box<dyn Stage>> {
        if !enabled {
            return Ok(Box::new(NoopStage));
        }
        let globs = parse_globs(options);
        if globs.is_empty() {
            return Err(LinkError::PluginConfig("exclude-files: missing 'exclude' option".to_string()));
        }
        Ok(Box::new(ExcludeStage { globs, non_class_only: true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceEntry;

    #[test]
    fn star_matches_within_segment_only() {
        assert!(glob_matches("a.jcov", "*.jcov"));
        assert!(!glob_matches("a/b.jcov", "*.jcov"));
    }

    #[test]
    fn double_star_spans_segments() {
        assert!(glob_matches("a/META-INF/services/X", "**/META-INF/**"));
        assert!(glob_matches("META-INF/services/X", "**/META-INF/**"));
    }

    #[test]
    fn anchor_requires_exact_prefix() {
        assert!(glob_matches("mod/path/x.class", "^/mod/path/*"));
        assert!(!glob_matches("other/mod/path/x.class", "^/mod/path/*"));
    }

    #[test]
    fn exclude_resources_removes_matching_entries() {
        let plugin = ExcludeResourcesPlugin;
        let mut options = HashMap::new();
        options.insert("exclude".to_string(), "*.jcov,**/META-INF/**".to_string());
        let stage = plugin.configure(true, &options).unwrap();

        let mut pool = ResourcePool::new();
        pool.add(ResourceEntry::meta_inf("a", "a.jcov", vec![])).unwrap();
        pool.add(ResourceEntry::meta_inf("a", "META-INF/services/x", vec![])).unwrap();
        pool.add(ResourceEntry::class_resource("a", "pkg/Main.class", vec![])).unwrap();

        let out = stage.apply(&pool).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.iter().next().unwrap().path, "/a/pkg/Main.class");
    }
}
