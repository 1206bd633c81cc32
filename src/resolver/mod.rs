//! Module resolver (§4.6): worklist closure over `requires` plus a
//! transitive readability closure over `requires public`.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::error::{LinkError, Result};
use crate::finder::ModuleFinder;
use crate::model::ModuleDescriptor;

/// The output of resolving a root set: the selected modules plus the
/// readability relation between them.
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    /// Selected module descriptors, keyed by name.
    pub selected: HashMap<String, ModuleDescriptor>,
    /// `reader -> set of modules it can read`, transitively closed over
    /// `public` edges. Irreflexive as stored (§8): a module is not listed
    /// as reading itself even though it implicitly can.
    pub readability: HashMap<String, BTreeSet<String>>,
}

impl ResolvedGraph {
    /// Selected module names, in no particular order.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.selected.keys().map(String::as_str)
    }
}

/// Resolve `roots` against `finder` into a [`ResolvedGraph`].
pub fn resolve(finder: &dyn ModuleFinder, roots: &[String]) -> Result<ResolvedGraph> {
    let selected = close_requires(finder, roots)?;
    detect_requires_cycle(&selected)?;
    let readability = close_readability(&selected);
    Ok(ResolvedGraph { selected, readability })
}

/// Reject a `requires` cycle (§9: "rejected at resolve time with a format
/// error"). Depth-first search over direct `requires` edges restricted to
/// the selected set.
fn detect_requires_cycle(selected: &HashMap<String, ModuleDescriptor>) -> Result<()> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        InProgress,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        name: &'a str,
        selected: &'a HashMap<String, ModuleDescriptor>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Result<()> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                stack.push(name);
                let cycle = stack.join(" -> ");
                return Err(LinkError::format(format!("requires cycle: {cycle}")));
            }
            None => {}
        }
        marks.insert(name, Mark::InProgress);
        stack.push(name);
        if let Some(descriptor) = selected.get(name) {
            for dep in &descriptor.dependences {
                if selected.contains_key(&dep.target_name) {
                    visit(&dep.target_name, selected, marks, stack)?;
                }
            }
        }
        stack.pop();
        marks.insert(name, Mark::Done);
        Ok(())
    }

    for name in selected.keys() {
        let mut stack = Vec::new();
        visit(name, selected, &mut marks, &mut stack)?;
    }
    Ok(())
}

/// Step 1: worklist closure over direct `requires` edges (§4.6 algorithm).
fn close_requires(finder: &dyn ModuleFinder, roots: &[String]) -> Result<HashMap<String, ModuleDescriptor>> {
    let mut selected: HashMap<String, ModuleDescriptor> = HashMap::new();
    let mut queue: VecDeque<(String, Option<String>, bool)> =
        roots.iter().map(|r| (r.clone(), None, false)).collect();

    while let Some((name, required_by, optional)) = queue.pop_front() {
        if selected.contains_key(&name) {
            continue;
        }
        let artifact = match finder.find(&name)? {
            Some(a) => a,
            None if optional => continue,
            None => {
                return Err(LinkError::ModuleNotFound {
                    module: name,
                    required_by: required_by.unwrap_or_else(|| "<root>".to_string()),
                });
            }
        };
        let descriptor = artifact.descriptor;
        for dep in &descriptor.dependences {
            queue.push_back((dep.target_name.clone(), Some(descriptor.name.clone()), dep.is_optional()));
        }
        selected.insert(descriptor.name.clone(), descriptor);
    }

    Ok(selected)
}

/// Step 2: fixed-point bitset-per-module closure over `public` edges.
///
/// Represented as `HashMap<String, BTreeSet<String>>` rather than an
/// actual bitset: module counts in a single link are small enough that the
/// asymptotic difference doesn't matter, and the ordered set keeps
/// readability output deterministic without a separate index pass.
fn close_readability(selected: &HashMap<String, ModuleDescriptor>) -> HashMap<String, BTreeSet<String>> {
    let mut readability: HashMap<String, BTreeSet<String>> = HashMap::new();
    for (name, descriptor) in selected {
        let direct: BTreeSet<String> = descriptor
            .dependences
            .iter()
            .filter(|d| selected.contains_key(&d.target_name))
            .map(|d| d.target_name.clone())
            .collect();
        readability.insert(name.clone(), direct);
    }

    let public_edge = |from: &str, to: &str| -> bool {
        selected
            .get(from)
            .map(|d| d.dependences.iter().any(|dep| dep.target_name == to && dep.is_public()))
            .unwrap_or(false)
    };

    loop {
        let mut changed = false;
        let names: Vec<String> = readability.keys().cloned().collect();
        for name in &names {
            let current: Vec<String> = readability[name].iter().cloned().collect();
            for target in &current {
                if !public_edge(name, target) {
                    continue;
                }
                let transitive: Vec<String> = readability.get(target).into_iter().flatten().cloned().collect();
                let set = readability.get_mut(name).unwrap();
                for t in transitive {
                    if t != *name && set.insert(t) {
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    readability
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as LResult;
    use crate::model::{ArtifactShape, Dependence, ModuleArtifact};
    use std::collections::HashMap as Map;
    use std::sync::Mutex;

    struct MapFinder(Mutex<Map<String, ModuleDescriptor>>);

    impl ModuleFinder for MapFinder {
        fn find(&self, name: &str) -> LResult<Option<ModuleArtifact>> {
            Ok(self.0.lock().unwrap().get(name).cloned().map(|descriptor| ModuleArtifact {
                descriptor,
                packages: Default::default(),
                location: name.to_string(),
                shape: ArtifactShape::Expanded,
            }))
        }
        fn all(&self) -> LResult<Vec<ModuleArtifact>> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .values()
                .cloned()
                .map(|descriptor| ModuleArtifact {
                    descriptor,
                    packages: Default::default(),
                    location: String::new(),
                    shape: ArtifactShape::Expanded,
                })
                .collect())
        }
    }

    fn descriptor(name: &str, deps: Vec<Dependence>) -> ModuleDescriptor {
        ModuleDescriptor {
            name: name.to_string(),
            version: None,
            dependences: deps.into_iter().collect(),
            exports: Default::default(),
            uses: Default::default(),
            provides: Default::default(),
            main_class: None,
            conceals: Default::default(),
        }
    }

    #[test]
    fn minimal_resolve() {
        let mut modules = Map::new();
        modules.insert("a".to_string(), descriptor("a", vec![]));
        let finder = MapFinder(Mutex::new(modules));

        let graph = resolve(&finder, &["a".to_string()]).unwrap();
        assert_eq!(graph.selected.len(), 1);
        assert!(graph.selected.contains_key("a"));
    }

    #[test]
    fn public_reexport_extends_readability() {
        let mut modules = Map::new();
        modules.insert("a".to_string(), descriptor("a", vec![Dependence::new("b").public()]));
        modules.insert("b".to_string(), descriptor("b", vec![Dependence::new("c")]));
        modules.insert("c".to_string(), descriptor("c", vec![]));
        let finder = MapFinder(Mutex::new(modules));

        let graph = resolve(&finder, &["a".to_string()]).unwrap();
        assert_eq!(graph.selected.len(), 3);
        assert!(graph.readability["a"].contains("c"));
    }

    #[test]
    fn optional_missing_is_not_an_error() {
        let mut modules = Map::new();
        modules.insert("a".to_string(), descriptor("a", vec![Dependence::new("z").optional()]));
        let finder = MapFinder(Mutex::new(modules));

        let graph = resolve(&finder, &["a".to_string()]).unwrap();
        assert_eq!(graph.selected.len(), 1);
    }

    #[test]
    fn missing_required_module_fails() {
        let mut modules = Map::new();
        modules.insert("a".to_string(), descriptor("a", vec![Dependence::new("z")]));
        let finder = MapFinder(Mutex::new(modules));

        let err = resolve(&finder, &["a".to_string()]).unwrap_err();
        assert!(matches!(err, LinkError::ModuleNotFound { .. }));
    }

    #[test]
    fn requires_cycle_is_rejected() {
        let mut modules = Map::new();
        modules.insert("a".to_string(), descriptor("a", vec![Dependence::new("b")]));
        modules.insert("b".to_string(), descriptor("b", vec![Dependence::new("a")]));
        let finder = MapFinder(Mutex::new(modules));

        let err = resolve(&finder, &["a".to_string()]).unwrap_err();
        assert!(matches!(err, LinkError::Format { .. }));
    }
}
