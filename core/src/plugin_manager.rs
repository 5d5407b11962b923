//! file: core/src/plugin_manager.rs
//! description: dependency-ordered plugin loading and runtime queries,
//! modeled on the original's `PluginManager` (`src/core/plugin_manager.h`).

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::assembly::{Assembly, OpenFlags};
use crate::descriptor::{Descriptor, PluginReference};
use crate::local_index::LocalIndex;
use crate::package::PLUGIN_TYPE;

/// Conventional exported symbol a language module's shared library is
/// expected to carry. The core only locates it via `Assembly::find_symbol`;
/// it never calls through the returned address. See DESIGN.md.
const MODULE_INIT_SYMBOL: &str = "InitPlugifyLanguageModule";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    NotLoaded,
    Loaded,
    Running,
    Terminating,
    Unloaded,
    Error,
}

#[derive(Debug, Clone)]
pub struct PluginRecord {
    pub id: u64,
    pub name: String,
    pub version: i64,
    pub path: std::path::PathBuf,
    pub language: String,
    pub dependencies: Vec<PluginReference>,
    pub state: PluginState,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub name: String,
    pub path: PathBuf,
    pub language: String,
    pub library_directories: Vec<String>,
    pub state: PluginState,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct PluginManager {
    plugins: Vec<PluginRecord>,
    modules: Vec<ModuleRecord>,
}

impl PluginManager {
    /// Step 1-2: partitions the local index into modules/plugins and marks
    /// any plugin whose declared language module doesn't exist as `Error`.
    pub fn from_local_index(local: &LocalIndex) -> Self {
        let mut modules = Vec::new();
        let mut plugins = Vec::new();

        for pkg in local.iter() {
            if pkg.identity.kind != PLUGIN_TYPE {
                let library_directories = match &pkg.descriptor {
                    Descriptor::Module(descriptor) => descriptor.library_directories.clone(),
                    Descriptor::Plugin(_) => Vec::new(),
                };
                modules.push(ModuleRecord {
                    name: pkg.identity.name.clone(),
                    path: pkg.path.clone(),
                    language: pkg.identity.kind.clone(),
                    library_directories,
                    state: PluginState::NotLoaded,
                    error: None,
                });
            }
        }

        let mut next_id = 1u64;
        for pkg in local.iter() {
            if pkg.identity.kind != PLUGIN_TYPE {
                continue;
            }
            let Descriptor::Plugin(descriptor) = &pkg.descriptor else {
                continue;
            };
            let language = descriptor.language_module.name.clone();
            let dependencies = descriptor.dependencies.clone();

            let module_exists = modules.iter().any(|m| m.language == language);
            let (state, error) = if module_exists {
                (PluginState::NotLoaded, None)
            } else {
                (
                    PluginState::Error,
                    Some(format!("declared language module '{language}' was not found")),
                )
            };

            plugins.push(PluginRecord {
                id: next_id,
                name: pkg.identity.name.clone(),
                version: pkg.version,
                path: pkg.path.clone(),
                language,
                dependencies,
                state,
                error,
            });
            next_id += 1;
        }

        PluginManager { plugins, modules }
    }

    pub fn plugins(&self) -> &[PluginRecord] {
        &self.plugins
    }

    pub fn modules(&self) -> &[ModuleRecord] {
        &self.modules
    }

    /// Step 3: DFS cycle detection over non-optional dependency edges
    /// between plugins. Any plugin on a cycle transitions to `Error`.
    /// Step 4: topological sort of the remaining plugins.
    ///
    /// Returns the load order (names) of plugins that are neither already
    /// `Error` nor part of a cycle.
    pub fn resolve_load_order(&mut self) -> Vec<String> {
        let plugin_names: HashSet<String> = self.plugins.iter().map(|p| p.name.clone()).collect();
        let edges: HashMap<String, Vec<String>> = self
            .plugins
            .iter()
            .map(|p| {
                let deps = p
                    .dependencies
                    .iter()
                    .filter(|d| !d.optional && plugin_names.contains(&d.name))
                    .map(|d| d.name.clone())
                    .collect();
                (p.name.clone(), deps)
            })
            .collect();

        let cyclic = find_cyclic_nodes(&edges);
        for name in &cyclic {
            if let Some(plugin) = self.plugins.iter_mut().find(|p| &p.name == name) {
                plugin.state = PluginState::Error;
                plugin.error = Some("part of a dependency cycle".to_string());
            }
        }

        let eligible: Vec<&PluginRecord> = self
            .plugins
            .iter()
            .filter(|p| p.state != PluginState::Error)
            .collect();
        topological_sort(&eligible, &edges)
    }

    /// Steps 5-6: transitions modules used by `order` to `Loaded`, then
    /// plugins in `order` to `Loaded`, then all of them to `Running`.
    pub fn load_in_order(&mut self, order: &[String]) {
        for name in order {
            let language = self
                .plugins
                .iter()
                .find(|p| &p.name == name)
                .map(|p| p.language.clone());
            if let Some(language) = language {
                if let Some(module) = self.modules.iter_mut().find(|m| m.language == language) {
                    if module.state == PluginState::NotLoaded {
                        module.state = PluginState::Loaded;
                    }
                }
            }
            if let Some(plugin) = self.plugins.iter_mut().find(|p| &p.name == name) {
                if plugin.state == PluginState::NotLoaded {
                    plugin.state = PluginState::Loaded;
                }
            }
        }
        for name in order {
            if let Some(plugin) = self.plugins.iter_mut().find(|p| &p.name == name) {
                if plugin.state == PluginState::Loaded {
                    plugin.state = PluginState::Running;
                }
            }
        }
    }

    /// Shutdown reverses the load order: `Running` -> `Terminating` -> `Unloaded`.
    pub fn shutdown_in_order(&mut self, order: &[String]) {
        for name in order.iter().rev() {
            if let Some(plugin) = self.plugins.iter_mut().find(|p| &p.name == name) {
                if plugin.state == PluginState::Running {
                    plugin.state = PluginState::Terminating;
                }
            }
        }
        for name in order.iter().rev() {
            if let Some(plugin) = self.plugins.iter_mut().find(|p| &p.name == name) {
                if plugin.state == PluginState::Terminating {
                    plugin.state = PluginState::Unloaded;
                }
            }
        }
    }

    /// Opens the on-disk assembly for every `Loaded` module and locates its
    /// initialization entry point via the Assembly Loader. This is the one
    /// place the core touches a module's actual shared library: it never
    /// invokes the symbol it finds, only records whether one resolves.
    ///
    /// A module whose library can't be opened, or that doesn't export
    /// `InitPlugifyLanguageModule`, transitions to `Error`, and so does every
    /// plugin written in that module's language — mirroring the cascade
    /// `load_in_order` already applies when a plugin's language module is
    /// missing outright.
    pub fn locate_module_entry_points(&mut self) {
        let mut failed_languages = Vec::new();

        for module in &mut self.modules {
            if module.state != PluginState::Loaded {
                continue;
            }
            let candidates = candidate_library_paths(module);
            let mut last_err = None;
            let mut located = false;
            for path in &candidates {
                match Assembly::open_by_path(path, OpenFlags::default(), false) {
                    Ok(assembly) => {
                        if assembly.find_symbol(MODULE_INIT_SYMBOL).is_some() {
                            located = true;
                            break;
                        }
                        last_err = Some(format!(
                            "{} does not export '{MODULE_INIT_SYMBOL}'",
                            path.display()
                        ));
                    }
                    Err(e) => last_err = Some(e.to_string()),
                }
            }
            if !located {
                module.error = Some(last_err.unwrap_or_else(|| {
                    format!("no candidate library found for module '{}'", module.name)
                }));
                module.state = PluginState::Error;
                failed_languages.push(module.language.clone());
            }
        }

        for plugin in &mut self.plugins {
            if failed_languages.contains(&plugin.language) && plugin.state != PluginState::Error {
                plugin.state = PluginState::Error;
                plugin.error = Some(format!(
                    "language module '{}' failed to load",
                    plugin.language
                ));
            }
        }
    }

    pub fn find_by_name(&self, query: &str, case_insensitive_contains: bool) -> Option<&PluginRecord> {
        if case_insensitive_contains {
            let query = query.to_lowercase();
            self.plugins
                .iter()
                .find(|p| p.name.to_lowercase().contains(&query))
        } else {
            self.plugins.iter().find(|p| p.name == query)
        }
    }

    pub fn find_by_id(&self, id: u64) -> Option<&PluginRecord> {
        self.plugins.iter().find(|p| p.id == id)
    }

    pub fn find_by_path(&self, path: &std::path::Path) -> Option<&PluginRecord> {
        self.plugins.iter().find(|p| p.path == path)
    }

    /// Resolves a dependency reference to the plugin it names, honoring
    /// `requested_version` when present.
    pub fn find_by_reference(&self, reference: &PluginReference) -> Option<&PluginRecord> {
        self.plugins.iter().find(|p| {
            p.name == reference.name
                && reference
                    .requested_version
                    .map_or(true, |v| v == p.version)
        })
    }

    pub fn all(&self) -> &[PluginRecord] {
        &self.plugins
    }

    /// Direct, non-transitive dependency descriptors for `name`.
    pub fn direct_dependencies(&self, name: &str) -> Vec<PluginReference> {
        self.plugins
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.dependencies.clone())
            .unwrap_or_default()
    }

    /// Transitive dependency closure for `name`, visiting each dependency
    /// name at most once.
    pub fn transitive_dependencies(&self, name: &str) -> Vec<PluginReference> {
        let mut seen = HashSet::new();
        let mut stack: Vec<PluginReference> = self.direct_dependencies(name);
        let mut out = Vec::new();
        while let Some(dep) = stack.pop() {
            if !seen.insert(dep.name.clone()) {
                continue;
            }
            stack.extend(self.direct_dependencies(&dep.name));
            out.push(dep);
        }
        out
    }
}

/// Candidate on-disk locations for a module's shared library: either each of
/// its declared `library_directories` (resolved relative to the descriptor's
/// own directory), or that directory itself when none are declared.
fn candidate_library_paths(module: &ModuleRecord) -> Vec<PathBuf> {
    let suffix = crate::assembly::library_suffix();
    let filename = format!("{}.{suffix}", module.name);
    let descriptor_dir = module.path.parent().unwrap_or_else(|| std::path::Path::new("."));

    if module.library_directories.is_empty() {
        vec![descriptor_dir.join(&filename)]
    } else {
        module
            .library_directories
            .iter()
            .map(|dir| descriptor_dir.join(dir).join(&filename))
            .collect()
    }
}

fn find_cyclic_nodes(edges: &HashMap<String, Vec<String>>) -> HashSet<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks: HashMap<&str, Mark> = edges.keys().map(|k| (k.as_str(), Mark::Unvisited)).collect();
    let mut cyclic = HashSet::new();

    fn visit<'a>(
        node: &'a str,
        edges: &'a HashMap<String, Vec<String>>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        cyclic: &mut HashSet<String>,
    ) {
        match marks.get(node).copied().unwrap_or(Mark::Done) {
            Mark::Done => return,
            Mark::InProgress => {
                if let Some(pos) = stack.iter().position(|n| *n == node) {
                    for n in &stack[pos..] {
                        cyclic.insert(n.to_string());
                    }
                }
                return;
            }
            Mark::Unvisited => {}
        }
        marks.insert(node, Mark::InProgress);
        stack.push(node);
        if let Some(deps) = edges.get(node) {
            for dep in deps {
                visit(dep.as_str(), edges, marks, stack, cyclic);
            }
        }
        stack.pop();
        marks.insert(node, Mark::Done);
    }

    let keys: Vec<&str> = edges.keys().map(|k| k.as_str()).collect();
    for node in keys {
        let mut stack = Vec::new();
        visit(node, edges, &mut marks, &mut stack, &mut cyclic);
    }
    cyclic
}

/// Any stable order consistent with dependency edges (dependents load after
/// dependencies).
fn topological_sort(eligible: &[&PluginRecord], edges: &HashMap<String, Vec<String>>) -> Vec<String> {
    let eligible_names: HashSet<&str> = eligible.iter().map(|p| p.name.as_str()).collect();
    let mut visited = HashSet::new();
    let mut order = Vec::new();

    fn visit<'a>(
        node: &'a str,
        edges: &'a HashMap<String, Vec<String>>,
        eligible_names: &HashSet<&'a str>,
        visited: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) {
        if visited.contains(node) {
            return;
        }
        visited.insert(node.to_string());
        if let Some(deps) = edges.get(node) {
            for dep in deps {
                if eligible_names.contains(dep.as_str()) {
                    visit(dep.as_str(), edges, eligible_names, visited, order);
                }
            }
        }
        order.push(node.to_string());
    }

    for plugin in eligible {
        visit(&plugin.name, edges, &eligible_names, &mut visited, &mut order);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Descriptor, LanguageModuleDescriptor, LanguageModuleRef, PluginDescriptor, PluginReference};
    use crate::package::{LocalPackage, PackageIdentity};
    use std::path::PathBuf;

    fn make_local_index(packages: Vec<LocalPackage>) -> LocalIndex {
        let mut index = LocalIndex::default();
        for p in packages {
            index.insert_with_conflict_resolution(p);
        }
        index
    }

    fn module(name: &str, lang: &str) -> LocalPackage {
        LocalPackage {
            identity: PackageIdentity {
                name: name.to_string(),
                kind: lang.to_string(),
            },
            path: PathBuf::from(format!("/tmp/{name}.module")),
            version: 0,
            descriptor: Descriptor::Module(LanguageModuleDescriptor {
                file_version: 1,
                version: 0,
                friendly_name: name.to_string(),
                description: String::new(),
                created_by: String::new(),
                created_by_url: String::new(),
                docs_url: String::new(),
                download_url: String::new(),
                support_url: String::new(),
                update_url: None,
                language: lang.to_string(),
                supported_platforms: vec![],
                library_directories: vec![],
            }),
        }
    }

    fn plugin(name: &str, lang: &str, deps: &[&str]) -> LocalPackage {
        LocalPackage {
            identity: PackageIdentity {
                name: name.to_string(),
                kind: PLUGIN_TYPE.to_string(),
            },
            path: PathBuf::from(format!("/tmp/{name}.plugin")),
            version: 0,
            descriptor: Descriptor::Plugin(PluginDescriptor {
                file_version: 1,
                version: 0,
                friendly_name: name.to_string(),
                description: String::new(),
                created_by: String::new(),
                created_by_url: String::new(),
                docs_url: String::new(),
                download_url: String::new(),
                support_url: String::new(),
                update_url: None,
                entry_point: name.to_string(),
                supported_platforms: vec![],
                resource_directories: vec![],
                language_module: LanguageModuleRef { name: lang.to_string() },
                dependencies: deps
                    .iter()
                    .map(|d| PluginReference {
                        name: d.to_string(),
                        requested_version: None,
                        optional: false,
                        supported_platforms: vec![],
                    })
                    .collect(),
                exported_methods: vec![],
            }),
        }
    }

    #[test]
    fn scenario_1_single_plugin_loads_to_running() {
        let index = make_local_index(vec![module("modA", "lua"), plugin("pluginA", "lua", &[])]);
        let mut pm = PluginManager::from_local_index(&index);
        let order = pm.resolve_load_order();
        pm.load_in_order(&order);
        let record = pm.find_by_name("pluginA", false).unwrap();
        assert_eq!(record.state, PluginState::Running);
    }

    #[test]
    fn missing_language_module_transitions_plugin_to_error() {
        let index = make_local_index(vec![plugin("pluginA", "py", &[])]);
        let pm = PluginManager::from_local_index(&index);
        let record = pm.find_by_name("pluginA", false).unwrap();
        assert_eq!(record.state, PluginState::Error);
    }

    #[test]
    fn scenario_5_cyclic_dependency_transitions_both_to_error() {
        let index = make_local_index(vec![
            module("modA", "lua"),
            plugin("A", "lua", &["B"]),
            plugin("B", "lua", &["A"]),
        ]);
        let mut pm = PluginManager::from_local_index(&index);
        let order = pm.resolve_load_order();
        assert!(order.is_empty());
        assert_eq!(pm.find_by_name("A", false).unwrap().state, PluginState::Error);
        assert_eq!(pm.find_by_name("B", false).unwrap().state, PluginState::Error);
    }

    #[test]
    fn topological_order_respects_dependency_edges() {
        let index = make_local_index(vec![
            module("modA", "lua"),
            plugin("base", "lua", &[]),
            plugin("dependent", "lua", &["base"]),
        ]);
        let mut pm = PluginManager::from_local_index(&index);
        let order = pm.resolve_load_order();
        let base_pos = order.iter().position(|n| n == "base").unwrap();
        let dependent_pos = order.iter().position(|n| n == "dependent").unwrap();
        assert!(base_pos < dependent_pos);
    }

    #[test]
    fn isolated_plugin_error_does_not_affect_unrelated_plugins() {
        let index = make_local_index(vec![
            module("modA", "lua"),
            plugin("broken", "missing-lang", &[]),
            plugin("fine", "lua", &[]),
        ]);
        let mut pm = PluginManager::from_local_index(&index);
        let order = pm.resolve_load_order();
        pm.load_in_order(&order);
        assert_eq!(pm.find_by_name("broken", false).unwrap().state, PluginState::Error);
        assert_eq!(pm.find_by_name("fine", false).unwrap().state, PluginState::Running);
    }

    #[test]
    fn locate_module_entry_points_errors_out_a_module_with_no_library_on_disk() {
        let index = make_local_index(vec![module("modA", "lua"), plugin("pluginA", "lua", &[])]);
        let mut pm = PluginManager::from_local_index(&index);
        let order = pm.resolve_load_order();
        pm.load_in_order(&order);
        assert_eq!(pm.find_by_name("pluginA", false).unwrap().state, PluginState::Running);

        pm.locate_module_entry_points();
        assert_eq!(pm.modules()[0].state, PluginState::Error);
        assert_eq!(pm.find_by_name("pluginA", false).unwrap().state, PluginState::Error);
    }

    #[test]
    fn locate_module_entry_points_leaves_unrelated_languages_alone() {
        let index = make_local_index(vec![
            module("modA", "lua"),
            module("modB", "py"),
            plugin("pluginA", "lua", &[]),
            plugin("pluginB", "py", &[]),
        ]);
        let mut pm = PluginManager::from_local_index(&index);
        let order = pm.resolve_load_order();
        pm.load_in_order(&order);
        pm.locate_module_entry_points();
        // Neither "lua" nor "py" has a real library on disk in this fixture,
        // so both modules error out, but independently of one another: a
        // fix to one candidate path resolution must not mask the other.
        assert_eq!(pm.find_by_name("pluginA", false).unwrap().state, PluginState::Error);
        assert_eq!(pm.find_by_name("pluginB", false).unwrap().state, PluginState::Error);
    }

    #[test]
    fn transitive_dependencies_include_the_full_chain() {
        let index = make_local_index(vec![
            module("modA", "lua"),
            plugin("c", "lua", &[]),
            plugin("b", "lua", &["c"]),
            plugin("a", "lua", &["b"]),
        ]);
        let pm = PluginManager::from_local_index(&index);
        let mut transitive: Vec<String> = pm
            .transitive_dependencies("a")
            .into_iter()
            .map(|d| d.name)
            .collect();
        transitive.sort();
        assert_eq!(transitive, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn find_by_reference_resolves_by_name_and_honors_requested_version() {
        let index = make_local_index(vec![module("modA", "lua"), plugin("pluginA", "lua", &[])]);
        let pm = PluginManager::from_local_index(&index);

        let any_version = PluginReference {
            name: "pluginA".to_string(),
            requested_version: None,
            optional: false,
            supported_platforms: vec![],
        };
        assert!(pm.find_by_reference(&any_version).is_some());

        let wrong_version = PluginReference {
            name: "pluginA".to_string(),
            requested_version: Some(99),
            optional: false,
            supported_platforms: vec![],
        };
        assert!(pm.find_by_reference(&wrong_version).is_none());
    }

    #[test]
    fn direct_dependencies_retain_the_full_reference_descriptor() {
        let index = make_local_index(vec![
            module("modA", "lua"),
            plugin("base", "lua", &[]),
            plugin("dependent", "lua", &["base"]),
        ]);
        let pm = PluginManager::from_local_index(&index);
        let deps = pm.direct_dependencies("dependent");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "base");
        assert!(!deps[0].optional);
    }
}
