//! file: core/src/local_index.rs
//! description: on-disk discovery of installed packages, modeled on the
//! original's `PackageManager::LoadLocalPackages` (`src/core/package_manager.cpp`).

use std::collections::HashMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::descriptor::{Descriptor, LanguageModuleDescriptor, PluginDescriptor};
use crate::package::{LocalPackage, PackageIdentity, PLUGIN_TYPE};
use crate::platform::Platform;

pub const PLUGIN_EXTENSION: &str = "plugin";
pub const MODULE_EXTENSION: &str = "module";

#[derive(Debug, Default)]
pub struct LocalIndex {
    packages: HashMap<String, LocalPackage>,
}

impl LocalIndex {
    pub fn get(&self, name: &str) -> Option<&LocalPackage> {
        self.packages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalPackage> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn remove(&mut self, name: &str) -> Option<LocalPackage> {
        self.packages.remove(name)
    }

    pub fn find_by_kind(&self, kind: &str) -> Option<&LocalPackage> {
        self.packages.values().find(|p| p.identity.kind == kind)
    }

    /// Walks `base_dir` to a max depth of 3, keeping only depth-1 entries,
    /// parsing `.plugin`/`.module` files and resolving same-name conflicts.
    /// Parse/validation failures are logged and skipped; they never fail
    /// the overall load.
    pub fn load(base_dir: &Path, platform: &Platform) -> Self {
        let mut index = LocalIndex::default();

        for entry in WalkDir::new(base_dir)
            .max_depth(3)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.depth() != 1 || !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = match path.extension().and_then(|e| e.to_str()) {
                Some(e) => e,
                None => continue,
            };
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s.to_string(),
                None => continue,
            };

            let parsed = if ext == PLUGIN_EXTENSION {
                parse_plugin(path, &stem, platform)
            } else if ext == MODULE_EXTENSION {
                parse_module(path, &stem, platform)
            } else {
                continue;
            };

            let Some(package) = parsed else { continue };
            if !package.descriptor.matches_platform(platform) {
                continue;
            }

            index.insert_with_conflict_resolution(package);
        }

        index
    }

    pub(crate) fn insert_with_conflict_resolution(&mut self, incoming: LocalPackage) {
        let name = incoming.identity.name.clone();
        match self.packages.get(&name) {
            None => {
                self.packages.insert(name, incoming);
            }
            Some(existing) => {
                if incoming.version > existing.version {
                    log::warn!(
                        "By default, prioritizing newer version (v{}) of '{}' package...",
                        incoming.version,
                        name
                    );
                    self.packages.insert(name, incoming);
                } else if incoming.version == existing.version {
                    log::warn!(
                        "The same version (v{}) of package '{}' exists at '{}' - second location will be ignored.",
                        incoming.version,
                        name,
                        incoming.path.display()
                    );
                } else {
                    log::warn!(
                        "By default, prioritizing newer version (v{}) of '{}' package...",
                        existing.version,
                        name
                    );
                }
            }
        }
    }
}

fn parse_plugin(path: &Path, stem: &str, platform: &Platform) -> Option<LocalPackage> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            log::error!("failed to read plugin descriptor {}: {e}", path.display());
            return None;
        }
    };
    let raw: PluginDescriptor = match serde_json::from_slice(&bytes) {
        Ok(d) => d,
        Err(e) => {
            log::error!("failed to parse plugin descriptor {}: {e}", path.display());
            return None;
        }
    };
    let (descriptor, deps_had_dupes, methods_had_dupes, errors) =
        raw.normalize_and_validate(platform);
    if deps_had_dupes {
        log::warn!("{}: duplicate dependency names collapsed to first occurrence", path.display());
    }
    if methods_had_dupes {
        log::warn!("{}: duplicate exported method names collapsed to first occurrence", path.display());
    }
    if !errors.is_empty() {
        log::error!("plugin descriptor {} failed validation:\n{errors}", path.display());
        return None;
    }
    let version = descriptor.version;
    Some(LocalPackage {
        identity: PackageIdentity {
            name: stem.to_string(),
            kind: PLUGIN_TYPE.to_string(),
        },
        path: path.to_path_buf(),
        version,
        descriptor: Descriptor::Plugin(descriptor),
    })
}

fn parse_module(path: &Path, stem: &str, _platform: &Platform) -> Option<LocalPackage> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            log::error!("failed to read module descriptor {}: {e}", path.display());
            return None;
        }
    };
    let descriptor: LanguageModuleDescriptor = match serde_json::from_slice(&bytes) {
        Ok(d) => d,
        Err(e) => {
            log::error!("failed to parse module descriptor {}: {e}", path.display());
            return None;
        }
    };
    let errors = descriptor.validate();
    if !errors.is_empty() {
        log::error!("module descriptor {} failed validation:\n{errors}", path.display());
        return None;
    }
    let version = descriptor.version;
    let kind = descriptor.language.clone();
    Some(LocalPackage {
        identity: PackageIdentity {
            name: stem.to_string(),
            kind,
        },
        path: path.to_path_buf(),
        version,
        descriptor: Descriptor::Module(descriptor),
    })
}
