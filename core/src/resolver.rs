//! file: core/src/resolver.rs
//! description: dependency resolution producing `missing`/`conflicted` sets,
//! modeled on the original's `PackageManager::FindDependencies`
//! .

use std::collections::HashMap;

use crate::descriptor::Descriptor;
use crate::local_index::LocalIndex;
use crate::package::PLUGIN_TYPE;
use crate::platform::Platform;
use crate::remote_index::RemoteIndex;

/// A requirement on a remote package: `None` means "any version (latest)".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub requested_version: Option<i64>,
}

#[derive(Debug, Default)]
pub struct ResolverOutcome {
    pub missing: HashMap<String, Requirement>,
    pub conflicted: Vec<String>,
}

/// Merges a newly discovered requirement for `name` into `missing`: a
/// higher pinned version wins; a specific pin beats "latest". Both cases
/// log a warning.
fn merge_requirement(missing: &mut HashMap<String, Requirement>, name: &str, new_req: Requirement) {
    match missing.get_mut(name) {
        None => {
            missing.insert(name.to_string(), new_req);
        }
        Some(existing) => match (&existing.requested_version, &new_req.requested_version) {
            (Some(a), Some(b)) if a != b => {
                log::warn!(
                    "conflicting requested versions for '{name}': {a} vs {b}, keeping the higher"
                );
                if *b > *a {
                    existing.requested_version = Some(*b);
                }
            }
            (None, Some(_)) => {
                log::warn!("'{name}' requested as latest and as a specific version; keeping the specific version");
                existing.requested_version = new_req.requested_version;
            }
            (Some(_), None) => {
                log::warn!("'{name}' requested as latest and as a specific version; keeping the specific version");
            }
            _ => {}
        },
    }
}

pub fn resolve(local: &LocalIndex, remote: &RemoteIndex, platform: &Platform) -> ResolverOutcome {
    let mut outcome = ResolverOutcome::default();

    for pkg in local.iter() {
        if pkg.identity.kind != PLUGIN_TYPE {
            continue;
        }
        let Descriptor::Plugin(descriptor) = &pkg.descriptor else {
            continue;
        };
        let name = &pkg.identity.name;

        let lang = &descriptor.language_module.name;
        if local.find_by_kind(lang).is_none() {
            match remote.find_by_kind(lang) {
                Some(remote_module) => {
                    // `missing` is keyed by the remote package's own name, not
                    // by the language tag: a language module named "modPy" of
                    // kind "py" must be installable via `remote.get(name)`.
                    merge_requirement(
                        &mut outcome.missing,
                        &remote_module.identity.name,
                        Requirement {
                            requested_version: None,
                        },
                    );
                }
                None => {
                    outcome.conflicted.push(name.clone());
                    continue;
                }
            }
        }

        for dep in &descriptor.dependencies {
            if dep.optional {
                continue;
            }
            if !dep.supported_platforms.is_empty()
                && !dep.supported_platforms.iter().any(|t| t == platform.tag())
            {
                continue;
            }

            if let Some(local_dep) = local.get(&dep.name) {
                // Resolved open question: a pin mismatch
                // against an installed dependency is logged but NOT pushed to
                // `conflicted` — advisory only, reproduced verbatim from the
                // original source.
                if let Some(requested) = dep.requested_version {
                    if requested != local_dep.version {
                        log::warn!(
                            "'{name}' requests '{}' v{requested}, but v{} is installed",
                            dep.name,
                            local_dep.version
                        );
                    }
                }
                continue;
            }

            if let Some(remote_dep) = remote.get(&dep.name) {
                if let Some(requested) = dep.requested_version {
                    if remote_dep.find_version(requested).is_none() {
                        outcome.conflicted.push(name.clone());
                        continue;
                    }
                }
                merge_requirement(
                    &mut outcome.missing,
                    &dep.name,
                    Requirement {
                        requested_version: dep.requested_version,
                    },
                );
            } else {
                outcome.conflicted.push(name.clone());
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Descriptor, LanguageModuleDescriptor, LanguageModuleRef, PluginDescriptor, PluginReference};
    use crate::package::{LocalPackage, PackageIdentity, PackageVersion, RemotePackage};
    use crate::platform::{Arch, Os};
    use std::path::PathBuf;

    fn platform() -> Platform {
        Platform::new(Os::Linux, Arch::X86_64)
    }

    fn local_plugin(name: &str, lang: &str, deps: Vec<PluginReference>) -> LocalPackage {
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
                dependencies: deps,
                exported_methods: vec![],
            }),
        }
    }

    fn local_module(name: &str, lang: &str, version: i64) -> LocalPackage {
        LocalPackage {
            identity: PackageIdentity {
                name: name.to_string(),
                kind: lang.to_string(),
            },
            path: PathBuf::from(format!("/tmp/{name}.module")),
            version,
            descriptor: Descriptor::Module(LanguageModuleDescriptor {
                file_version: 1,
                version,
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

    fn remote_module(name: &str, lang: &str, versions: Vec<i64>) -> RemotePackage {
        RemotePackage {
            identity: PackageIdentity {
                name: name.to_string(),
                kind: lang.to_string(),
            },
            versions: versions
                .into_iter()
                .map(|v| PackageVersion {
                    version: v,
                    download_url: "https://example.test/pkg.zip".into(),
                    checksum: None,
                    platforms: vec![],
                    dependencies: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn scenario_1_single_plugin_with_local_module_resolves_cleanly() {
        let mut local = LocalIndex::default();
        local.insert_with_conflict_resolution(local_module("modA", "lua", 0));
        local.insert_with_conflict_resolution(local_plugin("pluginA", "lua", vec![]));
        let remote = RemoteIndex::default();
        let outcome = resolve(&local, &remote, &platform());
        assert!(outcome.missing.is_empty());
        assert!(outcome.conflicted.is_empty());
    }

    #[test]
    fn scenario_2_missing_language_module_is_recorded() {
        let mut local = LocalIndex::default();
        local.insert_with_conflict_resolution(local_plugin("pluginA", "py", vec![]));
        let mut remote = RemoteIndex::default();
        remote.insert_for_test(remote_module("modPy", "py", vec![3]));
        let outcome = resolve(&local, &remote, &platform());
        assert!(outcome.conflicted.is_empty());
        assert!(outcome.missing.contains_key("modPy"));
        assert_eq!(outcome.missing["modPy"].requested_version, None);
    }

    #[test]
    fn scenario_3_version_pin_mismatch_against_local_dependency_is_advisory_only() {
        let mut local = LocalIndex::default();
        local.insert_with_conflict_resolution(local_module("modA", "lua", 0));
        local.insert_with_conflict_resolution(local_module("modB", "lua", 2));
        local.insert_with_conflict_resolution(local_plugin(
            "pluginA",
            "lua",
            vec![PluginReference {
                name: "modB".into(),
                requested_version: Some(5),
                optional: false,
                supported_platforms: vec![],
            }],
        ));
        let remote = RemoteIndex::default();
        let outcome = resolve(&local, &remote, &platform());
        // advisory only: no conflict recorded, nothing added to missing.
        assert!(outcome.conflicted.is_empty());
        assert!(!outcome.missing.contains_key("modB"));
    }

    #[test]
    fn remote_dependency_with_unsatisfiable_pin_is_conflicted() {
        let mut local = LocalIndex::default();
        local.insert_with_conflict_resolution(local_module("modA", "lua", 0));
        local.insert_with_conflict_resolution(local_plugin(
            "pluginA",
            "lua",
            vec![PluginReference {
                name: "modB".into(),
                requested_version: Some(5),
                optional: false,
                supported_platforms: vec![],
            }],
        ));
        let mut remote = RemoteIndex::default();
        remote.insert_for_test(remote_module("modB", "lua", vec![3, 4, 7]));
        let outcome = resolve(&local, &remote, &platform());
        assert_eq!(outcome.conflicted, vec!["pluginA".to_string()]);
        assert!(!outcome.missing.contains_key("modB"));
    }

    #[test]
    fn optional_dependency_that_cannot_resolve_does_not_conflict() {
        let mut local = LocalIndex::default();
        local.insert_with_conflict_resolution(local_module("modA", "lua", 0));
        local.insert_with_conflict_resolution(local_plugin(
            "pluginA",
            "lua",
            vec![PluginReference {
                name: "modB".into(),
                requested_version: None,
                optional: true,
                supported_platforms: vec![],
            }],
        ));
        let remote = RemoteIndex::default();
        let outcome = resolve(&local, &remote, &platform());
        assert!(outcome.conflicted.is_empty());
        assert!(outcome.missing.is_empty());
    }
}
