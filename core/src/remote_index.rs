//! file: core/src/remote_index.rs
//! description: aggregation of remote manifests into an in-memory index,
//! modeled on the original's `PackageManager::LoadRemotePackages`
//! .

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Deserialize;
use url::Url;

use crate::downloader::Downloader;
use crate::local_index::LocalIndex;
use crate::package::{PackageIdentity, PackageVersion, RemotePackage};
use crate::platform::Platform;

#[derive(Debug, Deserialize)]
struct ManifestEntryWire {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    versions: Vec<crate::package::PackageVersionWire>,
}

#[derive(Debug, Deserialize)]
struct PackageManifestWire {
    content: HashMap<String, ManifestEntryWire>,
}

#[derive(Debug, Default)]
pub struct RemoteIndex {
    packages: HashMap<String, RemotePackage>,
}

impl RemoteIndex {
    pub fn get(&self, name: &str) -> Option<&RemotePackage> {
        self.packages.get(name)
    }

    pub fn find_by_kind(&self, kind: &str) -> Option<&RemotePackage> {
        self.packages.values().find(|p| p.identity.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemotePackage> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[cfg(test)]
    pub(crate) fn insert_for_test(&mut self, package: RemotePackage) {
        self.packages.insert(package.identity.name.clone(), package);
    }

    /// Builds the source list (configured repos + each local package's
    /// syntactically-valid `update_url`), fans requests out concurrently,
    /// parses + platform-filters each manifest, and merges under a mutex.
    pub async fn load(
        repositories: &[Url],
        local: &LocalIndex,
        downloader: &Downloader,
        platform: &Platform,
    ) -> Self {
        let mut urls: Vec<String> = repositories.iter().map(|u| u.to_string()).collect();
        for pkg in local.iter() {
            if let Some(update_url) = pkg.update_url() {
                if Url::parse(update_url).is_ok() {
                    urls.push(update_url.to_string());
                }
            }
        }

        let responses = downloader.get_all(&urls).await;
        let merged: Mutex<HashMap<String, RemotePackage>> = Mutex::new(HashMap::new());

        for result in responses {
            let response = match result {
                Ok(r) => r,
                Err(e) => {
                    log::error!("failed to fetch remote manifest: {e}");
                    continue;
                }
            };
            let manifest: PackageManifestWire = match serde_json::from_slice(&response.bytes) {
                Ok(m) => m,
                Err(e) => {
                    log::error!("failed to parse manifest from {}: {e}", response.url);
                    continue;
                }
            };

            for (key, entry) in manifest.content {
                if key != entry.name {
                    log::error!(
                        "manifest entry key '{key}' does not match its object's name '{}'; rejecting",
                        entry.name
                    );
                    continue;
                }
                let versions: Vec<PackageVersion> = entry
                    .versions
                    .into_iter()
                    .map(|v| PackageVersion {
                        version: v.version,
                        download_url: v.download,
                        checksum: v.checksum,
                        platforms: v.platforms,
                        dependencies: vec![],
                    })
                    .collect();
                let package = RemotePackage {
                    identity: PackageIdentity {
                        name: entry.name.clone(),
                        kind: entry.kind,
                    },
                    versions,
                };
                let Some(package) = package.filtered_for_platform(platform) else {
                    log::warn!(
                        "manifest entry '{}' has no versions for platform {}; rejecting",
                        entry.name,
                        platform.tag()
                    );
                    continue;
                };

                let mut guard = merged.lock().expect("remote index mutex poisoned");
                merge_one(&mut guard, package);
            }
        }

        RemoteIndex {
            packages: merged.into_inner().expect("remote index mutex poisoned"),
        }
    }
}

/// First occurrence of a name wins identity. A structurally-equal subsequent
/// entry (same identity) has its `versions` union-merged in; an unequal one
/// is dropped with a warning. Commutative/associative regardless of arrival
/// order.
fn merge_one(map: &mut HashMap<String, RemotePackage>, incoming: RemotePackage) {
    match map.get_mut(&incoming.identity.name) {
        None => {
            map.insert(incoming.identity.name.clone(), incoming);
        }
        Some(existing) => {
            if existing.identity == incoming.identity {
                for v in incoming.versions {
                    if !existing.versions.iter().any(|e| e.version == v.version) {
                        existing.versions.push(v);
                    }
                }
                existing.versions.sort_by(|a, b| b.version.cmp(&a.version));
            } else {
                log::warn!(
                    "manifest entry '{}' redefines identity (kind '{}' vs '{}'); ignoring",
                    incoming.identity.name,
                    incoming.identity.kind,
                    existing.identity.kind
                );
            }
        }
    }
}
