//! file: core/src/package_manager.rs
//! description: orchestrates local/remote indices, the resolver, and the
//! installer behind a boolean/`Option`-returning public API, modeled on the
//! original's `PackageManager` facade and its `Request()` wrapper.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::downloader::Downloader;
use crate::installer::{self, UpdateKind};
use crate::local_index::LocalIndex;
use crate::package::PLUGIN_TYPE;
use crate::remote_index::RemoteIndex;
use crate::resolver::{self, ResolverOutcome};

pub struct PackageManager {
    config: Config,
    downloader: Downloader,
    local: LocalIndex,
    remote: RemoteIndex,
    outcome: ResolverOutcome,
}

impl PackageManager {
    pub fn new(config: Config) -> Self {
        let downloader = Downloader::new(config.request_timeout);
        let local = LocalIndex::load(&config.base_dir, &config.platform);
        PackageManager {
            config,
            downloader,
            local,
            remote: RemoteIndex::default(),
            outcome: ResolverOutcome::default(),
        }
    }

    pub fn local_index(&self) -> &LocalIndex {
        &self.local
    }

    pub fn remote_index(&self) -> &RemoteIndex {
        &self.remote
    }

    pub fn missing(&self) -> &HashMap<String, resolver::Requirement> {
        &self.outcome.missing
    }

    pub fn conflicted(&self) -> &[String] {
        &self.outcome.conflicted
    }

    fn reload_local(&mut self) {
        self.local = LocalIndex::load(&self.config.base_dir, &self.config.platform);
    }

    /// `Initialize`/`Reload`: loads the local index, fetches+aggregates every
    /// configured and per-package remote manifest, then resolves.
    pub async fn reload(&mut self) {
        self.reload_local();
        self.remote = RemoteIndex::load(
            &self.config.repositories,
            &self.local,
            &self.downloader,
            &self.config.platform,
        )
        .await;
        self.outcome = resolver::resolve(&self.local, &self.remote, &self.config.platform);
    }

    /// Runs `body`, reloads the local index so post-conditions reflect actual
    /// disk state, and logs total elapsed milliseconds — the original's
    /// `Request()` wrapper.
    async fn request<F, Fut, T>(&mut self, label: &str, body: F) -> T
    where
        F: FnOnce(&mut Self) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let start = Instant::now();
        let result = body(self).await;
        self.reload_local();
        log::info!("{label} completed in {}ms", start.elapsed().as_millis());
        result
    }

    /// Installs every package named in `missing`, if it resolves in the
    /// remote index. Returns the number of packages successfully installed.
    pub async fn install_missing(&mut self) -> usize {
        self.request("install_missing", |this| async move {
            let mut installed = 0usize;
            let names: Vec<(String, Option<i64>)> = this
                .outcome
                .missing
                .iter()
                .map(|(name, req)| (name.clone(), req.requested_version))
                .collect();
            for (name, requested) in names {
                let Some(remote) = this.remote.get(&name).cloned() else {
                    log::error!("'{name}' is in missing but no longer present in the remote index");
                    continue;
                };
                match installer::install(
                    &this.config.base_dir,
                    &remote,
                    requested,
                    &this.downloader,
                    &this.config.platform,
                )
                .await
                {
                    Ok(()) => installed += 1,
                    Err(e) => log::error!("failed to install '{name}': {e}"),
                }
            }
            installed
        })
        .await
    }

    /// `InstallPackage`: rejects if already installed locally.
    pub async fn install_package(&mut self, name: &str, requested_version: Option<i64>) -> bool {
        if self.local.contains(name) {
            log::error!("'{name}' is already installed");
            return false;
        }
        let Some(remote) = self.remote.get(name).cloned() else {
            log::error!("'{name}' not found in the remote index");
            return false;
        };
        self.request("install_package", |this| async move {
            match installer::install(
                &this.config.base_dir,
                &remote,
                requested_version,
                &this.downloader,
                &this.config.platform,
            )
            .await
            {
                Ok(()) => true,
                Err(e) => {
                    log::error!("failed to install '{}': {e}", remote.identity.name);
                    false
                }
            }
        })
        .await
    }

    /// `UpdatePackage`: short-circuits if no strictly newer version exists
    /// and none was explicitly requested.
    pub async fn update_package(&mut self, name: &str, requested_version: Option<i64>) -> bool {
        let Some(local_pkg) = self.local.get(name).cloned() else {
            log::error!("'{name}' is not installed");
            return false;
        };
        let Some(remote) = self.remote.get(name).cloned() else {
            log::error!("'{name}' not found in the remote index");
            return false;
        };
        let (target_version, kind) = match installer::plan_update(
            local_pkg.version,
            &remote,
            requested_version,
            &self.config.platform,
        ) {
            Ok((v, k)) => (v.version, k),
            Err(e) => {
                log::warn!("not updating '{name}': {e}");
                return false;
            }
        };
        match kind {
            UpdateKind::Upgrade => log::info!("'{name}': upgrading to v{target_version}"),
            UpdateKind::Reinstall => log::info!("'{name}': reinstalling v{target_version}"),
            UpdateKind::Downgrade => log::info!("'{name}': downgrading to v{target_version}"),
        }
        self.request("update_package", |this| async move {
            match installer::install(
                &this.config.base_dir,
                &remote,
                Some(target_version),
                &this.downloader,
                &this.config.platform,
            )
            .await
            {
                Ok(()) => true,
                Err(e) => {
                    log::error!("failed to update '{name}': {e}");
                    false
                }
            }
        })
        .await
    }

    /// `UninstallPackage`: recursively deletes the parent directory of the
    /// descriptor file and, when requested, evicts the in-memory entry.
    pub async fn uninstall_package(&mut self, name: &str, remove_from_index: bool) -> bool {
        let Some(local_pkg) = self.local.get(name).cloned() else {
            log::error!("'{name}' is not installed");
            return false;
        };
        self.request("uninstall_package", |this| async move {
            match installer::uninstall_directory(&local_pkg.path) {
                Ok(()) => {
                    if remove_from_index {
                        this.local.remove(name);
                    }
                    true
                }
                Err(e) => {
                    log::error!("failed to uninstall '{name}': {e}");
                    false
                }
            }
        })
        .await
    }

    /// Writes a `.pmanifest`-shaped snapshot of the local index.
    pub fn snapshot(&self, path: &Path, prettify: bool) -> std::io::Result<()> {
        let content: HashMap<String, SnapshotEntry> = self
            .local
            .iter()
            .map(|pkg| {
                (
                    pkg.identity.name.clone(),
                    SnapshotEntry {
                        name: pkg.identity.name.clone(),
                        kind: pkg.identity.kind.clone(),
                        version: pkg.version,
                    },
                )
            })
            .collect();
        let doc = SnapshotDocument { content };
        let bytes = if prettify {
            serde_json::to_vec_pretty(&doc)
        } else {
            serde_json::to_vec(&doc)
        }
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, bytes)
    }

    pub fn is_plugin(name: &str, kind: &str) -> bool {
        kind == PLUGIN_TYPE && !name.is_empty()
    }

    /// `InstallAllPackages`: reads a `.pmanifest` snapshot and installs each
    /// entry at its recorded version from the remote index, for reproducing
    /// a local index in a fresh base directory.
    /// `reinstall` controls whether an already-installed entry is
    /// uninstalled and reinstalled at the snapshot's version.
    pub async fn install_all_packages(&mut self, manifest_path: &Path, reinstall: bool) -> usize {
        let bytes = match std::fs::read(manifest_path) {
            Ok(b) => b,
            Err(e) => {
                log::error!("failed to read manifest {}: {e}", manifest_path.display());
                return 0;
            }
        };
        let doc: SnapshotDocument = match serde_json::from_slice(&bytes) {
            Ok(d) => d,
            Err(e) => {
                log::error!("failed to parse manifest {}: {e}", manifest_path.display());
                return 0;
            }
        };

        let mut installed = 0usize;
        for (name, entry) in doc.content {
            if self.local.contains(&name) {
                if !reinstall {
                    continue;
                }
                if !self.uninstall_package(&name, true).await {
                    continue;
                }
            }
            if self.remote.get(&name).is_none() {
                log::error!("'{name}' not found in the remote index; cannot reproduce snapshot entry");
                continue;
            }
            if self.install_package(&name, Some(entry.version)).await {
                installed += 1;
            }
        }
        installed
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    version: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    content: HashMap<String, SnapshotEntry>,
}
