//! file: core/src/package.rs
//! description: package identity and remote/local package records
//! (`PackageIdentity`, `PackageVersion`, `RemotePackage`, `LocalPackage`),
//! modeled on the original's `Package`/`LocalPackage` classes.

use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

use crate::descriptor::Descriptor;
use crate::platform::Platform;

pub const PLUGIN_TYPE: &str = "plugin";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    pub name: String,
    pub kind: String,
}

impl PackageIdentity {
    pub fn is_plugin(&self) -> bool {
        self.kind == PLUGIN_TYPE
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageVersionWire {
    pub version: i64,
    pub download: String,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
}

/// One downloadable version of a remote package. `version` is the raw
/// integer the manifest carries — the wire `PackageVersion.version` is
/// "integer", distinct from the packed `Version` tuple type used elsewhere.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    pub version: i64,
    pub download_url: String,
    pub checksum: Option<String>,
    pub platforms: Vec<String>,
    pub dependencies: Vec<crate::descriptor::PluginReference>,
}

impl PackageVersion {
    pub fn matches_platform(&self, platform: &Platform) -> bool {
        self.platforms.is_empty() || self.platforms.iter().any(|t| t == platform.tag())
    }

    pub fn download_url_is_well_formed(&self) -> bool {
        Url::parse(&self.download_url)
            .map(|u| !u.scheme().is_empty() && u.host().is_some())
            .unwrap_or(false)
    }
}

/// A remote package: identity plus an ordered (latest-first) set of versions.
#[derive(Debug, Clone)]
pub struct RemotePackage {
    pub identity: PackageIdentity,
    pub versions: Vec<PackageVersion>,
}

impl RemotePackage {
    /// Drops versions whose `platforms` set excludes `platform`. A package
    /// whose `versions` becomes empty this way is pruned by the caller (the
    /// remote index drops the whole entry).
    pub fn filtered_for_platform(mut self, platform: &Platform) -> Option<Self> {
        self.versions.retain(|v| v.matches_platform(platform));
        if self.versions.is_empty() {
            None
        } else {
            self.versions.sort_by(|a, b| b.version.cmp(&a.version));
            Some(self)
        }
    }

    pub fn latest(&self) -> Option<&PackageVersion> {
        self.versions.first()
    }

    pub fn find_version(&self, version: i64) -> Option<&PackageVersion> {
        self.versions.iter().find(|v| v.version == version)
    }
}

/// A locally installed package: identity, the path to its descriptor file on
/// disk, its integer version, and the parsed descriptor.
#[derive(Debug, Clone)]
pub struct LocalPackage {
    pub identity: PackageIdentity,
    pub path: PathBuf,
    pub version: i64,
    pub descriptor: Descriptor,
}

impl LocalPackage {
    /// Invariant: `descriptor` type matches `identity.kind`
    /// iff `kind == "plugin"`.
    pub fn descriptor_matches_identity(&self) -> bool {
        matches!(
            (&self.descriptor, self.identity.is_plugin()),
            (Descriptor::Plugin(_), true) | (Descriptor::Module(_), false)
        )
    }

    pub fn update_url(&self) -> Option<&str> {
        match &self.descriptor {
            Descriptor::Plugin(p) => p.update_url.as_deref(),
            Descriptor::Module(m) => m.update_url.as_deref(),
        }
    }
}
