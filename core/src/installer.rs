//! file: core/src/installer.rs
//! description: download + verify + extract + atomically publish a package
//! version, modeled on the original's `InstallPackage`/`UpdatePackage`/
//! `UninstallPackage`/`ExtractPackage`/`IsPackageLegit`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::downloader::Downloader;
use crate::package::{PackageVersion, RemotePackage};

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("package '{0}' is already installed")]
    AlreadyInstalled(String),
    #[error("no version of '{name}' qualifies for this platform")]
    NoQualifyingVersion { name: String },
    #[error("'{0}' has a malformed download URL")]
    MalformedUrl(String),
    #[error("download of '{name}' failed: {source}")]
    Download {
        name: String,
        #[source]
        source: crate::downloader::DownloadError,
    },
    #[error("checksum mismatch for '{name}': expected {expected}, got {got}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        got: String,
    },
    #[error("archive for '{name}' contains no {extension} file")]
    MissingDescriptorInArchive { name: String, extension: &'static str },
    #[error("archive error for '{name}': {source}")]
    Archive {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("no strictly newer version of '{0}' is available")]
    NoNewerVersion(String),
    #[error("filesystem error publishing '{name}': {source}")]
    Filesystem {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub fn kind_subdir(kind: &str) -> &'static str {
    if kind == crate::package::PLUGIN_TYPE {
        "plugins"
    } else {
        "modules"
    }
}

fn descriptor_extension(kind: &str) -> &'static str {
    if kind == crate::package::PLUGIN_TYPE {
        "plugin"
    } else {
        "module"
    }
}

/// Picks the target version: `requested` if supplied, else latest, filtered
/// to versions that support the current platform.
fn choose_version<'a>(
    remote: &'a RemotePackage,
    requested: Option<i64>,
    platform: &crate::platform::Platform,
) -> Option<&'a PackageVersion> {
    let candidates: Vec<&PackageVersion> = remote
        .versions
        .iter()
        .filter(|v| v.matches_platform(platform))
        .collect();
    match requested {
        Some(version) => candidates.into_iter().find(|v| v.version == version),
        None => candidates.into_iter().max_by_key(|v| v.version),
    }
}

fn verify_checksum(name: &str, version: &PackageVersion, bytes: &[u8]) -> Result<(), InstallError> {
    let Some(expected) = &version.checksum else {
        return Ok(());
    };
    if expected.is_empty() {
        return Ok(());
    }
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let got = hex_encode(&hasher.finalize());
    if !got.eq_ignore_ascii_case(expected) {
        return Err(InstallError::ChecksumMismatch {
            name: name.to_string(),
            expected: expected.clone(),
            got,
        });
    }
    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Extracts `archive_bytes` into `staging_dir`. The archive must contain at
/// least one file with `extension`, checked before any file is written —
/// otherwise staging is abandoned, matching the original's publish step.
fn extract_archive(
    name: &str,
    archive_bytes: &[u8],
    staging_dir: &Path,
    extension: &'static str,
) -> Result<(), InstallError> {
    let reader = Cursor::new(archive_bytes);
    let mut archive = zip::ZipArchive::new(reader).map_err(|source| InstallError::Archive {
        name: name.to_string(),
        source,
    })?;

    let has_descriptor = (0..archive.len()).any(|i| {
        archive
            .by_index(i)
            .ok()
            .and_then(|f| {
                Path::new(f.name())
                    .extension()
                    .map(|e| e.to_string_lossy() == extension)
            })
            .unwrap_or(false)
    });
    if !has_descriptor {
        return Err(InstallError::MissingDescriptorInArchive {
            name: name.to_string(),
            extension,
        });
    }

    std::fs::create_dir_all(staging_dir).map_err(|source| InstallError::Filesystem {
        name: name.to_string(),
        source,
    })?;
    archive
        .extract(staging_dir)
        .map_err(|source| InstallError::Archive {
            name: name.to_string(),
            source,
        })?;
    Ok(())
}

/// Installs `remote` at `requested_version` (or latest) under `base_dir`.
/// Mirrors the original's `InstallPackage`. Caller is responsible for the
/// "already installed" precondition (step 1) and for reloading the local
/// index afterward — this function handles steps 2-8 only.
pub async fn install(
    base_dir: &Path,
    remote: &RemotePackage,
    requested_version: Option<i64>,
    downloader: &Downloader,
    platform: &crate::platform::Platform,
) -> Result<(), InstallError> {
    let name = &remote.identity.name;
    let version = choose_version(remote, requested_version, platform).ok_or_else(|| {
        InstallError::NoQualifyingVersion {
            name: name.clone(),
        }
    })?;

    if !version.download_url_is_well_formed() {
        return Err(InstallError::MalformedUrl(version.download_url.clone()));
    }

    let response = downloader
        .get(&version.download_url)
        .await
        .map_err(|source| InstallError::Download {
            name: name.clone(),
            source,
        })?;

    verify_checksum(name, version, &response.bytes)?;

    let kind_dir = kind_subdir(&remote.identity.kind);
    let timestamp = crate::config::utc_timestamp();
    let staging = base_dir
        .join(kind_dir)
        .join(format!("{name}-{timestamp}"));
    let extension = descriptor_extension(&remote.identity.kind);

    extract_archive(name, &response.bytes, &staging, extension)?;

    let final_dir = base_dir.join(kind_dir).join(name);
    if let Err(source) = std::fs::rename(&staging, &final_dir) {
        log::error!(
            "failed to publish '{name}': rename {} -> {} failed: {source}; staging left in place for diagnosis",
            staging.display(),
            final_dir.display()
        );
        return Err(InstallError::Filesystem {
            name: name.clone(),
            source,
        });
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Upgrade,
    Reinstall,
    Downgrade,
}

/// Picks the target version for an update, short-circuiting when no
/// strictly newer version exists and none was explicitly requested.
pub fn plan_update(
    current_version: i64,
    remote: &RemotePackage,
    requested_version: Option<i64>,
    platform: &crate::platform::Platform,
) -> Result<(&PackageVersion, UpdateKind), InstallError> {
    let name = &remote.identity.name;
    let target = choose_version(remote, requested_version, platform).ok_or_else(|| {
        InstallError::NoQualifyingVersion {
            name: name.clone(),
        }
    })?;
    if requested_version.is_none() && target.version <= current_version {
        return Err(InstallError::NoNewerVersion(name.clone()));
    }
    let kind = match target.version.cmp(&current_version) {
        std::cmp::Ordering::Greater => UpdateKind::Upgrade,
        std::cmp::Ordering::Equal => UpdateKind::Reinstall,
        std::cmp::Ordering::Less => UpdateKind::Downgrade,
    };
    Ok((target, kind))
}

/// Recursively deletes the parent directory of `path`, matching
/// `UninstallPackage`'s "delete the directory that owns the descriptor file".
pub fn uninstall_directory(descriptor_path: &Path) -> std::io::Result<()> {
    let dir = descriptor_path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent directory"))?;
    std::fs::remove_dir_all(dir)
}

pub(crate) fn resolve_install_path(base_dir: &Path, kind: &str, name: &str) -> PathBuf {
    base_dir.join(kind_subdir(kind)).join(name)
}
