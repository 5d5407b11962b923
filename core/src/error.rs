//! file: core/src/error.rs
//! description: crate-wide error enum composing the per-module `thiserror`
//! types. Nothing built on these ever unwinds past the
//! public `PackageManager`/`PluginManager` boundary — those APIs log and
//! return `bool`/`Option`/`Vec` instead. This type exists for the narrower
//! surface (the CLI, and library consumers who want the underlying cause)
//! where propagating a typed error is appropriate.

use thiserror::Error;

use crate::descriptor::DescriptorError;
use crate::downloader::DownloadError;
use crate::installer::InstallError;

#[derive(Debug, Error)]
pub enum BackstageError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Install(#[from] InstallError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
