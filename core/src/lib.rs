//! Backstage core: discovers plugin and language-module packages on disk,
//! resolves their dependencies against configured remote repositories,
//! installs/updates/uninstalls them, and loads them in dependency order.

pub mod assembly;
pub mod config;
pub mod descriptor;
pub mod downloader;
pub mod error;
pub mod installer;
pub mod local_index;
pub mod package;
pub mod package_manager;
pub mod platform;
pub mod plugin_manager;
pub mod remote_index;
pub mod resolver;
pub mod value_type;
pub mod version;

pub use config::Config;
pub use error::BackstageError;
pub use package_manager::PackageManager;
pub use plugin_manager::{PluginManager, PluginState};
