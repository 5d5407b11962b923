//! file: cli/src/main.rs
//! description: command-line front-end for Backstage.
//!
//! Wires `backstage-core`'s `PackageManager` to a `clap` subcommand surface.
//! the core's public API never names a front-end; this binary is the
//! ambient demonstration front-end, wiring every `PackageManager` operation
//! to a subcommand.

use std::io::Write;
use std::path::PathBuf;

use backstage_core::config::{Config, BASE_DIR_ENV_VAR};
use backstage_core::package_manager::PackageManager;
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use console::style;
use log::{error, info, Level};
use url::Url;

mod output;
use output::BackstageStdoutHandler;

#[derive(Parser)]
#[command(name = "backstage", version, about = "Backstage plugin orchestration runtime")]
struct Cli {
    /// Base directory to scan for installed packages.
    #[arg(short = 'P', long = "base-dir", global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Remote repository URL (repeatable).
    #[arg(long = "repo", global = true, value_name = "URL")]
    repo: Vec<Url>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List local and remote packages.
    List,
    /// Resolve dependencies and print the missing/conflicted sets.
    Resolve,
    /// Install a package from the remote index.
    Install {
        name: String,
        #[arg(long = "version")]
        version: Option<i64>,
    },
    /// Update an installed package, or all installed packages if no name is given.
    Update {
        name: Option<String>,
        #[arg(long = "version")]
        version: Option<i64>,
    },
    /// Uninstall a locally installed package.
    Uninstall { name: String },
    /// Write a snapshot of the local index to a `.pmanifest` file.
    Snapshot {
        path: PathBuf,
        #[arg(long = "pretty")]
        pretty: bool,
    },
    /// Install every package named in a `.pmanifest` snapshot.
    InstallAll {
        manifest: PathBuf,
        #[arg(long = "reinstall")]
        reinstall: bool,
    },
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let lvl = match record.level() {
                Level::Error => style("error").red().bold(),
                Level::Warn => style("warn").yellow().bold(),
                Level::Info => style("info").green().bold(),
                Level::Debug => style("debug").cyan(),
                Level::Trace => style("trace").magenta(),
            };
            writeln!(buf, "{}: {}", lvl, record.args())
        })
        .init();
}

fn resolve_base_dir(cli_value: Option<PathBuf>) -> PathBuf {
    cli_value
        .or_else(|| std::env::var(BASE_DIR_ENV_VAR).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_logger();
    let cli = Cli::parse();

    let base_dir = resolve_base_dir(cli.base_dir);
    let config = Config::new(base_dir).with_repositories(cli.repo);
    let mut manager = PackageManager::new(config);
    manager.reload().await;

    match run(&cli.command, &mut manager).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(()) => std::process::ExitCode::FAILURE,
    }
}

async fn run(command: &Commands, manager: &mut PackageManager) -> Result<(), ()> {
    let mut out = BackstageStdoutHandler::new(std::io::stdout(), 72);
    match command {
        Commands::List => {
            let _ = out.title("installed & available packages");
            let mut table = Table::new();
            table.set_header(vec!["name", "kind", "version", "source"]);
            for pkg in manager.local_index().iter() {
                table.add_row(vec![
                    Cell::new(&pkg.identity.name),
                    Cell::new(&pkg.identity.kind),
                    Cell::new(pkg.version.to_string()),
                    Cell::new("local"),
                ]);
            }
            for pkg in manager.remote_index().iter() {
                table.add_row(vec![
                    Cell::new(&pkg.identity.name),
                    Cell::new(&pkg.identity.kind),
                    Cell::new(
                        pkg.latest()
                            .map(|v| v.version.to_string())
                            .unwrap_or_default(),
                    ),
                    Cell::new("remote"),
                ]);
            }
            println!("{table}");
            Ok(())
        }
        Commands::Resolve => {
            info!("{} missing package(s)", manager.missing().len());
            for (name, req) in manager.missing() {
                match req.requested_version {
                    Some(v) => println!("  missing: {name} (requested v{v})"),
                    None => println!("  missing: {name} (latest)"),
                }
            }
            info!("{} conflicted plugin(s)", manager.conflicted().len());
            for name in manager.conflicted() {
                println!("  conflicted: {name}");
            }
            Ok(())
        }
        Commands::Install { name, version } => {
            if manager.install_package(name, *version).await {
                let _ = out.success(&format!("installed '{name}'"));
                info!("installed '{name}'");
                Ok(())
            } else {
                let _ = out.error(&format!("failed to install '{name}'"));
                error!("failed to install '{name}'");
                Err(())
            }
        }
        Commands::Update { name, version } => match name {
            Some(name) => {
                if manager.update_package(name, *version).await {
                    let _ = out.success(&format!("updated '{name}'"));
                    info!("updated '{name}'");
                    Ok(())
                } else {
                    let _ = out.error(&format!("failed to update '{name}'"));
                    error!("failed to update '{name}'");
                    Err(())
                }
            }
            None => {
                let names: Vec<String> = manager
                    .local_index()
                    .iter()
                    .map(|p| p.identity.name.clone())
                    .collect();
                let mut failures = 0;
                for name in names {
                    if !manager.update_package(&name, None).await {
                        failures += 1;
                    }
                }
                if failures == 0 {
                    Ok(())
                } else {
                    Err(())
                }
            }
        },
        Commands::Uninstall { name } => {
            if manager.uninstall_package(name, true).await {
                let _ = out.success(&format!("uninstalled '{name}'"));
                info!("uninstalled '{name}'");
                Ok(())
            } else {
                let _ = out.error(&format!("failed to uninstall '{name}'"));
                error!("failed to uninstall '{name}'");
                Err(())
            }
        }
        Commands::Snapshot { path, pretty } => match manager.snapshot(path, *pretty) {
            Ok(()) => {
                let _ = out.success(&format!("wrote snapshot to {}", path.display()));
                info!("wrote snapshot to {}", path.display());
                Ok(())
            }
            Err(e) => {
                let _ = out.error(&format!("failed to write snapshot: {e}"));
                error!("failed to write snapshot: {e}");
                Err(())
            }
        },
        Commands::InstallAll { manifest, reinstall } => {
            let count = manager.install_all_packages(manifest, *reinstall).await;
            let _ = out.success(&format!(
                "installed {count} package(s) from {}",
                manifest.display()
            ));
            info!("installed {count} package(s) from {}", manifest.display());
            Ok(())
        }
    }
}
