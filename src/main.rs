//! lazyinstall CLI entry point

use clap::Parser;
use console::style;
use lazyinstall::cli::{Cli, Commands};
use lazyinstall::config::ConfigManager;
use lazyinstall::error::{LazyInstallError, LazyInstallResult};
use lazyinstall::workspace::Workspace;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> LazyInstallResult<()> {
    let cli = Cli::parse();

    let root = match cli.workspace {
        Some(ref path) => std::path::absolute(path)
            .map_err(|e| LazyInstallError::io(format!("resolving {}", path.display()), e))?,
        None => std::env::current_dir()
            .map_err(|e| LazyInstallError::io("getting current directory", e))?,
    };

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::for_workspace(&root),
    };
    // The settings file picks the log format, so it loads before tracing
    let loaded = config_manager.load_file().await?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("lazyinstall=warn"),
        1 => EnvFilter::new("lazyinstall=info"),
        _ => EnvFilter::new("lazyinstall=debug"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if found {
        debug!("Loaded config from {}", config_manager.path().display());
    } else {
        debug!(
            "Config file {} not found, using defaults",
            config_manager.path().display()
        );
    }

    let workspace = Workspace::new(root, config.workspace.clone());

    match cli.command {
        Commands::Install(args) => lazyinstall::cli::commands::install(args, &workspace, &config).await,
        Commands::Check(args) => lazyinstall::cli::commands::check(args, &workspace).await,
        Commands::Clean(args) => lazyinstall::cli::commands::clean(args, &workspace).await,
    }
}
