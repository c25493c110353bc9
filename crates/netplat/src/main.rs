mod catalog;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use netplat_core::config::{ConfigError, PlatformConfig};
use netplat_core::kernel::constants::{APP_NAME, DEFAULT_CONFIG_FILE};
use netplat_core::{Application, KernelError};

/// Netplat: multi-tenant network platform
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Platform configuration file (TOML, JSON or YAML). Defaults to
    /// ./netplat.toml when present.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start every plugin and serve the HTTP API until Ctrl-C
    Serve {
        /// Listen address, overriding the configuration
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Inspect the discoverable plugins
    Plugins {
        #[command(subcommand)]
        command: PluginCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PluginCommand {
    /// List discovered plugins with their metadata
    List {},
    /// Print the dependency-resolved load order
    Order {},
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PlatformConfig, ConfigError> {
    let mut config = match path {
        Some(path) => PlatformConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => PlatformConfig::load(Path::new(DEFAULT_CONFIG_FILE))?,
        None => PlatformConfig::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Plugins { command } => match command {
            PluginCommand::List {} => list_plugins(config).await,
            PluginCommand::Order {} => print_load_order(config).await,
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} error: {}", APP_NAME, e);
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn serve(mut config: PlatformConfig, bind: Option<SocketAddr>) -> Result<(), KernelError> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    let app = Application::new(config, catalog::catalog())?;
    app.serve().await
}

/// Discovery only; nothing is initialized
async fn discovered(config: PlatformConfig) -> Result<Application, KernelError> {
    let app = Application::new(config, catalog::catalog())?;
    let report = app.discover().await;
    for failure in &report.failures {
        eprintln!("warning: {}", failure);
    }
    for name in &report.disabled {
        tracing::info!("Plugin '{}' disabled by its manifest", name);
    }
    Ok(app)
}

async fn list_plugins(config: PlatformConfig) -> Result<(), KernelError> {
    let app = discovered(config).await?;
    let registry = app.registry();
    let registry = registry.read().await;

    if registry.is_empty() {
        println!("No plugins discovered.");
        return Ok(());
    }
    for name in registry.list_names() {
        let Some(meta) = registry.metadata(&name) else {
            continue;
        };
        println!(
            "{} {} requires=[{}] capabilities=[{}]",
            meta.name,
            meta.version,
            meta.requires.join(", "),
            meta.capabilities.join(", ")
        );
    }
    Ok(())
}

async fn print_load_order(config: PlatformConfig) -> Result<(), KernelError> {
    let app = discovered(config).await?;
    let registry = app.registry();
    let order = registry
        .read()
        .await
        .compute_load_order()
        .map_err(netplat_core::plugin_system::PluginSystemError::from)?;
    for (position, name) in order.iter().enumerate() {
        println!("{}. {}", position + 1, name);
    }
    Ok(())
}
