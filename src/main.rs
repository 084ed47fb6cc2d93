// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use installhub::config::ConfigFormat;
use installhub::server::{ServerState, run_server};
use installhub::HubConfig;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "installhub")]
#[command(author, version, about = "Installation orchestration server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen spec, repeatable (overrides [server] listen)
        #[arg(short, long)]
        listen: Vec<String>,

        /// Content root (overrides [content] root)
        #[arg(long)]
        content: Option<PathBuf>,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Print the effective configuration
    ShowConfig {
        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },

    /// Load the configuration, templates and package registry, then exit
    Check {
        /// Configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<HubConfig> {
    match path {
        Some(path) => HubConfig::load(path),
        None => Ok(HubConfig::default()),
    }
}

/// RUST_LOG wins over the configured level unless `force_debug` is set
fn init_tracing(default_level: &str, force_debug: bool) {
    let filter = if force_debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            listen,
            content,
            debug,
        } => {
            let mut config = load_config(config.as_deref())?;
            if !listen.is_empty() {
                config.server.listen = listen;
            }
            if let Some(content) = content {
                config.content.root = content;
            }
            config.validate()?;
            init_tracing(&config.log.level, debug);

            let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            runtime.block_on(run_server(config))
        }

        Commands::ShowConfig { config, format } => {
            let config = load_config(config.as_deref())?;
            println!("{}", config.render(format)?);
            Ok(())
        }

        Commands::Check { config } => {
            let config = HubConfig::load(&config)?;
            init_tracing(&config.log.level, false);

            let state = ServerState::new(config)?;
            info!(
                "Configuration OK: {} supported platforms, templates in {}",
                state.packages.list_supported().len(),
                state.templates.dir().display()
            );
            Ok(())
        }
    }
}
