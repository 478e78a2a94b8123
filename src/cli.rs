//! Command-line entry: argument parsing and session bootstrap.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{self, Config};
use crate::io::IoContext;
use crate::model::EchoModel;
use crate::session::{AgentRegistry, ChatSession};

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Interactive multi-agent chat with streamed, security-filtered I/O")]
pub struct Cli {
    /// Path to config.toml (defaults to ${PARLEY_HOME}/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Agent to start with (defaults to the configured base agent)
    #[arg(long, value_name = "NAME")]
    pub agent: Option<String>,

    /// Print responses immediately instead of pacing them
    #[arg(long)]
    pub no_stream: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Writes a commented default config file
    Init,
}

/// Parses arguments and runs until the session exits.
pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::paths::config_path);

    if let Some(Commands::Init) = cli.command {
        Config::init(&config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let mut config = Config::load_from(&config_path)?;
    if cli.no_stream {
        for agent in config.agents.values_mut() {
            agent.stream_delay_ms = 0;
        }
    }

    crate::interrupt::init();

    let initial = cli
        .agent
        .clone()
        .unwrap_or_else(|| config.global.base_agent.clone());
    let colors = config.colors.clone();
    let registry = AgentRegistry::new(config, &initial)?;

    let io = IoContext::terminal(colors).context("Failed to open terminal")?;
    let mut session = ChatSession::new(io, EchoModel, registry);
    let result = session.run().await;
    session.io().close();
    result
}
