use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use delegation_scanner::{
    alloy_connector, builtin_names, MonitorConfig, MonitorEvent, MultiNetworkMonitor,
    NetworkDescriptor,
};
use eyre::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Watch EIP-7702 delegations across EVM networks", long_about = None)]
struct Cli {
    /// Path to a JSON monitor configuration
    #[arg(long, env = "DELEGATION_CONFIG")]
    config: Option<PathBuf>,

    /// Networks to use (repeatable); replaces the configured list
    #[arg(short, long = "network")]
    networks: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List built-in networks
    Networks,
    /// Scan recent blocks once
    Scan {
        /// Number of blocks to scan
        #[arg(short, long, default_value_t = 10)]
        count: u64,
        /// First block of the range (defaults to ending at the latest block)
        #[arg(long)]
        from: Option<u64>,
    },
    /// Watch new blocks until interrupted
    Watch,
    /// Show the current delegation of an account
    Current { address: Address },
    /// Show recent delegations sent and signed by an account
    History {
        address: Address,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON lines
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Command::Networks = cli.command {
        for name in builtin_names() {
            print_json(&NetworkDescriptor::builtin(name)?)?;
        }
        return Ok(());
    }

    let config = load_config(&cli).await?;
    if config.networks.is_empty() {
        return Err(eyre::eyre!("No networks configured"));
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let monitor = MultiNetworkMonitor::from_config(&config, alloy_connector(), Arc::new(tx));

    if monitor.get_networks().is_empty() {
        log_errors(&mut rx);
        return Err(eyre::eyre!("No network could be initialised"));
    }

    match cli.command {
        Command::Networks => {}
        Command::Scan { count, from } => {
            for record in monitor.scan_blocks(count, from).await {
                print_json(&record)?;
            }
        }
        Command::Current { address } => {
            for designator in monitor.get_current_delegations(address).await {
                print_json(&designator)?;
            }
        }
        Command::History { address, limit } => {
            for entry in monitor.get_delegation_history(address, limit).await {
                print_json(&entry)?;
            }
        }
        Command::Watch => {
            log_errors(&mut rx);
            monitor.start_monitoring().await;
            tracing::info!(networks = ?monitor.get_networks(), "Watching, Ctrl+C to stop");

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Shutdown signal received");
                        break;
                    }
                    event = rx.recv() => match event {
                        Some(event) => print_json(&event)?,
                        None => break,
                    }
                }
            }

            monitor.stop_monitoring().await;
        }
    }

    log_errors(&mut rx);
    Ok(())
}

async fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load_from_file(path).await?,
        None => {
            tracing::debug!("No config file, using defaults");
            MonitorConfig {
                networks: vec!["ethereum".to_string()],
                ..Default::default()
            }
        }
    };

    if !cli.networks.is_empty() {
        config.networks = cli.networks.clone();
    }

    let config = config.with_env_overrides();
    tracing::info!(networks = ?config.networks, batch_size = config.scanner.batch_size, "Config loaded");
    Ok(config)
}

/// Surface error events produced during one-shot commands.
fn log_errors(rx: &mut mpsc::UnboundedReceiver<MonitorEvent>) {
    while let Ok(event) = rx.try_recv() {
        if let MonitorEvent::Error { network, error } = event {
            tracing::warn!(network = network.as_deref().unwrap_or("-"), "{}", error);
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
