//! traffic-replay binary.
//!
//! ```text
//! inputs ──▶ emitter ──▶ outputs (http replay pool, stdout, ...)
//!                ▲              │
//!                └── tracked ───┘
//!                   responses
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use traffic_replay::config::load_config;
use traffic_replay::lifecycle::signals::wait_for_signal;
use traffic_replay::lifecycle::Shutdown;
use traffic_replay::observability::logging::init_logging;
use traffic_replay::observability::metrics::init_metrics;
use traffic_replay::{Emitter, Plugins};

#[derive(Parser)]
#[command(name = "traffic-replay")]
#[command(about = "Replay captured HTTP traffic against a target server", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "traffic-replay.toml")]
    config: PathBuf,

    /// Round-robin payloads across outputs instead of broadcasting
    #[arg(long)]
    split_output: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if cli.split_output {
        config.emitter.split_output = true;
    }

    init_logging(&config.observability)?;

    if cli.check {
        tracing::info!(config = %cli.config.display(), "Configuration is valid");
        return Ok(());
    }

    tracing::info!(
        config = %cli.config.display(),
        inputs = config.inputs.len(),
        outputs = config.outputs.len(),
        "traffic-replay v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr);
    }

    let shutdown = Shutdown::new();
    let plugins = Plugins::from_config(&config, &shutdown)?;
    let emitter = Emitter::new(plugins, config.emitter.split_output);

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutting down");
        trigger.trigger();
    });

    emitter.run(&shutdown).await;
    shutdown.trigger();

    tracing::info!("Shutdown complete");
    Ok(())
}
