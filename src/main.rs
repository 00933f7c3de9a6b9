//! Entry point for `captive-relay`.
//!
//! Loads the configuration, sets up logging and runs the session loop until
//! the process is killed. Set `RUST_LOG` to control verbosity.

use std::path::PathBuf;

use captive_relay::{Config, HyperTransport, Session};
use clap::Parser;

/// Logs into a captive portal and relays its telemetry to an endpoint.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// API key sent to the endpoint, overrides the one in the configuration.
    #[arg(long, env = "CAPTIVE_RELAY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(api_key) = cli.api_key {
        config.api_key = api_key;
    }

    if let Some(network) = &config.network {
        log::info!("expecting network {:?} to be associated by the platform", network.ssid);
    }
    if config.api_key.is_empty() {
        log::warn!("no API key configured, the endpoint may reject telemetry");
    }

    let transport = HyperTransport::new(config.transport_timeout);
    Session::new(transport, config)
        .with_observer(|from, to| log::info!("{:?} -> {:?}", from, to))
        .run()
        .await;

    Ok(())
}
