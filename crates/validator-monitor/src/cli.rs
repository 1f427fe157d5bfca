//! Command-line configuration for the validator monitor.

use clap::Parser;
use std::{
    net::SocketAddr,
    path::PathBuf,
    time::Duration,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON configuration file.
    #[arg(long, env = "VALIDATOR_MONITOR_CONFIG", default_value = "monitor.json")]
    pub config: PathBuf,

    /// Address the trigger server listens on.
    #[arg(long, env = "VALIDATOR_MONITOR_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: SocketAddr,

    /// Run a cycle every N seconds in addition to the HTTP trigger.
    #[arg(long, env = "VALIDATOR_MONITOR_POLL_INTERVAL_SECS")]
    pub poll_interval_secs: Option<u64>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "VALIDATOR_MONITOR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Overrides `rpc_url` from the configuration file.
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Overrides `alert_webhook_url` from the configuration file.
    #[arg(long)]
    pub webhook_url: Option<String>,
}

impl Args {
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
