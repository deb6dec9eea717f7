//! Command line and environment configuration.
//!
//! Only deployment concerns live here. Draw policy (participant bounds,
//! length limits, retention, store capacity) is fixed in `draw_core`.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

/// Anonymous Secret Santa draws
#[derive(Parser, Debug, Clone)]
#[command(name = "santa-draw")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Snapshot file holding every draw
    #[arg(long, env = "PERSIST_PATH", default_value = "data.json")]
    pub data_file: PathBuf,

    /// Keep draws in memory only
    #[arg(long, default_value_t = false)]
    pub in_memory: bool,

    /// Seconds between expiry sweeps
    #[arg(
        long,
        env = "SWEEP_INTERVAL_SECS",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn persist_path(&self) -> Option<&Path> {
        (!self.in_memory).then_some(self.data_file.as_path())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
