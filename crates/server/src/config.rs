// crates/server/src/config.rs
//! Command-line and environment configuration for the `agencydesk` binary.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use agencydesk_observability::LogFormat;
use clap::Parser;

use crate::state::DEFAULT_MAX_UPLOAD_BYTES;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47900;

#[derive(Debug, Clone, Parser)]
#[command(name = "agencydesk", version, about = "AgencyDesk API server")]
pub struct Config {
    #[arg(long, env = "AGENCYDESK_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, env = "AGENCYDESK_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// SQLite file. Defaults to the platform data directory.
    #[arg(long, env = "AGENCYDESK_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Root of the bucket directories. Defaults to `<data dir>/agencydesk/storage`.
    #[arg(long, env = "AGENCYDESK_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Base for public object URLs. Defaults to `http://<host>:<port>`.
    #[arg(long, env = "AGENCYDESK_PUBLIC_URL")]
    pub public_url: Option<String>,

    #[arg(long, env = "AGENCYDESK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Also write daily-rolled log files here.
    #[arg(long, env = "AGENCYDESK_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, env = "AGENCYDESK_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn public_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.addr()),
        }
    }

    pub fn storage_dir(&self) -> anyhow::Result<PathBuf> {
        self.storage_dir
            .clone()
            .or_else(agencydesk_core::paths::storage_dir)
            .ok_or_else(|| anyhow::anyhow!("Could not determine storage directory"))
    }
}
