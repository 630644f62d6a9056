//! Runtime configuration, parsed once at startup

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

/// Sync a local directory against a trace server and download missing files
#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
pub struct Config {
    /// Server address (host:port)
    #[arg(long, env = "TRACE_SERVER_HOST", default_value = "127.0.0.1:8080")]
    pub host: String,

    /// Local directory to sync
    #[arg(long, env = "SYNC_DIR")]
    pub sync_dir: PathBuf,

    /// Block/buffer size in bytes
    #[arg(long, env = "TRACE_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Maximum simultaneous download connections (0 = one per file)
    #[arg(long, env = "TRACE_MAX_CONNECTIONS", default_value_t = 0)]
    pub max_connections: usize,

    /// Download without asking for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Append timestamped log lines to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Append one JSON line per downloaded file to this file
    #[arg(long = "report-file")]
    pub report_file: Option<PathBuf>,
}

impl Config {
    pub fn new(host: impl Into<String>, sync_dir: impl Into<PathBuf>, buffer_size: usize) -> Self {
        Self {
            host: host.into(),
            sync_dir: sync_dir.into(),
            buffer_size,
            max_connections: 0,
            yes: false,
            log_file: None,
            report_file: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync_dir.as_os_str().is_empty() {
            bail!("error reading sync directory: SYNC_DIR is empty");
        }
        if !self.sync_dir.is_dir() {
            bail!(
                "sync directory does not exist or is not a directory: {}",
                self.sync_dir.display()
            );
        }
        if self.buffer_size == 0 {
            bail!("error reading buffer size: must be greater than zero");
        }
        if self.host.trim().is_empty() {
            bail!("error reading server host: TRACE_SERVER_HOST is empty");
        }
        Ok(())
    }
}
