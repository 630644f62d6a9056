use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Run events. Every hook defaults to a no-op.
pub trait Logger: Send + Sync {
    fn start(&self, _root: &Path, _host: &str) {}
    fn listed(&self, _local: usize, _missing: usize) {}
    fn download_done(&self, _path: &str, _dst: &Path, _bytes: u64) {}
    fn error(&self, _context: &str, _path: &str, _msg: &str) {}
    fn done(&self, _files: u64, _failed: u64, _bytes: u64, _seconds: f64) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn start(&self, root: &Path, host: &str) {
        self.line(&format!("START root={} host={}", root.display(), host));
    }
    fn listed(&self, local: usize, missing: usize) {
        self.line(&format!("LIST local={local} missing={missing}"));
    }
    fn download_done(&self, path: &str, dst: &Path, bytes: u64) {
        self.line(&format!(
            "DOWNLOAD path={} dst={} bytes={}",
            path,
            dst.display(),
            bytes
        ));
    }
    fn error(&self, context: &str, path: &str, msg: &str) {
        self.line(&format!("ERROR ctx={} path={} msg={}", context, path, msg));
    }
    fn done(&self, files: u64, failed: u64, bytes: u64, seconds: f64) {
        self.line(&format!(
            "DONE files={files} failed={failed} bytes={bytes} seconds={seconds:.3}"
        ));
    }
}
