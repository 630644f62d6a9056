//! Concurrent download of the missing files, one connection per file.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::logger::Logger;
use crate::net::{self, Params};
use crate::protocol::route;
use crate::protocol_core::prepare_destination;
use crate::reassemble::receive_file;
use crate::record::FileRecord;

/// Result of one file's download task
#[derive(Debug)]
pub struct DownloadOutcome {
    pub path: String,
    pub destination: PathBuf,
    /// Bytes written on success
    pub result: Result<u64>,
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadReport {
    pub fn succeeded(&self) -> u64 {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count() as u64
    }

    pub fn failed(&self) -> u64 {
        self.outcomes.iter().filter(|o| o.result.is_err()).count() as u64
    }

    pub fn bytes(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }
}

/// Download every file in `files` concurrently and wait for all of them.
///
/// Each file gets its own task and its own `/download` connection. With
/// `max_connections == 0` every task starts immediately; otherwise at most
/// that many are connected at once. A failing task is logged and recorded
/// in the report; it never stops the others.
pub async fn download_all(
    config: &Config,
    files: &[FileRecord],
    logger: Arc<dyn Logger>,
) -> DownloadReport {
    let limiter = match config.max_connections {
        0 => None,
        n => Some(Arc::new(Semaphore::new(n))),
    };

    let mut handles = Vec::with_capacity(files.len());
    for file in files {
        let host = config.host.clone();
        let root = config.sync_dir.clone();
        let buffer_size = config.buffer_size;
        let path = file.path.clone();
        let limiter = limiter.clone();
        let logger = Arc::clone(&logger);

        let handle = tokio::spawn(async move {
            let _permit = match limiter {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            let result = download_one(&host, &root, buffer_size, &path).await;
            match &result {
                Ok(bytes) => {
                    println!("File {} saved to disk.", path);
                    logger.download_done(&path, &root.join(&path), *bytes);
                }
                Err(e) => {
                    eprintln!("error downloading {}: {:#}", path, e);
                    logger.error("download", &path, &format!("{:#}", e));
                }
            }
            result
        });
        handles.push((file.path.clone(), handle));
    }

    let mut report = DownloadReport::default();
    for (path, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                logger.error("download", &path, &e.to_string());
                Err(anyhow!("download task failed: {}", e))
            }
        };
        report.outcomes.push(DownloadOutcome {
            destination: config.sync_dir.join(&path),
            path,
            result,
        });
    }
    report
}

async fn download_one(host: &str, root: &Path, buffer_size: usize, path: &str) -> Result<u64> {
    let dest = prepare_destination(root, Path::new(path)).await?;

    let mut params = Params::new();
    params.insert(route::FILE_PARAM.to_string(), path.to_string());
    let mut conn = net::dial(host, route::DOWNLOAD, params).await?;

    let written = receive_file(&mut conn, &dest, buffer_size).await?;
    let _ = conn.close().await;
    Ok(written)
}
