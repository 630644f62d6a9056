use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::download::DownloadReport;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum DownloadStatus {
    Completed,
    Failed,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct DownloadLogEntry {
    pub timestamp: String,
    pub sync_job_id: String,
    pub path: String,
    pub destination: PathBuf,
    pub status: DownloadStatus,
    pub bytes_written: u64,
    pub error: Option<String>,
}

/// JSONL record of per-file download outcomes, one line per file
pub struct DownloadLog {
    log_file_path: PathBuf,
}

impl DownloadLog {
    pub fn new(log_file_path: impl Into<PathBuf>) -> Self {
        DownloadLog {
            log_file_path: log_file_path.into(),
        }
    }

    pub fn record(&self, sync_job_id: &str, report: &DownloadReport) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .context("Failed to open download report file")?;
        let mut writer = BufWriter::new(file);
        let timestamp = Utc::now().to_rfc3339();
        for outcome in &report.outcomes {
            let (status, bytes_written, error) = match &outcome.result {
                Ok(bytes) => (DownloadStatus::Completed, *bytes, None),
                Err(e) => (DownloadStatus::Failed, 0, Some(format!("{:#}", e))),
            };
            let entry = DownloadLogEntry {
                timestamp: timestamp.clone(),
                sync_job_id: sync_job_id.to_string(),
                path: outcome.path.clone(),
                destination: outcome.destination.clone(),
                status,
                bytes_written,
                error,
            };
            serde_json::to_writer(&mut writer, &entry)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn read_log(&self) -> Result<Vec<DownloadLogEntry>> {
        use std::fs::File;
        use std::io::{BufRead, BufReader};

        if !self.log_file_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.log_file_path)
            .context("Failed to open download report file for reading")?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: DownloadLogEntry = serde_json::from_str(&line)?;
            entries.push(entry);
        }
        Ok(entries)
    }
}
