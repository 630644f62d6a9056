//! One sync cycle: scan, exchange lists, confirm, download.

use anyhow::{Context, Result};
use humansize::{format_size, DECIMAL};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::confirm::{prompt_download, render_listing};
use crate::download::{download_all, DownloadReport};
use crate::exchange::fetch_missing;
use crate::inventory;
use crate::logger::Logger;
use crate::record::FileRecord;
use crate::report::DownloadLog;

#[derive(Debug)]
pub struct RunSummary {
    pub local_files: usize,
    pub missing: Vec<FileRecord>,
    pub confirmed: bool,
    /// Present only when a download ran
    pub report: Option<DownloadReport>,
}

/// Run one full cycle against `config.host`.
///
/// `input` answers the download prompt and `out` receives the listing and
/// prompt. Fatal errors (scan, control connection, protocol, prompt input)
/// are returned; per-file download failures are only reported.
pub async fn run<R: BufRead, W: Write>(
    config: &Config,
    input: &mut R,
    out: &mut W,
    logger: Arc<dyn Logger>,
) -> Result<RunSummary> {
    let started = Instant::now();
    let sync_job_id = uuid::Uuid::new_v4().to_string();
    logger.start(&config.sync_dir, &config.host);
    writeln!(
        out,
        "\nSyncing directory {} with server...\n",
        config.sync_dir.display()
    )?;

    let local = inventory::scan(&config.sync_dir).context("error retrieving local file list")?;
    let missing = fetch_missing(&config.host, &local)
        .await
        .context("error exchanging file lists with server")?;
    logger.listed(local.len(), missing.len());

    let mut summary = RunSummary {
        local_files: local.len(),
        missing,
        confirmed: false,
        report: None,
    };

    if summary.missing.is_empty() {
        writeln!(out, "Directory is up to date.")?;
        logger.done(0, 0, 0, started.elapsed().as_secs_f64());
        return Ok(summary);
    }

    summary.confirmed = if config.yes {
        render_listing(&summary.missing, out)?;
        true
    } else {
        prompt_download(&summary.missing, input, out)?
    };
    if !summary.confirmed {
        logger.done(0, 0, 0, started.elapsed().as_secs_f64());
        return Ok(summary);
    }

    writeln!(out)?;
    out.flush()?;
    let report = download_all(config, &summary.missing, Arc::clone(&logger)).await;
    writeln!(
        out,
        "\nDownloaded {} of {} file(s) ({})",
        report.succeeded(),
        summary.missing.len(),
        format_size(report.bytes(), DECIMAL)
    )?;
    if report.failed() > 0 {
        writeln!(out, "{} file(s) failed; run the sync again to retry.", report.failed())?;
    }

    if let Some(path) = &config.report_file {
        if let Err(e) = DownloadLog::new(path).record(&sync_job_id, &report) {
            eprintln!("error writing download report {}: {:#}", path.display(), e);
        }
    }
    logger.done(
        report.succeeded(),
        report.failed(),
        report.bytes(),
        started.elapsed().as_secs_f64(),
    );

    summary.report = Some(report);
    Ok(summary)
}
