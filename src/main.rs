//! Main entry point for the zipshrink CLI application.
//!
//! Every path given on the command line (directories are walked) is loaded,
//! minified and written back when the result is smaller.

use anyhow::{Result, bail};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use zipshrink::{Cli, Report, collect_files, minify_file};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let files = collect_files(&cli.paths).await?;
    let options = Arc::new(cli.options());
    let permits = Arc::new(Semaphore::new(cli.parallel.max(1)));

    // One task per file; an archive is never split across tasks.
    let mut tasks = JoinSet::new();
    for path in files {
        let options = options.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            minify_file(&path, &options).await
        });
    }

    let mut reports: Vec<Report> = Vec::new();
    let mut failures = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("{:#}", e);
                failures += 1;
            }
        }
    }

    let original: u64 = reports.iter().map(|r| r.original_size).sum();
    let saved: u64 = reports.iter().map(Report::saved).sum();
    info!(
        "{} files, {} saved ({})",
        reports.len(),
        format_size(saved),
        format_ratio(saved, original)
    );

    if failures > 0 {
        bail!("{} file(s) failed", failures);
    }
    Ok(())
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

fn format_ratio(saved: u64, original: u64) -> String {
    if original == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", saved as f64 * 100.0 / original as f64)
}
