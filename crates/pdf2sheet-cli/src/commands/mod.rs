//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod history;
pub mod process;
pub mod report;
pub mod template;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use pdf2sheet_core::pdf::read_document;
use pdf2sheet_core::{AppConfig, InvoicePipeline, ProcessOutcome, SqliteStore, Upload};

use crate::sheet::CsvSheet;

/// `<config_dir>/pdf2sheet/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pdf2sheet")
        .join("config.json")
}

/// Config file to use: the explicit one, else the default location.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the configuration. An explicit path must exist; the default one may not.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<AppConfig> {
    if let Some(path) = explicit {
        return Ok(AppConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading configuration from {}", path.display());
        Ok(AppConfig::from_file(&path)?)
    } else {
        Ok(AppConfig::default())
    }
}

pub fn open_store(config: &AppConfig) -> anyhow::Result<SqliteStore> {
    if let Some(parent) = config
        .storage
        .database_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqliteStore::open(&config.storage.database_path)?)
}

/// Decode and process one file, bounded by the configured upload timeout.
///
/// The deadline is checked once decoding finishes and before anything is
/// written, so a timed-out upload leaves no record or sheet row behind.
pub async fn upload_file(
    config: &AppConfig,
    user_id: &str,
    sender: Option<&str>,
    path: &Path,
) -> anyhow::Result<ProcessOutcome> {
    let started = Instant::now();
    let timeout = config.upload_timeout();
    let config = config.clone();
    let user_id = user_id.to_string();
    let sender = sender.map(str::to_string);
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        process_blocking(&config, &user_id, sender.as_deref(), &path, started, timeout)
    })
    .await?
}

fn process_blocking(
    config: &AppConfig,
    user_id: &str,
    sender: Option<&str>,
    path: &Path,
    started: Instant,
    timeout: Duration,
) -> anyhow::Result<ProcessOutcome> {
    let text = read_document(path, config.pdf.min_text_length)?;

    if started.elapsed() >= timeout {
        anyhow::bail!(
            "Processing timed out after {}s while decoding {}; nothing was stored",
            timeout.as_secs(),
            path.display()
        );
    }

    let mut pipeline = InvoicePipeline::from_config(config, open_store(config)?)?;
    if config.sheet.enabled {
        pipeline = pipeline.with_sheet(Box::new(CsvSheet::new(&config.sheet.output)));
    }

    let mut upload = Upload::new(user_id, path.display().to_string(), text);
    if let Some(sender) = sender {
        upload = upload.with_sender(sender);
    }
    Ok(pipeline.process(upload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf2sheet_core::{HistoryQuery, InvoiceStore};

    const AMAZON: &str = "Amazon.in Tax Invoice\nInvoice Number: INV-2024-001\n\
                          Total Payable: ₹1,250.00\nDate: 05 Nov 2025\n";

    fn config(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.database_path = dir.join("pdf2sheet.db");
        config.sheet.enabled = true;
        config.sheet.output = dir.join("invoices.csv");
        config
    }

    #[test]
    fn test_expired_deadline_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let input = dir.path().join("amazon.txt");
        std::fs::write(&input, AMAZON).unwrap();

        let err = process_blocking(
            &config,
            "alice",
            Some("orders@amazon.in"),
            &input,
            Instant::now(),
            Duration::ZERO,
        )
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));

        let store = open_store(&config).unwrap();
        let records = store.list_invoices("alice", &HistoryQuery::default()).unwrap();
        assert!(records.is_empty());
        assert!(!config.sheet.output.exists());
    }

    #[test]
    fn test_within_deadline_processes() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let input = dir.path().join("amazon.txt");
        std::fs::write(&input, AMAZON).unwrap();

        let outcome = process_blocking(
            &config,
            "alice",
            Some("orders@amazon.in"),
            &input,
            Instant::now(),
            Duration::from_secs(60),
        )
        .unwrap();
        assert_eq!(outcome.record.vendor, "Amazon");
        assert!(config.sheet.output.exists());
    }
}
