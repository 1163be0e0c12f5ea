//! CSV file standing in for the user's spreadsheet.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use chrono::Utc;
use tracing::debug;

use pdf2sheet_core::error::SinkError;
use pdf2sheet_core::{InvoiceRecord, SheetSink};

const HEADER: [&str; 6] = ["invoice_no", "date", "total", "sender_email", "vendor", "synced_at"];

/// Appends one row per resolved invoice to a CSV file.
pub struct CsvSheet {
    path: PathBuf,
}

impl CsvSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SheetSink for CsvSheet {
    fn append(&self, record: &InvoiceRecord) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        let write = |e: csv::Error| SinkError::Write(e.to_string());

        if is_new {
            wtr.write_record(HEADER).map_err(write)?;
        }
        let total = record.total.to_string();
        let synced_at = Utc::now().to_rfc3339();
        wtr.write_record([
            record.invoice_no.as_str(),
            record.date.as_str(),
            total.as_str(),
            record.sender_email.as_str(),
            record.vendor.as_str(),
            synced_at.as_str(),
        ])
        .map_err(write)?;
        wtr.flush()?;

        debug!("Appended invoice {} to {}", record.id, self.path.display());
        Ok(())
    }
}
