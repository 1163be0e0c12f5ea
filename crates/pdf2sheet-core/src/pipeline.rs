//! Upload flow: extract, resolve, persist, notify and sync to the sheet.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::extract::{Extraction, FieldExtractor};
use crate::models::config::AppConfig;
use crate::models::invoice::{InvoiceRecord, InvoiceStatus, NewInvoice};
use crate::models::template::normalize_sender;
use crate::resolver::{Resolution, VendorResolver};
use crate::sink::{render_notification, LogNotifier, Notifier, SheetSink};
use crate::store::{InvoiceStore, TemplateStore};

/// Sender recorded when an upload carries none.
pub const DEFAULT_SENDER: &str = "unknown@vendor.com";

/// One uploaded document, already decoded to text.
#[derive(Debug, Clone)]
pub struct Upload {
    pub user_id: String,
    pub sender_email: String,
    pub file_path: String,
    pub text: String,
}

impl Upload {
    pub fn new(user_id: impl Into<String>, file_path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            sender_email: DEFAULT_SENDER.to_string(),
            file_path: file_path.into(),
            text: text.into(),
        }
    }

    /// Set the sender; blank values keep the default.
    pub fn with_sender(mut self, sender_email: &str) -> Self {
        let sender = normalize_sender(sender_email);
        if !sender.is_empty() {
            self.sender_email = sender;
        }
        self
    }
}

/// What happened on the spreadsheet side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SheetOutcome {
    /// Vendor still needs mapping.
    Skipped,
    /// No sheet configured.
    Disabled,
    Appended,
    Failed(String),
}

/// Result of processing one upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub record: InvoiceRecord,
    pub extraction: Extraction,
    pub resolution: Resolution,
    pub sheet: SheetOutcome,
}

/// Runs uploads through extraction, resolution and the collaborators.
pub struct InvoicePipeline<S> {
    extractor: FieldExtractor,
    resolver: VendorResolver,
    store: S,
    sheet: Option<Box<dyn SheetSink>>,
    notifier: Box<dyn Notifier>,
}

impl<S> InvoicePipeline<S>
where
    S: TemplateStore + InvoiceStore,
{
    pub fn new(extractor: FieldExtractor, resolver: VendorResolver, store: S) -> Self {
        Self {
            extractor,
            resolver,
            store,
            sheet: None,
            notifier: Box::new(LogNotifier),
        }
    }

    /// Build extractor and resolver from `config`.
    pub fn from_config(config: &AppConfig, store: S) -> Result<Self> {
        let extractor = FieldExtractor::from_config(&config.extraction)?;
        let resolver = VendorResolver::from_config(&config.resolver);
        Ok(Self::new(extractor, resolver, store))
    }

    pub fn with_sheet(mut self, sheet: Box<dyn SheetSink>) -> Self {
        self.sheet = Some(sheet);
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one upload.
    ///
    /// The record is always stored. Notification problems are only logged.
    /// Resolved records are appended to the sheet and marked processed, or
    /// flagged when the append fails; unresolved ones stay pending.
    pub fn process(&self, upload: Upload) -> Result<ProcessOutcome> {
        let extraction = self.extractor.extract(&upload.text);
        for warning in &extraction.warnings {
            warn!("{}: {}", upload.file_path, warning);
        }

        let mut sender_email = normalize_sender(&upload.sender_email);
        if sender_email.is_empty() {
            sender_email = DEFAULT_SENDER.to_string();
        }

        let resolution = self.resolver.resolve(
            &self.store,
            &upload.user_id,
            &sender_email,
            &extraction.fields,
        );

        let fields = &extraction.fields;
        let mut record = self.store.insert_invoice(NewInvoice {
            user_id: upload.user_id,
            sender_email,
            vendor: resolution.vendor.clone(),
            invoice_no: fields.invoice_no.clone(),
            date: fields.date.clone(),
            total: fields.total,
            confidence: resolution.confidence,
            raw_text: upload.text,
            file_path: upload.file_path,
            status: InvoiceStatus::Pending,
            needs_mapping: resolution.needs_mapping,
        })?;

        info!(
            "Stored invoice {} ({}, confidence {:.2}{})",
            record.id,
            record.vendor,
            record.confidence,
            if record.needs_mapping { ", needs mapping" } else { "" }
        );

        if let Err(e) = self.notifier.notify(&render_notification(&record)) {
            warn!("Notification for invoice {} failed: {}", record.id, e);
        }

        let sheet = self.sync_sheet(&mut record)?;

        Ok(ProcessOutcome {
            record,
            extraction,
            resolution,
            sheet,
        })
    }

    fn sync_sheet(&self, record: &mut InvoiceRecord) -> Result<SheetOutcome> {
        if record.needs_mapping {
            return Ok(SheetOutcome::Skipped);
        }
        let Some(sheet) = &self.sheet else {
            return Ok(SheetOutcome::Disabled);
        };

        let (status, outcome) = match sheet.append(record) {
            Ok(()) => (InvoiceStatus::Processed, SheetOutcome::Appended),
            Err(e) => {
                warn!("Sheet append failed for invoice {}: {}", record.id, e);
                (InvoiceStatus::Flagged, SheetOutcome::Failed(e.to_string()))
            }
        };

        self.store.set_status(record.id, status)?;
        record.status = status;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::sink::Notification;
    use crate::store::{HistoryQuery, SqliteStore};
    use crate::sync::TemplateSync;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::sync::{Arc, Mutex};

    const AMAZON: &str = "Amazon.in Tax Invoice\nInvoice Number: INV-2024-001\n\
                          Total Payable: ₹1,250.00\nDate: 05 Nov 2025";
    const UNKNOWN: &str = "Beta Traders Pvt Ltd\nThank you for your business\nTotal 99.00";

    #[derive(Default, Clone)]
    struct MemorySheet {
        rows: Arc<Mutex<Vec<String>>>,
    }

    impl SheetSink for MemorySheet {
        fn append(&self, record: &InvoiceRecord) -> std::result::Result<(), SinkError> {
            self.rows.lock().unwrap().push(record.invoice_no.clone());
            Ok(())
        }
    }

    struct FailingSheet;

    impl SheetSink for FailingSheet {
        fn append(&self, _: &InvoiceRecord) -> std::result::Result<(), SinkError> {
            Err(SinkError::Write("quota exceeded".to_string()))
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&self, _: &Notification) -> std::result::Result<(), SinkError> {
            Err(SinkError::Missing("smtp".to_string()))
        }
    }

    fn pipeline() -> InvoicePipeline<SqliteStore> {
        InvoicePipeline::from_config(&AppConfig::default(), SqliteStore::open_in_memory().unwrap())
            .unwrap()
    }

    #[test]
    fn test_end_to_end_amazon() {
        let sheet = MemorySheet::default();
        let pipeline = pipeline().with_sheet(Box::new(sheet.clone()));

        let outcome = pipeline
            .process(Upload::new("u1", "amazon.pdf", AMAZON).with_sender("Orders@Amazon.in"))
            .unwrap();

        assert_eq!(outcome.record.vendor, "Amazon");
        assert_eq!(outcome.record.total, Decimal::new(125000, 2));
        assert_eq!(outcome.record.sender_email, "orders@amazon.in");
        assert!(!outcome.record.needs_mapping);
        assert_eq!(outcome.record.status, InvoiceStatus::Processed);
        assert_eq!(outcome.sheet, SheetOutcome::Appended);
        assert_eq!(*sheet.rows.lock().unwrap(), vec!["INV-2024-001".to_string()]);

        let stored = pipeline.store().get_invoice(outcome.record.id).unwrap();
        assert_eq!(stored.status, InvoiceStatus::Processed);
    }

    #[test]
    fn test_unresolved_upload_stays_pending() {
        let sheet = MemorySheet::default();
        let pipeline = pipeline().with_sheet(Box::new(sheet.clone()));

        let outcome = pipeline.process(Upload::new("u1", "beta.pdf", UNKNOWN)).unwrap();

        assert_eq!(outcome.record.sender_email, DEFAULT_SENDER);
        assert_eq!(outcome.record.vendor, "Auto-Detected Vendor");
        assert!(outcome.record.needs_mapping);
        assert_eq!(outcome.record.status, InvoiceStatus::Pending);
        assert_eq!(outcome.sheet, SheetOutcome::Skipped);
        assert!(sheet.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_saved_template_resolves_next_upload() {
        let pipeline = pipeline();
        let first = pipeline
            .process(Upload::new("u1", "beta.pdf", UNKNOWN).with_sender("bills@beta.com"))
            .unwrap();
        assert!(first.record.needs_mapping);

        let synced = TemplateSync::default()
            .save(pipeline.store(), "u1", "bills@beta.com", "Beta Traders", Vec::new())
            .unwrap();
        assert_eq!(synced.upgraded, 1);

        let second = pipeline
            .process(Upload::new("u1", "beta-2.pdf", UNKNOWN).with_sender("bills@beta.com"))
            .unwrap();
        assert_eq!(second.record.vendor, "Beta Traders");
        assert_eq!(second.record.confidence, 1.0);
        assert_eq!(second.sheet, SheetOutcome::Disabled);
        assert_eq!(second.record.status, InvoiceStatus::Pending);

        let history = pipeline
            .store()
            .list_invoices("u1", &HistoryQuery::default())
            .unwrap();
        assert!(history.iter().all(|r| r.vendor == "Beta Traders"));
    }

    #[test]
    fn test_sender_set_directly_is_normalised() {
        let pipeline = pipeline();
        TemplateSync::default()
            .save(pipeline.store(), "u1", "bills@beta.com", "Beta Traders", Vec::new())
            .unwrap();

        let mut upload = Upload::new("u1", "beta.pdf", UNKNOWN);
        upload.sender_email = "  Bills@Beta.COM".to_string();
        let outcome = pipeline.process(upload).unwrap();

        assert_eq!(outcome.record.sender_email, "bills@beta.com");
        assert_eq!(outcome.record.vendor, "Beta Traders");
        assert!(!outcome.record.needs_mapping);
    }

    #[test]
    fn test_sheet_failure_flags_record() {
        let pipeline = pipeline()
            .with_sheet(Box::new(FailingSheet))
            .with_notifier(Box::new(FailingNotifier));

        let outcome = pipeline.process(Upload::new("u1", "amazon.pdf", AMAZON)).unwrap();

        assert_eq!(outcome.record.status, InvoiceStatus::Flagged);
        assert_eq!(
            outcome.sheet,
            SheetOutcome::Failed("write failed: quota exceeded".to_string())
        );
        assert_eq!(
            pipeline.store().get_invoice(outcome.record.id).unwrap().status,
            InvoiceStatus::Flagged
        );
    }

    #[test]
    fn test_empty_text_is_still_stored() {
        let pipeline = pipeline();
        let outcome = pipeline.process(Upload::new("u1", "blank.pdf", "")).unwrap();

        assert!(outcome.extraction.is_degraded());
        assert_eq!(outcome.record.confidence, 0.0);
        assert!(outcome.record.needs_mapping);
    }
}
