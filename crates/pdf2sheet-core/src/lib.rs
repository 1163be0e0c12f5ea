//! Core library for PDF2Sheet Auto.
//!
//! This crate provides:
//! - PDF text decoding (lopdf + pdf-extract)
//! - Rule-based invoice field extraction with confidence scoring
//! - Vendor resolution against saved per-sender templates
//! - Template sync that relabels past uploads
//! - SQLite persistence, the upload pipeline and usage reports

pub mod error;
pub mod extract;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod sink;
pub mod store;
pub mod sync;

pub use error::{Pdf2SheetError, Result};
pub use extract::{ExtractedFields, Extraction, ExtractionWarning, FieldExtractor, PatternLibrary};
pub use models::config::{AppConfig, DEFAULT_ACCEPT_THRESHOLD};
pub use models::invoice::{InvoiceRecord, InvoiceStatus, NewInvoice};
pub use models::template::{ColumnMapping, InvoiceField, VendorTemplate};
pub use pdf::PdfProcessor;
pub use pipeline::{InvoicePipeline, ProcessOutcome, SheetOutcome, Upload};
pub use report::{build_report, Report};
pub use resolver::{Resolution, ResolutionSource, VendorResolver};
pub use sink::{LogNotifier, Notification, Notifier, SheetSink};
pub use store::{HistoryQuery, InvoiceStore, SqliteStore, TemplateStore};
pub use sync::{SyncOutcome, TemplateSync};
