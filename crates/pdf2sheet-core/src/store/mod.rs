//! Persistence for vendor templates and invoice records.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::models::invoice::{InvoiceRecord, InvoiceStatus, NewInvoice};
use crate::models::template::{ColumnMapping, VendorTemplate};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage of per-user, per-sender vendor templates.
pub trait TemplateStore {
    /// Fetch the template for `(user_id, sender_email)`.
    fn find_template(&self, user_id: &str, sender_email: &str) -> Result<Option<VendorTemplate>>;

    /// Create the template with version 1, or replace its vendor name and
    /// mapping and bump its version, in one atomic step.
    fn upsert_template(
        &self,
        user_id: &str,
        sender_email: &str,
        vendor_name: &str,
        mapping: &[ColumnMapping],
    ) -> Result<VendorTemplate>;

    /// All templates owned by `user_id`, ordered by sender.
    fn list_templates(&self, user_id: &str) -> Result<Vec<VendorTemplate>>;
}

/// Filter for listing stored invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Maximum number of rows; `None` returns everything.
    pub limit: Option<usize>,
    /// Case-insensitive substring matched against vendor and invoice number.
    pub search: Option<String>,
}

impl HistoryQuery {
    /// Most recent `limit` invoices.
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() {
            None
        } else {
            Some(search)
        };
        self
    }
}

/// Storage of uploaded invoice records.
pub trait InvoiceStore {
    /// Insert a new record and return it with its id and creation time.
    fn insert_invoice(&self, invoice: NewInvoice) -> Result<InvoiceRecord>;

    fn get_invoice(&self, id: i64) -> Result<InvoiceRecord>;

    fn set_status(&self, id: i64, status: InvoiceStatus) -> Result<()>;

    /// Relabel every record of `(user_id, sender_email)` whose vendor is one
    /// of `unmapped_vendors`, marking it fully confident and mapped.
    /// Returns the number of records changed.
    fn upgrade_unmapped(
        &self,
        user_id: &str,
        sender_email: &str,
        vendor_name: &str,
        unmapped_vendors: &[String],
    ) -> Result<usize>;

    /// Records owned by `user_id`, newest first.
    fn list_invoices(&self, user_id: &str, query: &HistoryQuery) -> Result<Vec<InvoiceRecord>>;
}
