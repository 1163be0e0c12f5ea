//! Outbound collaborators: the spreadsheet and the user notification.

use serde::Serialize;
use tracing::info;

use crate::error::SinkError;
use crate::models::invoice::InvoiceRecord;

/// Destination for resolved invoices.
pub trait SheetSink: Send + Sync {
    /// Append one row for `record`.
    fn append(&self, record: &InvoiceRecord) -> Result<(), SinkError>;
}

/// Confirmation sent after an upload is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Delivers upload confirmations.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), SinkError>;
}

/// Build the confirmation for `record`, addressed to its sender.
pub fn render_notification(record: &InvoiceRecord) -> Notification {
    let subject = format!(
        "✔ Extraction Complete: {} (#{})",
        record.vendor, record.invoice_no
    );

    let destination = if record.needs_mapping {
        "It needs a vendor mapping before it can be synced to your sheet."
    } else {
        "The data has been synced to your sheet."
    };
    let body = format!(
        "Hello,\n\n\
         Your invoice for {} has been processed. {}\n\n\
         Invoice No: #{}\n\
         Total Amount: {}\n\
         Processed on: {}\n",
        record.vendor,
        destination,
        record.invoice_no,
        record.total,
        record.created_at.format("%Y-%m-%d"),
    );

    Notification {
        recipient: record.sender_email.clone(),
        subject,
        body,
    }
}

/// Notifier that writes confirmations to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), SinkError> {
        info!("Notify {}: {}", notification.recipient, notification.subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::InvoiceStatus;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn record(needs_mapping: bool) -> InvoiceRecord {
        InvoiceRecord {
            id: 1,
            user_id: "u1".to_string(),
            sender_email: "orders@amazon.in".to_string(),
            vendor: "Amazon".to_string(),
            invoice_no: "INV-2024-001".to_string(),
            date: "05 Nov 2025".to_string(),
            total: Decimal::new(125000, 2),
            confidence: 1.0,
            raw_text: String::new(),
            file_path: "a.pdf".to_string(),
            status: InvoiceStatus::Pending,
            needs_mapping,
            created_at: Utc.with_ymd_and_hms(2025, 11, 5, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_notification() {
        let n = render_notification(&record(false));
        assert_eq!(n.recipient, "orders@amazon.in");
        assert_eq!(n.subject, "✔ Extraction Complete: Amazon (#INV-2024-001)");
        assert!(n.body.contains("Total Amount: 1250.00"));
        assert!(n.body.contains("Processed on: 2025-11-05"));
        assert!(n.body.contains("synced to your sheet"));
    }

    #[test]
    fn test_render_mentions_pending_mapping() {
        let n = render_notification(&record(true));
        assert!(n.body.contains("needs a vendor mapping"));
    }

    #[test]
    fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify(&render_notification(&record(false))).is_ok());
    }
}
