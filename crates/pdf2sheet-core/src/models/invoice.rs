//! Persisted invoice records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Processing state of a stored invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Stored, not yet pushed to the spreadsheet.
    #[default]
    Pending,
    /// Successfully appended to the spreadsheet.
    Processed,
    /// Spreadsheet append was attempted and failed.
    Flagged,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Processed => "processed",
            InvoiceStatus::Flagged => "flagged",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(InvoiceStatus::Pending),
            "processed" => Ok(InvoiceStatus::Processed),
            "flagged" => Ok(InvoiceStatus::Flagged),
            other => Err(format!("unknown invoice status: {}", other)),
        }
    }
}

/// Canonical shape of a stored invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: i64,
    /// Owner of the record.
    pub user_id: String,
    pub sender_email: String,
    pub vendor: String,
    pub invoice_no: String,
    /// Date text exactly as matched in the document.
    pub date: String,
    pub total: Decimal,
    pub confidence: f32,
    /// Full decoded text, kept for auditing.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub raw_text: String,
    /// Location of the original upload.
    pub file_path: String,
    pub status: InvoiceStatus,
    pub needs_mapping: bool,
    pub created_at: DateTime<Utc>,
}

/// Values for a record that has not been inserted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub user_id: String,
    pub sender_email: String,
    pub vendor: String,
    pub invoice_no: String,
    pub date: String,
    pub total: Decimal,
    pub confidence: f32,
    pub raw_text: String,
    pub file_path: String,
    pub status: InvoiceStatus,
    pub needs_mapping: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("Processed".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Processed));
        assert_eq!(" flagged ".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Flagged));
        assert!("done".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&InvoiceStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
