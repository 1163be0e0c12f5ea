//! Vendor mapping templates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An invoice field that can be mapped to a spreadsheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvoiceField {
    InvoiceNo,
    Date,
    Total,
    Vendor,
}

impl InvoiceField {
    pub const ALL: [InvoiceField; 4] = [
        InvoiceField::InvoiceNo,
        InvoiceField::Date,
        InvoiceField::Total,
        InvoiceField::Vendor,
    ];

    /// Column name used when the user has not chosen one.
    pub fn default_column(self) -> &'static str {
        match self {
            InvoiceField::InvoiceNo => "Invoice Number",
            InvoiceField::Date => "Date",
            InvoiceField::Total => "Total",
            InvoiceField::Vendor => "Vendor",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceField::InvoiceNo => "invoiceNo",
            InvoiceField::Date => "date",
            InvoiceField::Total => "total",
            InvoiceField::Vendor => "vendor",
        }
    }
}

impl fmt::Display for InvoiceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "invoiceno" | "invoicenumber" | "invoice" => Ok(InvoiceField::InvoiceNo),
            "date" => Ok(InvoiceField::Date),
            "total" | "amount" => Ok(InvoiceField::Total),
            "vendor" => Ok(InvoiceField::Vendor),
            _ => Err(format!("unknown invoice field: {}", s)),
        }
    }
}

/// A single field-to-column association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub field: InvoiceField,
    pub column: String,
}

impl ColumnMapping {
    pub fn new(field: InvoiceField, column: impl Into<String>) -> Self {
        Self {
            field,
            column: column.into(),
        }
    }
}

impl FromStr for ColumnMapping {
    type Err = String;

    /// Parse `field=Column Name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, column) = s
            .split_once('=')
            .ok_or_else(|| format!("expected field=Column, got `{}`", s))?;
        let column = column.trim();
        if column.is_empty() {
            return Err(format!("empty column name for `{}`", field.trim()));
        }
        Ok(Self::new(field.trim().parse()?, column))
    }
}

/// Ordered mapping used when a template is saved without one.
pub fn default_mapping() -> Vec<ColumnMapping> {
    InvoiceField::ALL
        .iter()
        .map(|f| ColumnMapping::new(*f, f.default_column()))
        .collect()
}

/// Collapse duplicate fields, keeping the last assignment at the position of the first.
pub fn normalize_mapping(mapping: Vec<ColumnMapping>) -> Vec<ColumnMapping> {
    let mut out: Vec<ColumnMapping> = Vec::with_capacity(mapping.len());
    for entry in mapping {
        match out.iter_mut().find(|m| m.field == entry.field) {
            Some(existing) => existing.column = entry.column,
            None => out.push(entry),
        }
    }
    out
}

/// A saved per-user, per-sender template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorTemplate {
    pub id: i64,
    pub user_id: String,
    pub sender_email: String,
    pub vendor_name: String,
    pub mapping: Vec<ColumnMapping>,
    pub version: u32,
    pub last_updated: DateTime<Utc>,
}

/// Normalise a sender e-mail to the stored key form.
pub fn normalize_sender(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_parsing() {
        assert_eq!("invoiceNo".parse::<InvoiceField>(), Ok(InvoiceField::InvoiceNo));
        assert_eq!("invoice_no".parse::<InvoiceField>(), Ok(InvoiceField::InvoiceNo));
        assert_eq!("Total".parse::<InvoiceField>(), Ok(InvoiceField::Total));
        assert!("iban".parse::<InvoiceField>().is_err());
    }

    #[test]
    fn test_column_mapping_parsing() {
        let mapping: ColumnMapping = "invoiceNo = Bill No".parse().unwrap();
        assert_eq!(mapping, ColumnMapping::new(InvoiceField::InvoiceNo, "Bill No"));

        assert!("total".parse::<ColumnMapping>().is_err());
        assert!("total=".parse::<ColumnMapping>().is_err());
    }

    #[test]
    fn test_normalize_mapping_keeps_order() {
        let mapping = normalize_mapping(vec![
            ColumnMapping::new(InvoiceField::Total, "Amount"),
            ColumnMapping::new(InvoiceField::Date, "Date"),
            ColumnMapping::new(InvoiceField::Total, "Grand Total"),
        ]);

        assert_eq!(
            mapping,
            vec![
                ColumnMapping::new(InvoiceField::Total, "Grand Total"),
                ColumnMapping::new(InvoiceField::Date, "Date"),
            ]
        );
    }

    #[test]
    fn test_default_mapping() {
        let mapping = default_mapping();
        assert_eq!(mapping.len(), 4);
        assert_eq!(mapping[0].column, "Invoice Number");
    }

    #[test]
    fn test_normalize_sender() {
        assert_eq!(normalize_sender("  Billing@Amazon.IN "), "billing@amazon.in");
    }
}
