//! Invoice field extraction module.

mod extractor;
pub mod patterns;

pub use extractor::{normalize_whitespace, FieldExtractor};
pub use patterns::PatternLibrary;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::config::UNKNOWN_VENDOR;

/// Placeholder for an undetected invoice number or date.
pub const NOT_AVAILABLE: &str = "N/A";

/// Structured fields produced by one extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    pub invoice_no: String,
    /// Matched date text, not normalised.
    pub date: String,
    pub total: Decimal,
    pub vendor: String,
    /// Sum of the weights of the fields that matched, capped at 1.0.
    pub confidence: f32,
}

impl Default for ExtractedFields {
    fn default() -> Self {
        Self {
            invoice_no: NOT_AVAILABLE.to_string(),
            date: NOT_AVAILABLE.to_string(),
            total: Decimal::ZERO,
            vendor: UNKNOWN_VENDOR.to_string(),
            confidence: 0.0,
        }
    }
}

/// A problem the extractor recovered from.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// Input too short to hold invoice data.
    #[error("text too short to extract from ({length} characters)")]
    NoUsableText { length: usize },

    /// A total candidate matched but is not a valid amount.
    #[error("could not parse amount `{raw}`: {reason}")]
    AmountParse { raw: String, reason: String },
}

/// Extraction output together with anything that went wrong on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub fields: ExtractedFields,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExtractionWarning>,
}

impl Extraction {
    /// True when at least one matcher failed and fields may be incomplete.
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}
