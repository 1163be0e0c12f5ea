//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Confidence at or above which an extraction is accepted without a template.
pub const DEFAULT_ACCEPT_THRESHOLD: f32 = 0.75;

/// Vendor name stored when no vendor pattern matched.
pub const UNKNOWN_VENDOR: &str = "Auto-Detected Vendor";

/// Main configuration for PDF2Sheet Auto.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Vendor resolution configuration.
    pub resolver: ResolverConfig,

    /// Template sync configuration.
    pub sync: SyncConfig,

    /// Database configuration.
    pub storage: StorageConfig,

    /// Spreadsheet output configuration.
    pub sheet: SheetConfig,

    /// PDF decoding configuration.
    pub pdf: PdfConfig,

    /// Upper bound for a single upload, in seconds.
    pub upload_timeout_secs: u64,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Normalised text shorter than this is treated as unusable.
    pub min_text_length: usize,

    /// Confidence contributed by each detected field.
    pub weights: ConfidenceWeights,

    /// Ordered pattern tables per field.
    pub patterns: PatternConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_length: 10,
            weights: ConfidenceWeights::default(),
            patterns: PatternConfig::default(),
        }
    }
}

/// Per-field confidence weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub vendor: f32,
    pub invoice_no: f32,
    pub total: f32,
    pub date: f32,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            vendor: 0.30,
            invoice_no: 0.25,
            total: 0.25,
            date: 0.20,
        }
    }
}

/// A vendor detection rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorRule {
    /// Case-insensitive regex, tested against whitespace-normalised text.
    pub pattern: String,
    /// Canonical vendor name assigned on match.
    pub name: String,
}

/// An invoice number detection rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceNoRule {
    /// Regex with the number in capture group 1.
    pub pattern: String,
    /// Captures must be strictly longer than this.
    pub min_len: usize,
}

/// Ordered regex tables for every extracted field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub vendors: Vec<VendorRule>,
    pub invoice_numbers: Vec<InvoiceNoRule>,
    pub totals: Vec<String>,
    pub dates: Vec<String>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        let vendor = |pattern: &str, name: &str| VendorRule {
            pattern: pattern.to_string(),
            name: name.to_string(),
        };
        let invoice = |pattern: &str, min_len: usize| InvoiceNoRule {
            pattern: pattern.to_string(),
            min_len,
        };

        Self {
            vendors: vec![
                vendor(r"\bamazon(?:\.in|\.com)?\b", "Amazon"),
                vendor(r"\bflipkart\b", "Flipkart"),
                vendor(r"\bmyntra\b", "Myntra"),
                vendor(r"\bairtel\b", "Airtel"),
                vendor(r"\b(?:reliance\s+)?jio\b", "Jio"),
                vendor(r"\bvodafone(?:\s+idea)?\b", "Vi"),
                vendor(r"\bbsnl\b", "BSNL"),
                vendor(r"\bswiggy\b", "Swiggy"),
                vendor(r"\bzomato\b", "Zomato"),
                vendor(r"\buber\b", "Uber"),
                vendor(r"\bola\s*cabs\b|\bani\s+technologies\b", "Ola"),
                vendor(r"\bnetflix\b", "Netflix"),
                vendor(r"\bmicrosoft\b", "Microsoft"),
                vendor(r"\bgoogle\b", "Google"),
                vendor(r"\bapple\b", "Apple"),
                vendor(r"\badobe\b", "Adobe"),
                vendor(r"\btata\s+power\b", "Tata Power"),
                vendor(r"\bvi\b", "Vi"),
            ],
            invoice_numbers: vec![
                invoice(
                    r"(?i)\b(?:invoice|bill|receipt|order)\s*(?:no\.?|number|num|#|id)\s*[:#.\-]?\s*([A-Z0-9/\-]*\d[A-Z0-9/\-]*)",
                    3,
                ),
                invoice(
                    r"(?i)\b(?:invoice|bill|statement|account|id)\s*(?:no\.?|number|#)?\s*[:#]?\s*([A-Z0-9/\-]*\d[A-Z0-9/\-]*)",
                    5,
                ),
            ],
            totals: vec![
                r"(?i)\b(?:grand\s+total|sub\s*-?\s*total|total(?:\s+(?:payable|amount|due))?|amount(?:\s+(?:payable|due|paid))?|net\s+payable|payable|balance(?:\s+due)?)\s*[:\-]?\s*(?:₹|rs\.?|inr|usd|\$)?\s*(\d[\d,]*\.\d{2})\b"
                    .to_string(),
                r"(?:₹|\b(?i:rs\.?|inr))\s*(\d[\d,]*\.\d{2})\b".to_string(),
            ],
            dates: vec![
                r"(?i)\b(?:invoice\s+date|bill\s+date|billing\s+date|statement\s+date|date\s+of\s+issue|issued(?:\s+on)?|date)\s*[:\-]?\s*(\d{1,2}[\-/\s](?:[a-z]{3,10}|\d{1,2})[\-/\s]\d{2,4})"
                    .to_string(),
                r"(?i)\b(\d{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+\d{4})\b"
                    .to_string(),
                r"(?i)\b((?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4})\b"
                    .to_string(),
                r"\b(\d{4}-\d{2}-\d{2})\b".to_string(),
                r"\b(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4})\b".to_string(),
            ],
        }
    }
}

/// Vendor resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Extractor confidence needed to skip manual mapping.
    pub accept_threshold: f32,

    /// Only apply a template when its vendor name equals the extracted one.
    pub require_vendor_match: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            require_vendor_match: false,
        }
    }
}

/// Template sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Vendor values that mark a record as never mapped.
    pub unmapped_vendors: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            unmapped_vendors: vec![UNKNOWN_VENDOR.to_string(), "Unknown Vendor".to_string()],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("pdf2sheet.db"),
        }
    }
}

/// Spreadsheet output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Push resolved invoices to the sheet.
    pub enabled: bool,

    /// CSV file acting as the spreadsheet.
    pub output: PathBuf,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output: PathBuf::from("invoices.csv"),
        }
    }
}

/// PDF decoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum decoded text length to consider the PDF readable.
    pub min_text_length: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self { min_text_length: 10 }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::from)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let threshold = self.resolver.accept_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Value {
                key: "resolver.accept_threshold".to_string(),
                reason: format!("{} is outside 0..=1", threshold),
            });
        }

        let w = self.extraction.weights;
        for (key, value) in [
            ("vendor", w.vendor),
            ("invoice_no", w.invoice_no),
            ("total", w.total),
            ("date", w.date),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Value {
                    key: format!("extraction.weights.{}", key),
                    reason: format!("{} is outside 0..=1", value),
                });
            }
        }

        Ok(())
    }

    /// Upload timeout, falling back to one minute when unset.
    pub fn upload_timeout(&self) -> std::time::Duration {
        let secs = if self.upload_timeout_secs == 0 {
            60
        } else {
            self.upload_timeout_secs
        };
        std::time::Duration::from_secs(secs)
    }
}
