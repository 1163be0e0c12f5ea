//! Rule-based invoice field extractor.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::patterns::PatternLibrary;
use super::{ExtractedFields, Extraction, ExtractionWarning};
use crate::error::ConfigError;
use crate::models::config::{ConfidenceWeights, ExtractionConfig};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Characters of source text included in log lines.
const LOG_CONTEXT_CHARS: usize = 120;

/// Extracts invoice number, date, vendor and total from decoded PDF text.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    library: PatternLibrary,
    weights: ConfidenceWeights,
    min_text_length: usize,
}

impl FieldExtractor {
    /// Create an extractor over the given pattern tables.
    pub fn new(library: PatternLibrary, weights: ConfidenceWeights) -> Self {
        Self {
            library,
            weights,
            min_text_length: ExtractionConfig::default().min_text_length,
        }
    }

    /// Build an extractor from configuration, compiling its patterns.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let library = PatternLibrary::from_config(&config.patterns)?;
        Ok(Self::new(library, config.weights).with_min_text_length(config.min_text_length))
    }

    /// Set the minimum normalised length below which text is ignored.
    pub fn with_min_text_length(mut self, min: usize) -> Self {
        self.min_text_length = min;
        self
    }

    /// Extract all fields from `text`.
    ///
    /// Never fails: fields that cannot be resolved keep their sentinel values
    /// and recovered problems are reported in [`Extraction::warnings`].
    pub fn extract(&self, text: &str) -> Extraction {
        let text = normalize_whitespace(text);
        let mut fields = ExtractedFields::default();
        let mut warnings = Vec::new();

        let length = text.chars().count();
        if length < self.min_text_length {
            debug!("Skipping extraction, only {} characters of text", length);
            warnings.push(ExtractionWarning::NoUsableText { length });
            return Extraction { fields, warnings };
        }

        let mut score = 0.0f32;

        if let Some(vendor) = self.match_vendor(&text) {
            fields.vendor = vendor;
            score += self.weights.vendor;
        }

        if let Some(invoice_no) = self.match_invoice_no(&text) {
            fields.invoice_no = invoice_no;
            score += self.weights.invoice_no;
        }

        let (total, total_warnings) = self.match_total(&text);
        for warning in &total_warnings {
            warn!("{} in text: {}", warning, truncate(&text, LOG_CONTEXT_CHARS));
        }
        warnings.extend(total_warnings);
        if let Some(total) = total {
            fields.total = total;
            score += self.weights.total;
        }

        if let Some(date) = self.match_date(&text) {
            fields.date = date;
            score += self.weights.date;
        }

        fields.confidence = round_confidence(score);

        debug!(
            "Extracted vendor={} invoice_no={} total={} date={} confidence={:.2}",
            fields.vendor, fields.invoice_no, fields.total, fields.date, fields.confidence
        );

        Extraction { fields, warnings }
    }

    fn match_vendor(&self, text: &str) -> Option<String> {
        self.library
            .vendors()
            .iter()
            .find(|v| v.regex.is_match(text))
            .map(|v| v.name.clone())
    }

    fn match_invoice_no(&self, text: &str) -> Option<String> {
        for pattern in self.library.invoice_numbers() {
            let Some(caps) = pattern.regex.captures(text) else {
                continue;
            };
            let Some(candidate) = caps.get(1).map(|m| m.as_str().trim()) else {
                continue;
            };

            if candidate.chars().count() > pattern.min_len {
                return Some(candidate.to_string());
            }
            debug!("Rejected short invoice number candidate `{}`", candidate);
        }
        None
    }

    /// Collect every total candidate from every pattern and keep the largest.
    fn match_total(&self, text: &str) -> (Option<Decimal>, Vec<ExtractionWarning>) {
        let mut best: Option<Decimal> = None;
        let mut warnings = Vec::new();

        for pattern in self.library.totals() {
            for caps in pattern.captures_iter(text) {
                let Some(raw) = caps.get(1).map(|m| m.as_str()) else {
                    continue;
                };

                match parse_amount(raw) {
                    Ok(amount) => {
                        if best.is_none_or(|b| amount > b) {
                            best = Some(amount);
                        }
                    }
                    Err(reason) => warnings.push(ExtractionWarning::AmountParse {
                        raw: raw.to_string(),
                        reason,
                    }),
                }
            }
        }

        (best, warnings)
    }

    fn match_date(&self, text: &str) -> Option<String> {
        self.library.dates().iter().find_map(|pattern| {
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(PatternLibrary::default(), ConfidenceWeights::default())
    }
}

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Parse `1,25,000.00` style amounts.
fn parse_amount(raw: &str) -> Result<Decimal, String> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned).map_err(|e| e.to_string())
}

fn round_confidence(score: f32) -> f32 {
    let clamped = score.clamp(0.0, 1.0);
    (clamped * 10_000.0).round() / 10_000.0
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
