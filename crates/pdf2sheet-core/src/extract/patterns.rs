//! Compiled, immutable pattern tables for invoice field extraction.

use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;
use crate::models::config::PatternConfig;

/// A compiled vendor rule.
#[derive(Debug, Clone)]
pub struct VendorPattern {
    pub regex: Regex,
    pub name: String,
}

/// A compiled invoice number rule.
#[derive(Debug, Clone)]
pub struct InvoiceNoPattern {
    pub regex: Regex,
    pub min_len: usize,
}

/// Ordered regex tables, one list per field.
///
/// Built once from a [`PatternConfig`] and handed to the extractor, so
/// alternative tables can be used side by side without touching global state.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    vendors: Vec<VendorPattern>,
    invoice_numbers: Vec<InvoiceNoPattern>,
    totals: Vec<Regex>,
    dates: Vec<Regex>,
}

impl PatternLibrary {
    /// Compile every table in `config`.
    ///
    /// Vendor patterns are always matched case-insensitively. Invoice number,
    /// total and date patterns must expose the value in capture group 1.
    pub fn from_config(config: &PatternConfig) -> Result<Self, ConfigError> {
        let vendors = config
            .vendors
            .iter()
            .map(|rule| {
                let regex = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| pattern_error("vendor", &rule.pattern, e.to_string()))?;
                Ok(VendorPattern {
                    regex,
                    name: rule.name.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let invoice_numbers = config
            .invoice_numbers
            .iter()
            .map(|rule| {
                Ok(InvoiceNoPattern {
                    regex: compile_capturing("invoice number", &rule.pattern)?,
                    min_len: rule.min_len,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let totals = config
            .totals
            .iter()
            .map(|p| compile_capturing("total", p))
            .collect::<Result<Vec<_>, _>>()?;

        let dates = config
            .dates
            .iter()
            .map(|p| compile_capturing("date", p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            vendors,
            invoice_numbers,
            totals,
            dates,
        })
    }

    pub fn vendors(&self) -> &[VendorPattern] {
        &self.vendors
    }

    pub fn invoice_numbers(&self) -> &[InvoiceNoPattern] {
        &self.invoice_numbers
    }

    pub fn totals(&self) -> &[Regex] {
        &self.totals
    }

    pub fn dates(&self) -> &[Regex] {
        &self.dates
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        // Built-in tables are covered by tests
        Self::from_config(&PatternConfig::default()).expect("built-in patterns compile")
    }
}

fn compile_capturing(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    let regex = Regex::new(pattern).map_err(|e| pattern_error(field, pattern, e.to_string()))?;
    if regex.captures_len() < 2 {
        return Err(pattern_error(field, pattern, "missing capture group 1".to_string()));
    }
    Ok(regex)
}

fn pattern_error(field: &'static str, pattern: &str, reason: String) -> ConfigError {
    ConfigError::Pattern {
        field,
        pattern: pattern.to_string(),
        reason,
    }
}
