//! Template sync: save a vendor template and relabel past uploads.

use serde::Serialize;
use tracing::{error, info};

use crate::error::{Pdf2SheetError, Result};
use crate::models::config::SyncConfig;
use crate::models::template::{
    default_mapping, normalize_mapping, normalize_sender, ColumnMapping, VendorTemplate,
};
use crate::store::{InvoiceStore, TemplateStore};

/// Result of a template save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub template: VendorTemplate,
    /// Invoices relabelled from a placeholder vendor.
    pub upgraded: usize,
    /// Set when the template was saved but relabelling failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconcile_error: Option<String>,
}

impl SyncOutcome {
    pub fn is_complete(&self) -> bool {
        self.reconcile_error.is_none()
    }
}

/// Saves templates and back-fills invoices still carrying a placeholder vendor.
#[derive(Debug, Clone)]
pub struct TemplateSync {
    unmapped_vendors: Vec<String>,
}

impl Default for TemplateSync {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl TemplateSync {
    pub fn new(unmapped_vendors: Vec<String>) -> Self {
        Self { unmapped_vendors }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.unmapped_vendors.clone())
    }

    /// Vendor values treated as "never mapped".
    pub fn unmapped_vendors(&self) -> &[String] {
        &self.unmapped_vendors
    }

    /// Create or update the template for `(user_id, sender_email)`, then
    /// relabel that sender's placeholder invoices with `vendor_name`.
    ///
    /// An empty `mapping` stores the default column layout. A failed upsert
    /// is an error; a failed relabel is reported in
    /// [`SyncOutcome::reconcile_error`] and the save still counts.
    pub fn save<S>(
        &self,
        store: &S,
        user_id: &str,
        sender_email: &str,
        vendor_name: &str,
        mapping: Vec<ColumnMapping>,
    ) -> Result<SyncOutcome>
    where
        S: TemplateStore + InvoiceStore + ?Sized,
    {
        let user_id = user_id.trim();
        let sender_email = normalize_sender(sender_email);
        let vendor_name = vendor_name.trim();
        self.validate(user_id, &sender_email, vendor_name)?;

        let mapping = if mapping.is_empty() {
            default_mapping()
        } else {
            normalize_mapping(mapping)
        };

        let template = store.upsert_template(user_id, &sender_email, vendor_name, &mapping)?;
        info!(
            "Saved template for {} as {} (version {})",
            sender_email, template.vendor_name, template.version
        );

        let outcome = match store.upgrade_unmapped(
            user_id,
            &sender_email,
            vendor_name,
            &self.unmapped_vendors,
        ) {
            Ok(upgraded) => {
                info!("Relabelled {} past invoice(s) from {}", upgraded, sender_email);
                SyncOutcome {
                    template,
                    upgraded,
                    reconcile_error: None,
                }
            }
            Err(e) => {
                error!(
                    "Template saved but relabelling invoices from {} failed: {}",
                    sender_email, e
                );
                SyncOutcome {
                    template,
                    upgraded: 0,
                    reconcile_error: Some(e.to_string()),
                }
            }
        };

        Ok(outcome)
    }

    fn validate(&self, user_id: &str, sender_email: &str, vendor_name: &str) -> Result<()> {
        if user_id.is_empty() {
            return Err(Pdf2SheetError::InvalidInput("user id is empty".to_string()));
        }
        if sender_email.is_empty() {
            return Err(Pdf2SheetError::InvalidInput("sender e-mail is empty".to_string()));
        }
        if vendor_name.is_empty() {
            return Err(Pdf2SheetError::InvalidInput("vendor name is empty".to_string()));
        }
        if self
            .unmapped_vendors
            .iter()
            .any(|v| v.eq_ignore_ascii_case(vendor_name))
        {
            return Err(Pdf2SheetError::InvalidInput(format!(
                "`{}` is a placeholder, not a vendor name",
                vendor_name
            )));
        }
        Ok(())
    }
}
