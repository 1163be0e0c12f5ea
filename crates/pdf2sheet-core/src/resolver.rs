//! Vendor resolution: combines extractor output with saved templates.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extract::ExtractedFields;
use crate::models::config::{ResolverConfig, DEFAULT_ACCEPT_THRESHOLD};
use crate::models::template::{normalize_sender, VendorTemplate};
use crate::store::TemplateStore;

/// Where the final vendor came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionSource {
    /// A saved template overrode the extractor.
    Template { template_id: i64, version: u32 },
    /// Extractor confidence met the threshold.
    Confidence,
    /// Neither applied; the user has to map this sender.
    Unresolved,
}

/// Final vendor assignment for one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub vendor: String,
    pub confidence: f32,
    pub needs_mapping: bool,
    pub source: ResolutionSource,
}

/// Decides whether a saved template or the extractor's guess wins.
#[derive(Debug, Clone)]
pub struct VendorResolver {
    accept_threshold: f32,
    require_vendor_match: bool,
}

impl Default for VendorResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ACCEPT_THRESHOLD)
    }
}

impl VendorResolver {
    pub fn new(accept_threshold: f32) -> Self {
        Self {
            accept_threshold,
            require_vendor_match: false,
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.accept_threshold).with_vendor_match(config.require_vendor_match)
    }

    /// Only let a template win when its vendor name equals the extracted one.
    pub fn with_vendor_match(mut self, require: bool) -> Self {
        self.require_vendor_match = require;
        self
    }

    pub fn accept_threshold(&self) -> f32 {
        self.accept_threshold
    }

    /// Resolve the vendor for `sender_email`, consulting `store` for a template.
    ///
    /// The sender is normalised before the lookup. A failed lookup is logged
    /// and treated as "no template".
    pub fn resolve<S>(
        &self,
        store: &S,
        user_id: &str,
        sender_email: &str,
        fields: &ExtractedFields,
    ) -> Resolution
    where
        S: TemplateStore + ?Sized,
    {
        let sender_email = normalize_sender(sender_email);
        let template = match store.find_template(user_id, &sender_email) {
            Ok(template) => template,
            Err(e) => {
                warn!(
                    "Template lookup failed for {} / {}, falling back to extraction: {}",
                    user_id, sender_email, e
                );
                None
            }
        };

        self.decide(fields, template.as_ref())
    }

    /// Pure decision over an already-fetched template.
    pub fn decide(&self, fields: &ExtractedFields, template: Option<&VendorTemplate>) -> Resolution {
        if let Some(template) = template.filter(|t| self.template_applies(t, fields)) {
            debug!(
                "Template v{} overrides vendor {} -> {}",
                template.version, fields.vendor, template.vendor_name
            );
            return Resolution {
                vendor: template.vendor_name.clone(),
                confidence: 1.0,
                needs_mapping: false,
                source: ResolutionSource::Template {
                    template_id: template.id,
                    version: template.version,
                },
            };
        }

        let accepted = fields.confidence >= self.accept_threshold;
        debug!(
            "Confidence {:.2} vs threshold {:.2}: {}",
            fields.confidence,
            self.accept_threshold,
            if accepted { "accepted" } else { "needs mapping" }
        );

        Resolution {
            vendor: fields.vendor.clone(),
            confidence: fields.confidence,
            needs_mapping: !accepted,
            source: if accepted {
                ResolutionSource::Confidence
            } else {
                ResolutionSource::Unresolved
            },
        }
    }

    fn template_applies(&self, template: &VendorTemplate, fields: &ExtractedFields) -> bool {
        !self.require_vendor_match || template.vendor_name.eq_ignore_ascii_case(&fields.vendor)
    }
}
