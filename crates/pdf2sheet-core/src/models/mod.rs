//! Data models: invoices, vendor templates and configuration.

pub mod config;
pub mod invoice;
pub mod template;
