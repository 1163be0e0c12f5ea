//! Usage statistics over a user's stored invoices.

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::invoice::{InvoiceRecord, InvoiceStatus};

/// Manual entry time assumed per invoice, in hours.
pub const HOURS_PER_INVOICE: f64 = 0.15;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Uploads in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub month: &'static str,
    pub count: usize,
}

/// Aggregate statistics for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub total_count: usize,
    /// Sum of all totals.
    pub total_volume: Decimal,
    /// Mean confidence in 0..=1; zero when there are no invoices.
    pub average_confidence: f32,
    pub needs_mapping: usize,
    pub processed: usize,
    pub flagged: usize,
    pub hours_saved: f64,
    pub year: i32,
    /// Twelve entries, January first.
    pub monthly: Vec<MonthCount>,
}

/// Summarise `records`, bucketing upload dates of `year` by month.
pub fn build_report(records: &[InvoiceRecord], year: i32) -> Report {
    let total_count = records.len();
    let total_volume: Decimal = records.iter().map(|r| r.total).sum();

    let average_confidence = if total_count == 0 {
        0.0
    } else {
        let sum: f64 = records.iter().map(|r| f64::from(r.confidence)).sum();
        (sum / total_count as f64) as f32
    };

    let mut monthly: Vec<MonthCount> = MONTHS
        .iter()
        .map(|month| MonthCount { month: *month, count: 0 })
        .collect();
    for record in records.iter().filter(|r| r.created_at.year() == year) {
        monthly[record.created_at.month0() as usize].count += 1;
    }

    let count_status = |status: InvoiceStatus| records.iter().filter(|r| r.status == status).count();

    Report {
        total_count,
        total_volume,
        average_confidence,
        needs_mapping: records.iter().filter(|r| r.needs_mapping).count(),
        processed: count_status(InvoiceStatus::Processed),
        flagged: count_status(InvoiceStatus::Flagged),
        hours_saved: total_count as f64 * HOURS_PER_INVOICE,
        year,
        monthly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn record(total: i64, confidence: f32, status: InvoiceStatus, y: i32, m: u32) -> InvoiceRecord {
        InvoiceRecord {
            id: 0,
            user_id: "u1".to_string(),
            sender_email: "a@b.com".to_string(),
            vendor: "Amazon".to_string(),
            invoice_no: "INV-1".to_string(),
            date: "N/A".to_string(),
            total: Decimal::new(total, 2),
            confidence,
            raw_text: String::new(),
            file_path: "a.pdf".to_string(),
            status,
            needs_mapping: confidence < 0.75,
            created_at: Utc.with_ymd_and_hms(y, m, 10, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_empty_report() {
        let report = build_report(&[], 2025);
        assert_eq!(report.total_count, 0);
        assert_eq!(report.total_volume, Decimal::ZERO);
        assert_eq!(report.average_confidence, 0.0);
        assert_eq!(report.monthly.len(), 12);
        assert!(report.monthly.iter().all(|m| m.count == 0));
    }

    #[test]
    fn test_report_totals() {
        let records = vec![
            record(125000, 1.0, InvoiceStatus::Processed, 2025, 11),
            record(45000, 0.5, InvoiceStatus::Pending, 2025, 11),
            record(10000, 0.75, InvoiceStatus::Flagged, 2025, 1),
            record(5000, 0.75, InvoiceStatus::Processed, 2024, 11),
        ];

        let report = build_report(&records, 2025);
        assert_eq!(report.total_count, 4);
        assert_eq!(report.total_volume, Decimal::new(185000, 2));
        assert_eq!(report.average_confidence, 0.75);
        assert_eq!(report.needs_mapping, 1);
        assert_eq!(report.processed, 2);
        assert_eq!(report.flagged, 1);
        assert!((report.hours_saved - 0.6).abs() < 1e-9);
        assert_eq!(report.monthly[0], MonthCount { month: "Jan", count: 1 });
        assert_eq!(report.monthly[10], MonthCount { month: "Nov", count: 2 });
    }
}
