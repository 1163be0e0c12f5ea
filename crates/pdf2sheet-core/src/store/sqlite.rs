//! SQLite-backed template and invoice store.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::{HistoryQuery, InvoiceStore, Result, TemplateStore};
use crate::error::StoreError;
use crate::models::invoice::{InvoiceRecord, InvoiceStatus, NewInvoice};
use crate::models::template::{ColumnMapping, VendorTemplate};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS vendor_templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        sender_email TEXT NOT NULL,
        vendor_name TEXT NOT NULL,
        mapping TEXT NOT NULL,
        version INTEGER NOT NULL DEFAULT 1,
        last_updated TEXT NOT NULL,
        UNIQUE (user_id, sender_email)
    );

    CREATE TABLE IF NOT EXISTS invoices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        sender_email TEXT NOT NULL,
        vendor TEXT NOT NULL DEFAULT 'Unknown Vendor',
        invoice_no TEXT NOT NULL DEFAULT 'N/A',
        date TEXT NOT NULL DEFAULT 'N/A',
        total NOT NULL DEFAULT '0',
        confidence REAL NOT NULL DEFAULT 0,
        raw_text TEXT,
        file_path TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        needs_mapping INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_invoices_user_created ON invoices(user_id, created_at DESC);
    CREATE INDEX IF NOT EXISTS idx_invoices_user_sender ON invoices(user_id, sender_email);
";

const TEMPLATE_COLUMNS: &str =
    "id, user_id, sender_email, vendor_name, mapping, version, last_updated";

const INVOICE_COLUMNS: &str = "id, user_id, sender_email, vendor, invoice_no, date, total, \
     confidence, raw_text, file_path, status, needs_mapping, created_at";

/// Template and invoice store on a single SQLite connection.
///
/// The connection lock is held for one statement at a time.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(Duration::from_secs(5))?;
        info!("Opened invoice database at {}", path.as_ref().display());
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl TemplateStore for SqliteStore {
    fn find_template(&self, user_id: &str, sender_email: &str) -> Result<Option<VendorTemplate>> {
        let sql = format!(
            "SELECT {} FROM vendor_templates WHERE user_id = ?1 AND sender_email = ?2",
            TEMPLATE_COLUMNS
        );
        let template = self
            .conn()?
            .query_row(&sql, params![user_id, sender_email], row_to_template)
            .optional()?;
        Ok(template)
    }

    fn upsert_template(
        &self,
        user_id: &str,
        sender_email: &str,
        vendor_name: &str,
        mapping: &[ColumnMapping],
    ) -> Result<VendorTemplate> {
        let mapping = serde_json::to_string(mapping)?;
        let sql = format!(
            "INSERT INTO vendor_templates (user_id, sender_email, vendor_name, mapping, version, last_updated)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)
             ON CONFLICT (user_id, sender_email) DO UPDATE SET
                 vendor_name = excluded.vendor_name,
                 mapping = excluded.mapping,
                 version = vendor_templates.version + 1,
                 last_updated = excluded.last_updated
             RETURNING {}",
            TEMPLATE_COLUMNS
        );

        let template = self.conn()?.query_row(
            &sql,
            params![user_id, sender_email, vendor_name, mapping, Utc::now()],
            row_to_template,
        )?;

        debug!(
            "Saved template for {} / {} at version {}",
            user_id, sender_email, template.version
        );
        Ok(template)
    }

    fn list_templates(&self, user_id: &str) -> Result<Vec<VendorTemplate>> {
        let sql = format!(
            "SELECT {} FROM vendor_templates WHERE user_id = ?1 ORDER BY sender_email",
            TEMPLATE_COLUMNS
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let templates = stmt
            .query_map(params![user_id], row_to_template)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }
}

impl InvoiceStore for SqliteStore {
    fn insert_invoice(&self, invoice: NewInvoice) -> Result<InvoiceRecord> {
        let sql = format!(
            "INSERT INTO invoices (user_id, sender_email, vendor, invoice_no, date, total, confidence,
                                   raw_text, file_path, status, needs_mapping, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             RETURNING {}",
            INVOICE_COLUMNS
        );

        let record = self.conn()?.query_row(
            &sql,
            params![
                invoice.user_id,
                invoice.sender_email,
                invoice.vendor,
                invoice.invoice_no,
                invoice.date,
                invoice.total.to_string(),
                f64::from(invoice.confidence),
                invoice.raw_text,
                invoice.file_path,
                invoice.status,
                invoice.needs_mapping,
                Utc::now(),
            ],
            row_to_invoice,
        )?;

        debug!("Inserted invoice {} for user {}", record.id, record.user_id);
        Ok(record)
    }

    fn get_invoice(&self, id: i64) -> Result<InvoiceRecord> {
        let sql = format!("SELECT {} FROM invoices WHERE id = ?1", INVOICE_COLUMNS);
        self.conn()?
            .query_row(&sql, params![id], row_to_invoice)
            .optional()?
            .ok_or(StoreError::NotFound(id))
    }

    fn set_status(&self, id: i64, status: InvoiceStatus) -> Result<()> {
        let changed = self.conn()?.execute(
            "UPDATE invoices SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn upgrade_unmapped(
        &self,
        user_id: &str,
        sender_email: &str,
        vendor_name: &str,
        unmapped_vendors: &[String],
    ) -> Result<usize> {
        if unmapped_vendors.is_empty() {
            return Ok(0);
        }

        let placeholders = (0..unmapped_vendors.len())
            .map(|i| format!("?{}", i + 4))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE invoices SET vendor = ?1, confidence = 1.0, needs_mapping = 0
             WHERE user_id = ?2 AND sender_email = ?3 AND vendor IN ({})",
            placeholders
        );

        let mut values: Vec<&dyn ToSql> = vec![&vendor_name, &user_id, &sender_email];
        values.extend(unmapped_vendors.iter().map(|v| v as &dyn ToSql));

        let changed = self.conn()?.execute(&sql, values.as_slice())?;
        Ok(changed)
    }

    fn list_invoices(&self, user_id: &str, query: &HistoryQuery) -> Result<Vec<InvoiceRecord>> {
        let sql = format!(
            "SELECT {} FROM invoices
             WHERE user_id = ?1
               AND (?2 IS NULL OR vendor LIKE ?2 ESCAPE '\\' OR invoice_no LIKE ?2 ESCAPE '\\')
             ORDER BY created_at DESC, id DESC
             LIMIT ?3",
            INVOICE_COLUMNS
        );

        let search = query.search.as_deref().map(like_pattern);
        let limit = query
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![user_id, search, limit], row_to_invoice)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl ToSql for InvoiceStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for InvoiceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

fn row_to_template(row: &Row<'_>) -> rusqlite::Result<VendorTemplate> {
    let raw: String = row.get("mapping")?;
    let mapping = decode_mapping(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(VendorTemplate {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        sender_email: row.get("sender_email")?,
        vendor_name: row.get("vendor_name")?,
        mapping,
        version: row.get("version")?,
        last_updated: row.get("last_updated")?,
    })
}

fn row_to_invoice(row: &Row<'_>) -> rusqlite::Result<InvoiceRecord> {
    let confidence: f64 = row.get("confidence")?;
    let raw_text: Option<String> = row.get("raw_text")?;

    Ok(InvoiceRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        sender_email: row.get("sender_email")?,
        vendor: row.get("vendor")?,
        invoice_no: row.get("invoice_no")?,
        date: row.get("date")?,
        total: decode_total(row.get_ref("total")?),
        confidence: confidence as f32,
        raw_text: raw_text.unwrap_or_default(),
        file_path: row.get("file_path")?,
        status: row.get("status")?,
        needs_mapping: row.get("needs_mapping")?,
        created_at: row.get("created_at")?,
    })
}

/// Read a stored total, accepting numbers and currency-decorated strings
/// written by older versions. Unreadable values load as zero.
fn decode_total(value: ValueRef<'_>) -> Decimal {
    match value {
        ValueRef::Integer(i) => Decimal::from(i),
        ValueRef::Real(f) => Decimal::try_from(f).unwrap_or_else(|e| {
            warn!("Stored total {} is not a valid amount, reading as 0: {}", f, e);
            Decimal::ZERO
        }),
        ValueRef::Text(bytes) => {
            let raw = String::from_utf8_lossy(bytes);
            let cleaned: String = raw
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            Decimal::from_str(cleaned.trim_start_matches('.')).unwrap_or_else(|e| {
                warn!("Stored total {:?} is not a valid amount, reading as 0: {}", raw, e);
                Decimal::ZERO
            })
        }
        ValueRef::Null | ValueRef::Blob(_) => Decimal::ZERO,
    }
}

/// Read a stored mapping, accepting the older `{"invoiceNo": "Column"}` object form.
fn decode_mapping(raw: &str) -> serde_json::Result<Vec<ColumnMapping>> {
    match serde_json::from_str::<Vec<ColumnMapping>>(raw) {
        Ok(mapping) => Ok(mapping),
        Err(err) => {
            let legacy: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(raw).map_err(|_| err)?;
            Ok(legacy
                .into_iter()
                .filter_map(|(field, column)| {
                    Some(ColumnMapping::new(field.parse().ok()?, column.as_str()?))
                })
                .collect())
        }
    }
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::template::{default_mapping, InvoiceField};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;

    fn new_invoice(user: &str, sender: &str, vendor: &str, invoice_no: &str) -> NewInvoice {
        NewInvoice {
            user_id: user.to_string(),
            sender_email: sender.to_string(),
            vendor: vendor.to_string(),
            invoice_no: invoice_no.to_string(),
            date: "05 Nov 2025".to_string(),
            total: Decimal::new(125000, 2),
            confidence: 0.45,
            raw_text: "raw".to_string(),
            file_path: "uploads/a.pdf".to_string(),
            status: InvoiceStatus::Pending,
            needs_mapping: true,
        }
    }

    #[test]
    fn test_upsert_increments_version() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = store
            .upsert_template("u1", "billing@acme.com", "Acme", &default_mapping())
            .unwrap();
        assert_eq!(first.version, 1);

        let mapping = vec![ColumnMapping::new(InvoiceField::Total, "Amount")];
        let second = store
            .upsert_template("u1", "billing@acme.com", "Acme Corp", &mapping)
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.version, 2);
        assert_eq!(second.vendor_name, "Acme Corp");
        assert_eq!(second.mapping, mapping);
        assert!(second.last_updated >= first.last_updated);

        let found = store.find_template("u1", "billing@acme.com").unwrap().unwrap();
        assert_eq!(found, second);
    }

    #[test]
    fn test_templates_are_per_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_template("u1", "billing@acme.com", "Acme", &default_mapping())
            .unwrap();
        let other = store
            .upsert_template("u2", "billing@acme.com", "ACME Ltd", &default_mapping())
            .unwrap();

        assert_eq!(other.version, 1);
        assert_eq!(
            store.find_template("u1", "billing@acme.com").unwrap().unwrap().vendor_name,
            "Acme"
        );
        assert!(store.find_template("u3", "billing@acme.com").unwrap().is_none());
        assert_eq!(store.list_templates("u2").unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_upserts_never_lose_versions() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .upsert_template("u1", "bills@jio.com", &format!("Jio {}", i), &default_mapping())
                        .unwrap()
                        .version
                })
            })
            .collect();

        let mut versions: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, (1..=8).collect::<Vec<u32>>());

        let latest = store.find_template("u1", "bills@jio.com").unwrap().unwrap();
        assert_eq!(latest.version, 8);
    }

    #[test]
    fn test_insert_and_status() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = store
            .insert_invoice(new_invoice("u1", "a@b.com", "Amazon", "INV-1"))
            .unwrap();

        assert_eq!(record.total, Decimal::new(125000, 2));
        assert_eq!(record.status, InvoiceStatus::Pending);
        assert!(record.needs_mapping);

        store.set_status(record.id, InvoiceStatus::Processed).unwrap();
        assert_eq!(
            store.get_invoice(record.id).unwrap().status,
            InvoiceStatus::Processed
        );

        assert!(matches!(
            store.set_status(999, InvoiceStatus::Flagged),
            Err(StoreError::NotFound(999))
        ));
    }

    #[test]
    fn test_upgrade_only_touches_sentinel_vendors() {
        let store = SqliteStore::open_in_memory().unwrap();
        let unmapped = vec!["Auto-Detected Vendor".to_string()];

        let auto = store
            .insert_invoice(new_invoice("u1", "a@b.com", "Auto-Detected Vendor", "INV-1"))
            .unwrap();
        let custom = store
            .insert_invoice(new_invoice("u1", "a@b.com", "Acme Corp", "INV-2"))
            .unwrap();
        let other_user = store
            .insert_invoice(new_invoice("u2", "a@b.com", "Auto-Detected Vendor", "INV-3"))
            .unwrap();

        let changed = store
            .upgrade_unmapped("u1", "a@b.com", "Beta Traders", &unmapped)
            .unwrap();
        assert_eq!(changed, 1);

        let auto = store.get_invoice(auto.id).unwrap();
        assert_eq!(auto.vendor, "Beta Traders");
        assert_eq!(auto.confidence, 1.0);
        assert!(!auto.needs_mapping);

        assert_eq!(store.get_invoice(custom.id).unwrap().vendor, "Acme Corp");
        assert_eq!(
            store.get_invoice(other_user.id).unwrap().vendor,
            "Auto-Detected Vendor"
        );

        assert_eq!(store.upgrade_unmapped("u1", "a@b.com", "X", &[]).unwrap(), 0);
    }

    #[test]
    fn test_history_order_limit_and_search() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (vendor, no) in [("Amazon", "INV-1"), ("Airtel", "AIR_77"), ("Flipkart", "FK-9")] {
            store.insert_invoice(new_invoice("u1", "a@b.com", vendor, no)).unwrap();
        }
        store.insert_invoice(new_invoice("u2", "a@b.com", "Amazon", "INV-X")).unwrap();

        let all = store.list_invoices("u1", &HistoryQuery::default()).unwrap();
        let vendors: Vec<&str> = all.iter().map(|r| r.vendor.as_str()).collect();
        assert_eq!(vendors, vec!["Flipkart", "Airtel", "Amazon"]);

        let recent = store.list_invoices("u1", &HistoryQuery::recent(2)).unwrap();
        assert_eq!(recent.len(), 2);

        let found = store
            .list_invoices("u1", &HistoryQuery::recent(10).with_search("amaz"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].invoice_no, "INV-1");

        let by_number = store
            .list_invoices("u1", &HistoryQuery::default().with_search("fk-"))
            .unwrap();
        assert_eq!(by_number[0].vendor, "Flipkart");

        // `_` is literal, not a wildcard
        let literal = store
            .list_invoices("u1", &HistoryQuery::default().with_search("a_r"))
            .unwrap();
        assert!(literal.is_empty());
    }

    #[test]
    fn test_legacy_totals_and_mapping_are_coerced() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let conn = store.conn().unwrap();
            conn.execute_batch(
                "INSERT INTO invoices (user_id, sender_email, total, file_path, created_at)
                     VALUES ('u1', 'a@b.com', 99.5, 'a.pdf', '2025-01-01 10:00:00+00:00');
                 INSERT INTO invoices (user_id, sender_email, total, file_path, created_at)
                     VALUES ('u1', 'a@b.com', '₹1,250.00', 'b.pdf', '2025-01-02 10:00:00+00:00');
                 INSERT INTO invoices (user_id, sender_email, total, file_path, created_at)
                     VALUES ('u1', 'a@b.com', 'Rs. 500.00', 'c.pdf', '2025-01-03 10:00:00+00:00');
                 INSERT INTO vendor_templates (user_id, sender_email, vendor_name, mapping, version, last_updated)
                     VALUES ('u1', 'a@b.com', 'Old', '{\"invoiceNo\":\"Bill No\",\"total\":\"Amount\"}', 3,
                             '2025-01-01 10:00:00+00:00');",
            )
            .unwrap();
        }

        let records = store.list_invoices("u1", &HistoryQuery::default()).unwrap();
        let totals: Vec<Decimal> = records.iter().map(|r| r.total).collect();
        assert_eq!(
            totals,
            vec![Decimal::new(50000, 2), Decimal::new(125000, 2), Decimal::new(995, 1)]
        );
        assert_eq!(records[0].vendor, "Unknown Vendor");

        let template = store.find_template("u1", "a@b.com").unwrap().unwrap();
        assert_eq!(template.version, 3);
        assert_eq!(
            template.mapping,
            vec![
                ColumnMapping::new(InvoiceField::InvoiceNo, "Bill No"),
                ColumnMapping::new(InvoiceField::Total, "Amount"),
            ]
        );
    }

    #[test]
    fn test_unreadable_total_loads_as_zero() {
        assert_eq!(decode_total(ValueRef::Text("1250.00.".as_bytes())), Decimal::ZERO);
        assert_eq!(decode_total(ValueRef::Text("n/a".as_bytes())), Decimal::ZERO);
        assert_eq!(decode_total(ValueRef::Null), Decimal::ZERO);
        assert_eq!(decode_total(ValueRef::Integer(42)), Decimal::from(42));
        assert_eq!(
            decode_total(ValueRef::Text("$ 1,250.00".as_bytes())),
            Decimal::new(125000, 2)
        );
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .upsert_template("u1", "a@b.com", "Acme", &default_mapping())
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let template = reopened.find_template("u1", "a@b.com").unwrap().unwrap();
        assert_eq!(template.vendor_name, "Acme");
    }
}
