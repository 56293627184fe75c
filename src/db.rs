use crate::config::{AppConfig, AppPaths, now_utc};
use crate::domain::{
    CategorizedRecord, Category, CategorySpec, FinanceRecord, RecordSpec, RecordType,
    RecurringSpec, RecurringTransaction, Report, ReportSpec, ReportWithRecords,
};
use crate::error::{LedgerError, LedgerResult};
use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const RECORD_COLUMNS: &str = "f.id, f.description, f.amount, f.type, f.transaction_date, f.category_id, f.settled, f.created_at";
const REPORT_COLUMNS: &str =
    "id, name, start_date, end_date, starting_amount, created_at, updated_at";
const RECURRING_COLUMNS: &str =
    "id, description, amount, type, category_id, day_of_the_month, created_at";

impl ToSql for RecordType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for RecordType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<RecordType>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(paths: &AppPaths, cfg: &AppConfig) -> anyhow::Result<(Self, PathBuf)> {
        fs::create_dir_all(&paths.data_dir)
            .with_context(|| format!("Failed to create data dir {}", paths.data_dir.display()))?;

        let db_path = cfg.database_path(paths);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open DB {}", db_path.display()))?;

        let db = Self::from_connection(conn)
            .with_context(|| format!("Failed to migrate DB {}", db_path.display()))?;
        Ok((db, db_path))
    }

    pub fn open_in_memory() -> LedgerResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> LedgerResult<Self> {
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> LedgerResult<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS finance_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                amount TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
                transaction_date TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                settled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_finance_records_date ON finance_records(transaction_date);

            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                starting_amount TEXT NOT NULL DEFAULT '0',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS report_records (
                report_id INTEGER NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
                finance_record_id INTEGER NOT NULL REFERENCES finance_records(id) ON DELETE CASCADE,
                PRIMARY KEY (report_id, finance_record_id)
            );

            CREATE INDEX IF NOT EXISTS idx_report_records_record ON report_records(finance_record_id);

            CREATE TABLE IF NOT EXISTS recurring_transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                amount TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
                category_id INTEGER NOT NULL REFERENCES categories(id),
                day_of_the_month INTEGER CHECK (day_of_the_month IS NULL OR day_of_the_month BETWEEN 1 AND 31),
                created_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // Categories

    pub fn create_category(&self, spec: &CategorySpec) -> LedgerResult<Category> {
        spec.validate()?;
        self.conn.execute(
            "INSERT INTO categories (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![spec.name, spec.description, now_utc()],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, name = %spec.name, "created category");
        self.get_category(id)
    }

    pub fn get_category(&self, id: i64) -> LedgerResult<Category> {
        self.conn
            .query_row(
                "SELECT id, name, description, created_at FROM categories WHERE id = ?1",
                params![id],
                category_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::not_found("category", id))
    }

    pub fn find_category_by_name(&self, name: &str) -> LedgerResult<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, description, created_at FROM categories WHERE name = ?1",
                params![name.trim()],
                category_from_row,
            )
            .optional()?)
    }

    pub fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description, created_at FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], category_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_category(&self, id: i64, spec: &CategorySpec) -> LedgerResult<Category> {
        spec.validate()?;
        let changed = self.conn.execute(
            "UPDATE categories SET name = ?1, description = ?2 WHERE id = ?3",
            params![spec.name, spec.description, id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("category", id));
        }
        self.get_category(id)
    }

    /// Fails with a store error while records or templates still use the category.
    pub fn delete_category(&self, id: i64) -> LedgerResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(LedgerError::not_found("category", id));
        }
        Ok(())
    }

    // Finance records

    pub fn create_finance_record(&self, spec: &RecordSpec) -> LedgerResult<FinanceRecord> {
        spec.validate()?;
        let id = insert_finance_record(&self.conn, spec, now_utc())?;
        self.get_finance_record(id).map(|r| r.record)
    }

    pub fn get_finance_record(&self, id: i64) -> LedgerResult<CategorizedRecord> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS}, c.name
             FROM finance_records f
             LEFT JOIN categories c ON c.id = f.category_id
             WHERE f.id = ?1"
        );
        self.conn
            .query_row(&sql, params![id], categorized_from_row)
            .optional()?
            .ok_or_else(|| LedgerError::not_found("finance record", id))
    }

    /// All records, newest transaction date first.
    pub fn list_finance_records(&self) -> LedgerResult<Vec<CategorizedRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS}, c.name
             FROM finance_records f
             LEFT JOIN categories c ON c.id = f.category_id
             ORDER BY f.transaction_date DESC, f.id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], categorized_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Rewrites the editable fields; `settled` is left as is.
    pub fn update_finance_record(&self, id: i64, spec: &RecordSpec) -> LedgerResult<FinanceRecord> {
        spec.validate()?;
        let changed = self.conn.execute(
            r#"
            UPDATE finance_records
            SET description = ?1, amount = ?2, type = ?3, transaction_date = ?4, category_id = ?5
            WHERE id = ?6
            "#,
            params![
                spec.description,
                spec.amount.to_string(),
                spec.record_type,
                spec.transaction_date,
                spec.category_id,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("finance record", id));
        }
        self.get_finance_record(id).map(|r| r.record)
    }

    pub fn set_settled(&self, id: i64, settled: bool) -> LedgerResult<FinanceRecord> {
        let changed = self.conn.execute(
            "UPDATE finance_records SET settled = ?1 WHERE id = ?2",
            params![settled, id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("finance record", id));
        }
        self.get_finance_record(id).map(|r| r.record)
    }

    /// Link rows go with the record, so it drops out of every report.
    pub fn delete_finance_record(&self, id: i64) -> LedgerResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM finance_records WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(LedgerError::not_found("finance record", id));
        }
        debug!(id, "deleted finance record");
        Ok(())
    }

    // Reports

    pub fn create_report(&self, spec: &ReportSpec) -> LedgerResult<Report> {
        spec.validate()?;
        let now = now_utc();
        self.conn.execute(
            r#"
            INSERT INTO reports (name, start_date, end_date, starting_amount, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                spec.name,
                spec.start_date,
                spec.end_date,
                spec.starting_amount.to_string(),
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, name = %spec.name, "created report");
        self.get_report(id)
    }

    pub fn get_report(&self, id: i64) -> LedgerResult<Report> {
        fetch_report(&self.conn, id)
    }

    /// Newest first.
    pub fn list_reports(&self) -> LedgerResult<Vec<Report>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at DESC, id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], report_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_report(&self, id: i64, spec: &ReportSpec) -> LedgerResult<Report> {
        spec.validate()?;
        let changed = self.conn.execute(
            r#"
            UPDATE reports
            SET name = ?1, start_date = ?2, end_date = ?3, starting_amount = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
            params![
                spec.name,
                spec.start_date,
                spec.end_date,
                spec.starting_amount.to_string(),
                now_utc(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("report", id));
        }
        self.get_report(id)
    }

    /// Removes the report and its links; the records themselves stay.
    pub fn delete_report(&self, id: i64) -> LedgerResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM reports WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(LedgerError::not_found("report", id));
        }
        Ok(())
    }

    /// Current members of a report, re-derived from link rows on every call.
    pub fn list_report_members(&self, report_id: i64) -> LedgerResult<Vec<CategorizedRecord>> {
        fetch_report(&self.conn, report_id)?;
        fetch_members(&self.conn, report_id)
    }

    /// Returns false when the record was already a member.
    pub fn link_record_to_report(&self, report_id: i64, record_id: i64) -> LedgerResult<bool> {
        fetch_report(&self.conn, report_id)?;
        self.get_finance_record(record_id)?;
        Ok(insert_link(&self.conn, report_id, record_id)?)
    }

    pub fn unlink_record_from_report(&self, report_id: i64, record_id: i64) -> LedgerResult<bool> {
        fetch_report(&self.conn, report_id)?;
        let changed = self.conn.execute(
            "DELETE FROM report_records WHERE report_id = ?1 AND finance_record_id = ?2",
            params![report_id, record_id],
        )?;
        Ok(changed > 0)
    }

    /// Insert then link, without a surrounding transaction.
    pub fn add_record_to_report(
        &self,
        report_id: i64,
        spec: &RecordSpec,
    ) -> LedgerResult<CategorizedRecord> {
        spec.validate()?;
        fetch_report(&self.conn, report_id)?;
        let record_id = insert_finance_record(&self.conn, spec, now_utc())?;
        insert_link(&self.conn, report_id, record_id)?;
        self.get_finance_record(record_id)
    }

    pub fn list_reports_with_members(&self) -> LedgerResult<Vec<ReportWithRecords>> {
        let reports = self.list_reports()?;
        let mut out = Vec::with_capacity(reports.len());
        for report in reports {
            let records = fetch_members(&self.conn, report.id)?;
            out.push(ReportWithRecords { report, records });
        }
        Ok(out)
    }

    // Recurring templates

    pub fn create_recurring(&self, spec: &RecurringSpec) -> LedgerResult<RecurringTransaction> {
        spec.validate()?;
        self.conn.execute(
            r#"
            INSERT INTO recurring_transactions (description, amount, type, category_id, day_of_the_month, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                spec.description,
                spec.amount.to_string(),
                spec.record_type,
                spec.category_id,
                spec.day_of_the_month,
                now_utc(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, "created recurring template");
        self.get_recurring(id)
    }

    pub fn get_recurring(&self, id: i64) -> LedgerResult<RecurringTransaction> {
        let sql = format!("SELECT {RECURRING_COLUMNS} FROM recurring_transactions WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], recurring_from_row)
            .optional()?
            .ok_or_else(|| LedgerError::not_found("recurring transaction", id))
    }

    pub fn list_recurring_templates(&self) -> LedgerResult<Vec<RecurringTransaction>> {
        let sql = format!(
            "SELECT {RECURRING_COLUMNS} FROM recurring_transactions ORDER BY description, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], recurring_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn update_recurring(
        &self,
        id: i64,
        spec: &RecurringSpec,
    ) -> LedgerResult<RecurringTransaction> {
        spec.validate()?;
        let changed = self.conn.execute(
            r#"
            UPDATE recurring_transactions
            SET description = ?1, amount = ?2, type = ?3, category_id = ?4, day_of_the_month = ?5
            WHERE id = ?6
            "#,
            params![
                spec.description,
                spec.amount.to_string(),
                spec.record_type,
                spec.category_id,
                spec.day_of_the_month,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("recurring transaction", id));
        }
        self.get_recurring(id)
    }

    pub fn delete_recurring(&self, id: i64) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM recurring_transactions WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("recurring transaction", id));
        }
        Ok(())
    }
}

pub(crate) fn fetch_report(conn: &Connection, id: i64) -> LedgerResult<Report> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1");
    conn.query_row(&sql, params![id], report_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("report", id))
}

pub(crate) fn insert_finance_record(
    conn: &Connection,
    spec: &RecordSpec,
    created_at: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        r#"
        INSERT INTO finance_records (description, amount, type, transaction_date, category_id, settled, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
        "#,
        params![
            spec.description,
            spec.amount.to_string(),
            spec.record_type,
            spec.transaction_date,
            spec.category_id,
            created_at,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, amount = %spec.amount, kind = %spec.record_type, "inserted finance record");
    Ok(id)
}

pub(crate) fn insert_link(conn: &Connection, report_id: i64, record_id: i64) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO report_records (report_id, finance_record_id) VALUES (?1, ?2)",
        params![report_id, record_id],
    )?;
    Ok(changed > 0)
}

fn fetch_members(conn: &Connection, report_id: i64) -> LedgerResult<Vec<CategorizedRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS}, c.name
         FROM report_records rr
         JOIN finance_records f ON f.id = rr.finance_record_id
         LEFT JOIN categories c ON c.id = f.category_id
         WHERE rr.report_id = ?1
         ORDER BY f.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![report_id], categorized_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    raw.parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FinanceRecord> {
    Ok(FinanceRecord {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: decimal_at(row, 2)?,
        record_type: row.get(3)?,
        transaction_date: row.get(4)?,
        category_id: row.get(5)?,
        settled: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn categorized_from_row(row: &Row<'_>) -> rusqlite::Result<CategorizedRecord> {
    Ok(CategorizedRecord {
        record: record_from_row(row)?,
        category_name: row.get(8)?,
    })
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        starting_amount: decimal_at(row, 4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn recurring_from_row(row: &Row<'_>) -> rusqlite::Result<RecurringTransaction> {
    Ok(RecurringTransaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: decimal_at(row, 2)?,
        record_type: row.get(3)?,
        category_id: row.get(4)?,
        day_of_the_month: row.get(5)?,
        created_at: row.get(6)?,
    })
}
