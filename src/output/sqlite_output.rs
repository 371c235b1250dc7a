//! SQLite output sink
//!
//! Products are stored in a single `products` table, one row per record,
//! stamped with the extraction time.

use crate::output::traits::{OutputError, OutputResult, OutputSink, Product, PRODUCT_FIELDS};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    image TEXT NOT NULL,
    name TEXT NOT NULL,
    weight TEXT NOT NULL,
    category TEXT NOT NULL,
    price INTEGER NOT NULL,
    short_description TEXT NOT NULL,
    extracted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);
"#;

/// Writes products into a SQLite database
pub struct SqliteSink {
    conn: Option<Connection>,
}

impl SqliteSink {
    /// Opens the database at `path`
    ///
    /// With `truncate` set, previously written products are dropped.
    pub fn open(path: &Path, truncate: bool) -> OutputResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        if truncate {
            conn.execute_batch("DROP TABLE IF EXISTS products;")?;
        }
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self { conn: Some(conn) })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&self) -> OutputResult<&Connection> {
        self.conn.as_ref().ok_or(OutputError::Closed)
    }

    #[cfg(test)]
    fn count(&self) -> OutputResult<i64> {
        Ok(self
            .conn()?
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?)
    }
}

impl OutputSink for SqliteSink {
    fn write_header(&mut self, fields: &[&str]) -> OutputResult<()> {
        if fields != &PRODUCT_FIELDS[..] {
            return Err(OutputError::Header(fields.join(",")));
        }
        self.conn()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn write_record(&mut self, product: &Product) -> OutputResult<()> {
        self.conn()?.execute(
            "INSERT INTO products (image, name, weight, category, price, short_description, extracted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                product.image,
                product.name,
                product.weight,
                product.category,
                product.price,
                product.short_description,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn flush_and_close(&mut self) -> OutputResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| OutputError::Sqlite(e))?;
        }
        Ok(())
    }
}
