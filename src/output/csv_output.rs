//! CSV output sink

use crate::output::traits::{OutputError, OutputResult, OutputSink, Product};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

const SEPARATOR: char = ',';

/// Writes products as RFC 4180 CSV
pub struct CsvSink {
    writer: Option<BufWriter<File>>,
}

impl CsvSink {
    /// Truncates `path` for a fresh crawl
    pub fn create(path: &Path) -> OutputResult<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Opens `path` for appending when resuming
    pub fn append(path: &Path) -> OutputResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
        })
    }

    fn writer(&mut self) -> OutputResult<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or(OutputError::Closed)
    }
}

impl OutputSink for CsvSink {
    fn write_header(&mut self, fields: &[&str]) -> OutputResult<()> {
        let writer = self.writer()?;
        write_row(&mut *writer, fields)?;
        writer.flush()?;
        Ok(())
    }

    fn write_record(&mut self, product: &Product) -> OutputResult<()> {
        let writer = self.writer()?;
        write_row(&mut *writer, &product.values())?;
        writer.flush()?;
        Ok(())
    }

    fn flush_and_close(&mut self) -> OutputResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEPARATOR) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Writes one CSV row terminated by CRLF
fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", SEPARATOR)?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    write!(w, "\r\n")
}
