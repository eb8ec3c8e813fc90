//! Tabular export of review sinks
//!
//! CSV and TSV share one delimited writer; Excel workbooks go through
//! `rust_xlsxwriter`. Every format writes the header row, so a sink without
//! records still produces a valid file.

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};
use std::path::PathBuf;
use tracing::info;

use crate::domain::{ReviewField, ReviewRecord, ReviewSink};
use crate::infrastructure::config::ExportFormat;

/// Worksheet name used for Excel exports
pub const SHEET_NAME: &str = "Reviews";

/// Writes sinks into an output directory
#[derive(Debug, Clone)]
pub struct RecordExporter {
    output_dir: PathBuf,
}

impl RecordExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Target path for a stem and format
    pub fn path_for(&self, stem: &str, format: ExportFormat) -> PathBuf {
        self.output_dir.join(format!("{stem}.{}", format.extension()))
    }

    /// Write the sink to `<output_dir>/<stem>.<ext>`, replacing any previous file
    pub fn export(&self, sink: &ReviewSink, stem: &str, format: ExportFormat) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", self.output_dir))?;

        let path = self.path_for(stem, format);
        match format.delimiter() {
            Some(_) => {
                let file = std::fs::File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
                write_records(file, sink.records(), format).with_context(|| format!("Failed to write {:?}", path))?;
            }
            None => {
                let mut workbook = build_workbook(sink.records())?;
                workbook.save(&path).with_context(|| format!("Failed to write {:?}", path))?;
            }
        }

        info!("💾 Exported {} reviews to {}", sink.len(), path.display());
        Ok(path)
    }

    /// Export the sink once per requested format
    pub fn export_all(&self, sink: &ReviewSink, stem: &str, formats: &[ExportFormat]) -> Result<Vec<PathBuf>> {
        formats.iter().map(|format| self.export(sink, stem, *format)).collect()
    }
}

/// Serialize records with a header row into any writer
pub fn write_records<W: std::io::Write>(writer: W, records: &[ReviewRecord], format: ExportFormat) -> Result<()> {
    let delimiter = format
        .delimiter()
        .with_context(|| format!("{format:?} is not a delimited format"))?;
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(ReviewRecord::columns())?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One spreadsheet cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// Cells of one record in export column order; absent values stay `None`
pub fn record_cells(record: &ReviewRecord) -> Vec<Option<Cell<'_>>> {
    ReviewField::ALL
        .iter()
        .map(|field| match field {
            ReviewField::AppName => record.app_name.as_deref().map(Cell::Text),
            ReviewField::Platform => record.platform.as_deref().map(Cell::Text),
            ReviewField::ReviewerName => record.reviewer_name.as_deref().map(Cell::Text),
            ReviewField::Rating => record.rating.map(|r| Cell::Number(f64::from(r))),
            ReviewField::Date => record.date.as_deref().map(Cell::Text),
            ReviewField::Title => record.title.as_deref().map(Cell::Text),
            ReviewField::Body => record.body.as_deref().map(Cell::Text),
            ReviewField::HelpfulCount => record.helpful_count.map(|n| Cell::Number(f64::from(n))),
        })
        .collect()
}

/// Lay the records out on a single sheet below a bold header row
pub fn build_workbook(records: &[ReviewRecord]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in (0u16..).zip(ReviewRecord::columns()) {
        sheet.write_string_with_format(0, col, name, &header)?;
    }
    for (row, record) in (1u32..).zip(records) {
        for (col, cell) in (0u16..).zip(record_cells(record)) {
            match cell {
                Some(Cell::Text(text)) => {
                    sheet.write_string(row, col, text)?;
                }
                Some(Cell::Number(value)) => {
                    sheet.write_number(row, col, value)?;
                }
                None => {}
            }
        }
    }
    sheet.autofit();
    Ok(workbook)
}
