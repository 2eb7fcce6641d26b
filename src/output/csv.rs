//! CSV export of ranked records

use super::Reporter;
use crate::error::{ErrorContext, Result};
use crate::models::{Config, RankedRecord};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes every ranked record, header first, to a CSV file
pub struct CsvReporter {
    path: Option<PathBuf>,
}

impl CsvReporter {
    /// `None` disables the export
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.output_path().map(PathBuf::from))
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Serialise header and rows into any writer
    ///
    /// Colo, region and city columns follow when any record reports a location.
    pub fn write_records<W: Write>(writer: &mut W, records: &[RankedRecord]) -> std::io::Result<()> {
        let located = records.iter().any(|r| r.location_code().is_some());

        let mut header = RankedRecord::CSV_HEADER.join(",");
        if located {
            header.push(',');
            header.push_str(&RankedRecord::LOCATION_HEADER.join(","));
        }
        writeln!(writer, "{}", header)?;

        for record in records {
            let mut row = record.to_row().to_vec();
            if located {
                row.extend(record.location_cells());
            }
            let fields: Vec<String> = row.iter().map(|field| escape_field(field)).collect();
            writeln!(writer, "{}", fields.join(","))?;
        }
        writer.flush()
    }
}

impl Reporter for CsvReporter {
    fn report(&self, records: &[RankedRecord]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if records.is_empty() {
            return Ok(());
        }

        let file = File::create(path).with_context(|| format!("Cannot create output file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        Self::write_records(&mut writer, records)
            .with_context(|| format!("Cannot write output file {}", path.display()))
    }
}

/// Quote a field holding a separator, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
