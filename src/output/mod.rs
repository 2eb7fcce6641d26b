//! Result reporting
//!
//! Ranked records go to every configured [`Reporter`]: the console table and
//! the CSV export. Progress bars for the long-running phases live here too.

mod colored;
mod csv;
mod formatter;

pub use self::colored::{ColorScheme, ConsoleReporter, LatencyLevel};
pub use self::csv::CsvReporter;
pub use formatter::{align_text, Alignment, Column, PlainFormatter, RowData, TableFormat};

use crate::error::Result;
use crate::models::{Config, RankedRecord};
use indicatif::{ProgressBar, ProgressStyle};

/// Sink for the final ranked records
pub trait Reporter {
    fn report(&self, records: &[RankedRecord]) -> Result<()>;
}

/// Reporters for a run: CSV export first, then the console table
pub fn reporters_for(config: &Config) -> Vec<Box<dyn Reporter>> {
    vec![
        Box::new(CsvReporter::from_config(config)),
        Box::new(ConsoleReporter::from_config(config)),
    ]
}

/// Phase progress bar; hidden when disabled so callers never branch
pub fn create_progress_bar(len: u64, prefix: &str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::with_template("[{prefix}] {elapsed_precise} {bar:36.cyan/blue} {pos:>4}/{len:4} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");

    let bar = ProgressBar::new(len);
    bar.set_style(style);
    bar.set_prefix(prefix.to_string());
    bar
}
