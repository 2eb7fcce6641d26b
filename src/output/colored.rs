//! Console table reporter with optional terminal colors

use super::formatter::{PlainFormatter, RowData, TableFormat};
use super::Reporter;
use crate::error::Result;
use crate::models::{Config, RankedRecord};
use colored::*;
use std::net::IpAddr;

/// Latency classification for color coding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyLevel {
    Excellent, // < 50ms
    Good,      // 50-150ms
    Fair,      // 150-300ms
    Poor,      // >= 300ms or undefined
}

impl LatencyLevel {
    pub fn from_delay_ms(delay_ms: Option<f64>) -> Self {
        match delay_ms {
            Some(ms) if ms < 50.0 => Self::Excellent,
            Some(ms) if ms < 150.0 => Self::Good,
            Some(ms) if ms < 300.0 => Self::Fair,
            _ => Self::Poor,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub speed: Color,
    pub lossy: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            speed: Color::Magenta,
            lossy: Color::Yellow,
            muted: Color::BrightBlack,
        }
    }
}

/// Prints the top `print_num` records as a table
pub struct ConsoleReporter {
    print_num: usize,
    enable_color: bool,
    color_scheme: ColorScheme,
}

impl ConsoleReporter {
    pub fn new(print_num: usize, enable_color: bool) -> Self {
        Self {
            print_num,
            enable_color,
            color_scheme: ColorScheme::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.print_num, config.enable_color)
    }

    pub fn with_color_scheme(mut self, color_scheme: ColorScheme) -> Self {
        self.color_scheme = color_scheme;
        self
    }

    /// Nothing is printed when `print_num` is zero
    pub fn is_enabled(&self) -> bool {
        self.print_num > 0
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Table text for the leading records, or the empty-result notice
    pub fn render(&self, records: &[RankedRecord]) -> String {
        if records.is_empty() {
            return self
                .colorize(
                    "No addresses passed the filters (results: 0); check the input ranges and thresholds.",
                    self.color_scheme.lossy,
                )
                .to_string();
        }

        let shown = &records[..records.len().min(self.print_num)];
        let wide = shown.iter().any(|r| matches!(r.address(), IpAddr::V6(_)));
        let located = shown.iter().any(|r| r.location_code().is_some());
        let formatter = PlainFormatter::new(if located {
            TableFormat::results_with_location(wide)
        } else {
            TableFormat::results(wide)
        });

        let rows: Vec<RowData> = shown
            .iter()
            .map(|r| {
                let mut row = r.to_row().to_vec();
                if located {
                    row.extend(r.location_cells());
                }
                row
            })
            .collect();
        let widths = formatter.column_widths(&rows);

        let mut lines = Vec::with_capacity(rows.len() + 1);
        let header = formatter.header_line(&widths);
        if self.enable_color {
            lines.push(header.color(self.color_scheme.header).bold().to_string());
        } else {
            lines.push(header);
        }

        for (record, row) in shown.iter().zip(&rows) {
            let cells = formatter.padded_cells(row, &widths);
            let painted: Vec<String> = cells
                .iter()
                .enumerate()
                .map(|(idx, cell)| self.paint_cell(record, idx, cell))
                .collect();
            lines.push(painted.join(&" ".repeat(formatter.format().gap)).trim_end().to_string());
        }

        lines.join("\n")
    }

    fn paint_cell(&self, record: &RankedRecord, column: usize, cell: &str) -> String {
        match column {
            3 if record.probe.loss_rate() > 0.0 => self.colorize(cell, self.color_scheme.lossy).to_string(),
            4 => {
                let level = LatencyLevel::from_delay_ms(record.probe.mean_delay_ms());
                self.colorize(cell, level.color()).to_string()
            }
            5 if record.download_speed.is_some() => self.colorize(cell, self.color_scheme.speed).to_string(),
            5 => self.colorize(cell, self.color_scheme.muted).to_string(),
            _ => cell.to_string(),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, records: &[RankedRecord]) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        println!("{}", self.render(records));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbeResult;
    use std::time::Duration;

    fn record(address: &str, delay_ms: u64) -> RankedRecord {
        let probe = ProbeResult::new(address.parse().unwrap(), 4, 4, Duration::from_millis(delay_ms * 4));
        RankedRecord::untested(probe)
    }

    #[test]
    fn test_latency_levels() {
        assert_eq!(LatencyLevel::from_delay_ms(Some(12.0)), LatencyLevel::Excellent);
        assert_eq!(LatencyLevel::from_delay_ms(Some(120.0)), LatencyLevel::Good);
        assert_eq!(LatencyLevel::from_delay_ms(Some(299.0)), LatencyLevel::Fair);
        assert_eq!(LatencyLevel::from_delay_ms(None), LatencyLevel::Poor);
    }

    #[test]
    fn test_print_num_limits_rows() {
        let reporter = ConsoleReporter::new(2, false);
        let records = vec![record("1.0.0.1", 10), record("1.0.0.2", 20), record("1.0.0.3", 30)];
        let output = reporter.render(&records);

        assert_eq!(output.lines().count(), 3);
        assert!(output.contains("1.0.0.2"));
        assert!(!output.contains("1.0.0.3"));
    }

    #[test]
    fn test_fewer_records_than_print_num() {
        let reporter = ConsoleReporter::new(10, false);
        let output = reporter.render(&[record("1.0.0.1", 10)]);
        assert_eq!(output.lines().count(), 2);
        assert!(output.contains("10.00"));
    }

    #[test]
    fn test_empty_result_notice() {
        let reporter = ConsoleReporter::new(10, false);
        assert!(reporter.render(&[]).contains("results: 0"));
    }

    #[test]
    fn test_zero_print_num_disables() {
        let reporter = ConsoleReporter::new(0, false);
        assert!(!reporter.is_enabled());
        assert!(reporter.report(&[record("1.0.0.1", 10)]).is_ok());
    }

    #[test]
    fn test_location_columns_only_when_reported() {
        let reporter = ConsoleReporter::new(5, false);
        let plain = reporter.render(&[record("1.0.0.1", 10)]);
        assert!(!plain.contains("Colo"));

        let probe = ProbeResult::new("1.0.0.2".parse().unwrap(), 4, 4, Duration::from_millis(80))
            .with_location(Some("HKG".to_string()));
        let mut located = RankedRecord::untested(probe);
        located.site = Some(crate::models::EdgeSite {
            region: "Asia Pacific".to_string(),
            city: "Hong Kong".to_string(),
        });

        let output = reporter.render(&[located, record("1.0.0.1", 10)]);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].contains("Colo") && lines[0].contains("Region"));
        assert!(lines[1].contains("HKG") && lines[1].ends_with("Hong Kong"));
        assert!(!lines[2].contains("HKG"));
    }

    #[test]
    fn test_plain_output_has_no_escape_codes() {
        let reporter = ConsoleReporter::new(5, false);
        let output = reporter.render(&[record("2606:4700::6810:84e5", 10)]);
        assert!(!output.contains('\u{1b}'));
        assert!(output.lines().next().unwrap().starts_with("IP Address"));
    }
}
