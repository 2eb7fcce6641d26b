//! Plain table layout shared by the console reporters

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, min_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width,
        }
    }
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_header: bool,
    /// Spaces between columns
    pub gap: usize,
}

impl TableFormat {
    /// Layout of the ranked-result table
    ///
    /// The address column widens for IPv6 results.
    pub fn results(wide_address: bool) -> Self {
        let address_width = if wide_address { 39 } else { 15 };
        Self {
            columns: vec![
                Column::new("IP Address", Alignment::Left, address_width),
                Column::new("Sent", Alignment::Right, 4),
                Column::new("Received", Alignment::Right, 8),
                Column::new("Loss", Alignment::Right, 6),
                Column::new("Delay(ms)", Alignment::Right, 9),
                Column::new("Speed(MB/s)", Alignment::Right, 11),
            ],
            show_header: true,
            gap: 2,
        }
    }

    /// Result table with trailing colo, region and city columns
    pub fn results_with_location(wide_address: bool) -> Self {
        let mut format = Self::results(wide_address);
        format.columns.extend([
            Column::new("Colo", Alignment::Left, 4),
            Column::new("Region", Alignment::Left, 6),
            Column::new("City", Alignment::Left, 4),
        ]);
        format
    }
}

/// Lays rows out as space-separated fixed-width columns
#[derive(Debug, Clone)]
pub struct PlainFormatter {
    format: TableFormat,
}

impl PlainFormatter {
    pub fn new(format: TableFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &TableFormat {
        &self.format
    }

    /// Width per column: header, minimum and widest cell, whichever is larger
    pub fn column_widths(&self, rows: &[RowData]) -> Vec<usize> {
        self.format
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let widest = rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0);
                column.min_width.max(column.header.len()).max(widest)
            })
            .collect()
    }

    pub fn header_line(&self, widths: &[usize]) -> String {
        let headers: Vec<String> = self.format.columns.iter().map(|c| c.header.clone()).collect();
        self.row_line(&headers, widths)
    }

    /// One row, with every cell padded to its column width
    pub fn row_line(&self, row: &[String], widths: &[usize]) -> String {
        self.padded_cells(row, widths)
            .join(&" ".repeat(self.format.gap))
            .trim_end()
            .to_string()
    }

    /// Cells padded but not joined, for callers that colour them individually
    pub fn padded_cells(&self, row: &[String], widths: &[usize]) -> Vec<String> {
        row.iter()
            .zip(widths)
            .enumerate()
            .map(|(idx, (cell, &width))| {
                let alignment = self
                    .format
                    .columns
                    .get(idx)
                    .map(|c| c.alignment)
                    .unwrap_or(Alignment::Left);
                align_text(cell, width, alignment)
            })
            .collect()
    }

    pub fn render(&self, rows: &[RowData]) -> String {
        let widths = self.column_widths(rows);
        let mut lines = Vec::with_capacity(rows.len() + 1);
        if self.format.show_header {
            lines.push(self.header_line(&widths));
        }
        lines.extend(rows.iter().map(|row| self.row_line(row, &widths)));
        lines.join("\n")
    }
}

/// Align text within specified width; longer text is left as is
pub fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    match alignment {
        Alignment::Left => format!("{:<width$}", text, width = width),
        Alignment::Right => format!("{:>width$}", text, width = width),
    }
}
