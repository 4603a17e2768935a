//! Spreadsheet codec: `.xlsx` bytes to rows of typed cells and back.

use std::fmt::Display;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::{Color, Format, Workbook};

use crate::error::{Error, Result};

const HEADER_FILL: u32 = 0xE0E0E0;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        value.map_or(Cell::Empty, Cell::text)
    }

    /// Trimmed textual form of the cell, `None` when blank.
    pub fn as_text(&self) -> Option<String> {
        let s = match self {
            Cell::Empty => return None,
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Bool(b) => b.to_string(),
        };
        (!s.is_empty()).then_some(s)
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().is_none()
    }
}

/// Converts a spreadsheet date serial (days since 1899-12-30) to a date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => serial_to_date(dt.as_f64()).map_or(Cell::Empty, Cell::Date),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(_) | Data::Empty => Cell::Empty,
        }
    }
}

/// One worksheet as an absolute grid: `rows[0][0]` is cell A1.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }
}

fn spreadsheet_err(e: impl Display) -> Error {
    Error::Spreadsheet(e.to_string())
}

/// Reads every worksheet of an `.xlsx` document.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<Sheet>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| Error::validation(format!("Not a readable .xlsx file: {e}")))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name).map_err(spreadsheet_err)?;
        let (row_offset, col_offset) = range
            .start()
            .map_or((0, 0), |(r, c)| (r as usize, c as usize));

        let mut rows = vec![Vec::new(); row_offset];
        for data_row in range.rows() {
            let mut row = vec![Cell::Empty; col_offset];
            row.extend(data_row.iter().map(Cell::from));
            rows.push(row);
        }
        sheets.push(Sheet { name, rows });
    }
    Ok(sheets)
}

/// A worksheet to be written: a bold header row then data rows.
#[derive(Debug, Clone)]
pub struct SheetWriter {
    pub name: String,
    pub columns: Vec<(&'static str, f64)>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetWriter {
    pub fn new(name: &str, columns: &[(&'static str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

/// Serializes worksheets into an `.xlsx` document.
pub fn write_workbook(sheets: &[SheetWriter]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(HEADER_FILL));

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(spreadsheet_err)?;

        for (col, (title, width)) in sheet.columns.iter().enumerate() {
            let col = col as u16;
            worksheet
                .write_string_with_format(0, col, *title, &header)
                .map_err(spreadsheet_err)?;
            worksheet
                .set_column_width(col, *width)
                .map_err(spreadsheet_err)?;
        }

        for (r, cells) in sheet.rows.iter().enumerate() {
            let row = (r + 1) as u32;
            for (c, cell) in cells.iter().enumerate() {
                let col = c as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) => {
                        worksheet
                            .write_string(row, col, s)
                            .map_err(spreadsheet_err)?;
                    }
                    Cell::Number(n) => {
                        worksheet
                            .write_number(row, col, *n)
                            .map_err(spreadsheet_err)?;
                    }
                    Cell::Date(d) => {
                        worksheet
                            .write_string(row, col, d.format("%Y-%m-%d").to_string())
                            .map_err(spreadsheet_err)?;
                    }
                    Cell::Bool(b) => {
                        worksheet
                            .write_boolean(row, col, *b)
                            .map_err(spreadsheet_err)?;
                    }
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(spreadsheet_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_to_date() {
        assert_eq!(
            serial_to_date(45301.0),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
        assert_eq!(
            serial_to_date(45301.75),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
        assert_eq!(serial_to_date(-1.0), None);
    }

    #[test]
    fn test_number_cell_as_text() {
        assert_eq!(Cell::Number(1001.0).as_text().as_deref(), Some("1001"));
        assert_eq!(Cell::Number(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(Cell::text("  ").as_text(), None);
    }

    #[test]
    fn test_write_then_read() {
        let mut sheet = SheetWriter::new("Tài sản", &[("Mã tài sản", 20.0), ("Giá mua", 15.0)]);
        sheet.push(vec![Cell::text("PC001"), Cell::Number(1500.0)]);
        sheet.push(vec![Cell::text("PC002"), Cell::Empty]);

        let bytes = write_workbook(&[sheet]).unwrap();
        let sheets = read_workbook(&bytes).unwrap();

        assert_eq!(sheets.len(), 1);
        let read = &sheets[0];
        assert_eq!(read.name, "Tài sản");
        assert_eq!(read.cell(0, 0).as_text().as_deref(), Some("Mã tài sản"));
        assert_eq!(read.cell(1, 0).as_text().as_deref(), Some("PC001"));
        assert_eq!(read.cell(1, 1), &Cell::Number(1500.0));
        assert!(read.cell(2, 1).is_blank());
    }

    #[test]
    fn test_garbage_is_validation_error() {
        assert!(matches!(
            read_workbook(b"definitely not a zip"),
            Err(Error::Validation(_))
        ));
    }
}
