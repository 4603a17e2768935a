//! Decoding of uploaded spreadsheets into import rows.
//!
//! The header row is located by its first-column label, so files with a
//! title block above the table still import. Rows that cannot be decoded are
//! reported with their 1-based sheet row number and skipped; the remaining
//! rows go on to the store.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::codec::{Cell, Sheet, read_workbook, serial_to_date};
use super::{ASSET_COLUMNS, ASSET_SHEET, EMPLOYEE_COLUMNS, EMPLOYEE_SHEET};
use crate::error::{Error, Result};
use crate::server::validation::is_valid_email;
use crate::types::{AssetImportRow, AssetStatus, EmployeeDraft, EmployeeImportRow, RowError};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Rows decoded from a sheet, plus the rows that were rejected outright.
#[derive(Debug, Clone, Default)]
pub struct Decoded<T> {
    pub rows: Vec<T>,
    pub errors: Vec<RowError>,
}

impl<T> Decoded<T> {
    fn reject(&mut self, row: usize, message: impl Into<String>) {
        self.errors.push(RowError {
            row,
            message: message.into(),
        });
    }
}

struct Table<'a> {
    sheet: &'a Sheet,
    header_row: usize,
    columns: HashMap<String, usize>,
}

impl<'a> Table<'a> {
    /// Finds the header row whose column A reads `first_header`.
    fn locate(sheet: &'a Sheet, first_header: &str) -> Result<Self> {
        let header_row = (0..sheet.rows.len())
            .find(|&r| sheet.cell(r, 0).as_text().as_deref() == Some(first_header))
            .ok_or_else(|| {
                Error::validation(format!(
                    "Header row not found: expected '{first_header}' in column A"
                ))
            })?;

        let columns = sheet.rows[header_row]
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell.as_text().map(|name| (name, i)))
            .collect();

        Ok(Self {
            sheet,
            header_row,
            columns,
        })
    }

    /// Data rows after the header as `(sheet row number, row index)`,
    /// skipping rows with no content at all.
    fn data_rows(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.header_row + 1..self.sheet.rows.len())
            .filter(|&r| !self.sheet.rows[r].iter().all(Cell::is_blank))
            .map(|r| (r + 1, r))
    }

    fn cell(&self, row: usize, column: &str) -> &Cell {
        match self.columns.get(column) {
            Some(&col) => self.sheet.cell(row, col),
            None => &Cell::Empty,
        }
    }

    fn text(&self, row: usize, column: &str) -> Option<String> {
        self.cell(row, column).as_text()
    }
}

/// Picks the sheet named `name`, else the first sheet of the workbook.
fn choose_sheet<'a>(sheets: &'a [Sheet], name: &str) -> Result<&'a Sheet> {
    sheets
        .iter()
        .find(|s| s.name == name)
        .or_else(|| sheets.first())
        .ok_or_else(|| Error::validation("The workbook has no sheets"))
}

/// Parses a date from a native date cell, a date serial, or common textual
/// layouts (ISO first, then day-first).
pub fn parse_date_cell(cell: &Cell) -> std::result::Result<Option<NaiveDate>, String> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Date(d) => Ok(Some(*d)),
        Cell::Number(n) => serial_to_date(*n)
            .map(Some)
            .ok_or_else(|| format!("Invalid date serial: {n}")),
        other => {
            let Some(text) = other.as_text() else {
                return Ok(None);
            };
            if let Some(date) = DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
            {
                return Ok(Some(date));
            }
            // ISO timestamps such as 2024-01-10T00:00:00
            text.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
                .map(Some)
                .ok_or_else(|| format!("Invalid date: '{text}'"))
        }
    }
}

/// Parses a number, stripping currency symbols and separators from text.
/// A text value with several dots treats them as thousands separators.
pub fn parse_number_cell(cell: &Cell) -> std::result::Result<Option<f64>, String> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(n) => Ok(Some(*n)),
        other => {
            let Some(text) = other.as_text() else {
                return Ok(None);
            };
            let mut digits: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            if digits.matches('.').count() > 1 {
                digits.retain(|c| c != '.');
            }
            if digits.is_empty() {
                return Err(format!("Invalid number: '{text}'"));
            }
            digits
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("Invalid number: '{text}'"))
        }
    }
}

/// Accepts the localized label or the raw status value. Unknown values fall
/// back to the default status.
fn parse_status(text: &str) -> AssetStatus {
    AssetStatus::from_label(text)
        .or_else(|| AssetStatus::parse(&text.to_lowercase()))
        .unwrap_or_default()
}

pub fn decode_assets(sheets: &[Sheet]) -> Result<Decoded<AssetImportRow>> {
    let sheet = choose_sheet(sheets, ASSET_SHEET)?;
    let [code, name, type_name, brand, model, serial, status, bought, price, location, notes, ..] =
        ASSET_COLUMNS.map(|(title, _)| title);
    let table = Table::locate(sheet, code)?;
    let mut decoded = Decoded::default();

    for (row_number, r) in table.data_rows() {
        let (Some(asset_code), Some(asset_name)) = (table.text(r, code), table.text(r, name))
        else {
            decoded.reject(row_number, "Asset code and asset name are required");
            continue;
        };

        let purchase_date = match parse_date_cell(table.cell(r, bought)) {
            Ok(d) => d,
            Err(msg) => {
                decoded.reject(row_number, msg);
                continue;
            }
        };
        let purchase_price = match parse_number_cell(table.cell(r, price)) {
            Ok(p) => p,
            Err(msg) => {
                decoded.reject(row_number, msg);
                continue;
            }
        };

        decoded.rows.push(AssetImportRow {
            row: row_number,
            asset_code,
            asset_name,
            type_name: table.text(r, type_name),
            brand: table.text(r, brand),
            model: table.text(r, model),
            serial_number: table.text(r, serial),
            purchase_date,
            purchase_price,
            location: table.text(r, location),
            notes: table.text(r, notes),
            status: table.text(r, status).map(|s| parse_status(&s)),
        });
    }

    Ok(decoded)
}

pub fn decode_employees(sheets: &[Sheet]) -> Result<Decoded<EmployeeImportRow>> {
    let sheet = choose_sheet(sheets, EMPLOYEE_SHEET)?;
    let [code, name, email, department, position, phone, ..] =
        EMPLOYEE_COLUMNS.map(|(title, _)| title);
    let table = Table::locate(sheet, code)?;
    let mut decoded = Decoded::default();

    for (row_number, r) in table.data_rows() {
        let (Some(employee_code), Some(full_name), Some(email_value)) = (
            table.text(r, code),
            table.text(r, name),
            table.text(r, email),
        ) else {
            decoded.reject(
                row_number,
                "Employee code, full name and email are required",
            );
            continue;
        };
        if !is_valid_email(&email_value) {
            decoded.reject(row_number, format!("Invalid email: '{email_value}'"));
            continue;
        }

        decoded.rows.push(EmployeeImportRow {
            row: row_number,
            employee: EmployeeDraft {
                employee_code,
                full_name,
                email: email_value,
                department: table.text(r, department),
                position: table.text(r, position),
                phone: table.text(r, phone),
            },
        });
    }

    Ok(decoded)
}

/// Reads an uploaded workbook and decodes its asset table.
pub fn read_assets(bytes: &[u8]) -> Result<Decoded<AssetImportRow>> {
    decode_assets(&read_workbook(bytes)?)
}

/// Reads an uploaded workbook and decodes its employee table.
pub fn read_employees(bytes: &[u8]) -> Result<Decoded<EmployeeImportRow>> {
    decode_employees(&read_workbook(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, rows: Vec<Vec<Cell>>) -> Sheet {
        Sheet {
            name: name.to_string(),
            rows,
        }
    }

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_variants() {
        assert_eq!(parse_date_cell(&Cell::Empty), Ok(None));
        assert_eq!(parse_date_cell(&t("2024-01-10")), Ok(Some(date(2024, 1, 10))));
        assert_eq!(parse_date_cell(&t("10/01/2024")), Ok(Some(date(2024, 1, 10))));
        assert_eq!(
            parse_date_cell(&t("2024-01-10T08:30:00")),
            Ok(Some(date(2024, 1, 10)))
        );
        assert_eq!(
            parse_date_cell(&Cell::Number(45301.0)),
            Ok(Some(date(2024, 1, 10)))
        );
        assert!(parse_date_cell(&t("yesterday")).is_err());
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number_cell(&Cell::Number(12.5)), Ok(Some(12.5)));
        assert_eq!(parse_number_cell(&t("15.000.000 VND")), Ok(Some(15_000_000.0)));
        assert_eq!(parse_number_cell(&t("$1,250.50")), Ok(Some(1250.5)));
        assert_eq!(parse_number_cell(&t("  ")), Ok(None));
        assert!(parse_number_cell(&t("n/a")).is_err());
    }

    #[test]
    fn test_parse_status_label_value_and_fallback() {
        assert_eq!(parse_status("Bảo trì"), AssetStatus::Maintenance);
        assert_eq!(parse_status("Retired"), AssetStatus::Retired);
        assert_eq!(parse_status("broken"), AssetStatus::Available);
    }

    #[test]
    fn test_decode_assets_finds_header_below_title() {
        let sheets = vec![sheet(
            "Tài sản",
            vec![
                vec![t("Danh sách tài sản")],
                vec![],
                vec![
                    t("Mã tài sản"),
                    t("Tên tài sản"),
                    t("Loại tài sản"),
                    t("Thương hiệu"),
                    t("Model"),
                    t("Số Serial"),
                    t("Trạng thái"),
                    t("Ngày mua"),
                    t("Giá mua"),
                ],
                vec![
                    t("PC001"),
                    t("Dell OptiPlex"),
                    t("Máy tính để bàn"),
                    t("Dell"),
                    Cell::Empty,
                    Cell::Number(12345.0),
                    t("Khả dụng"),
                    t("2024-01-02"),
                    Cell::Number(1500.0),
                ],
                vec![Cell::Empty, t("   ")],
                vec![t("PC002"), Cell::Empty],
            ],
        )];

        let decoded = decode_assets(&sheets).unwrap();
        assert_eq!(decoded.rows.len(), 1);
        let row = &decoded.rows[0];
        assert_eq!(row.row, 4);
        assert_eq!(row.asset_code, "PC001");
        assert_eq!(row.type_name.as_deref(), Some("Máy tính để bàn"));
        assert_eq!(row.serial_number.as_deref(), Some("12345"));
        assert_eq!(row.model, None);
        assert_eq!(row.status, Some(AssetStatus::Available));
        assert_eq!(row.purchase_date, Some(date(2024, 1, 2)));
        assert_eq!(row.purchase_price, Some(1500.0));

        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoded.errors[0].row, 6);
    }

    #[test]
    fn test_decode_assets_rejects_bad_date() {
        let sheets = vec![sheet(
            "Sheet1",
            vec![
                vec![t("Mã tài sản"), t("Tên tài sản"), t("Ngày mua")],
                vec![t("PC001"), t("Dell"), t("soon")],
            ],
        )];
        let decoded = decode_assets(&sheets).unwrap();
        assert!(decoded.rows.is_empty());
        assert_eq!(decoded.errors[0].row, 2);
        assert!(decoded.errors[0].message.contains("soon"));
    }

    #[test]
    fn test_missing_header_is_validation_error() {
        let sheets = vec![sheet("Tài sản", vec![vec![t("Code"), t("Name")]])];
        assert!(matches!(decode_assets(&sheets), Err(Error::Validation(_))));
    }

    #[test]
    fn test_decode_employees_prefers_named_sheet() {
        let sheets = vec![
            sheet("Tài sản", vec![vec![t("Mã tài sản")]]),
            sheet(
                "Nhân viên",
                vec![
                    vec![
                        t("Mã nhân viên"),
                        t("Họ và tên"),
                        t("Email"),
                        t("Phòng ban"),
                    ],
                    vec![t("E001"), t("Nguyen Van A"), t("a@example.com"), t("IT")],
                    vec![t("E002"), t("Tran Thi B"), t("not-an-email")],
                    vec![t("E003"), t("Le Van C")],
                ],
            ),
        ];

        let decoded = decode_employees(&sheets).unwrap();
        assert_eq!(decoded.rows.len(), 1);
        assert_eq!(decoded.rows[0].employee.department.as_deref(), Some("IT"));
        let rows: Vec<usize> = decoded.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![3, 4]);
    }
}
