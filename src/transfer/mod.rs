//! Bulk transfer between the registries and `.xlsx` workbooks.

pub mod codec;
mod export;
mod import;

pub use export::{
    ALL_DATA_PREFIX, USER_DATA_PREFIX, export_all, export_file_name, export_user,
};
pub use import::{
    Decoded, decode_assets, decode_employees, parse_date_cell, parse_number_cell, read_assets,
    read_employees,
};

/// Largest accepted upload.
pub const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const ASSET_SHEET: &str = "Tài sản";
pub const EMPLOYEE_SHEET: &str = "Nhân viên";
pub const ASSIGNMENT_SHEET: &str = "Bàn giao tài sản";
pub const USER_ASSET_SHEET: &str = "Tài sản đã bàn giao";
pub const ACTIVITY_SHEET: &str = "Lịch sử hoạt động";

/// Column headers and widths. Import matches columns by these headers, so
/// the order of the first columns is also the decode order.
pub const ASSET_COLUMNS: [(&str, f64); 13] = [
    ("Mã tài sản", 20.0),
    ("Tên tài sản", 30.0),
    ("Loại tài sản", 20.0),
    ("Thương hiệu", 15.0),
    ("Model", 25.0),
    ("Số Serial", 20.0),
    ("Trạng thái", 15.0),
    ("Ngày mua", 15.0),
    ("Giá mua", 15.0),
    ("Vị trí", 20.0),
    ("Ghi chú", 30.0),
    ("Người sử dụng", 25.0),
    ("Ngày tạo", 20.0),
];

pub const EMPLOYEE_COLUMNS: [(&str, f64); 7] = [
    ("Mã nhân viên", 15.0),
    ("Họ và tên", 25.0),
    ("Email", 30.0),
    ("Phòng ban", 20.0),
    ("Chức vụ", 20.0),
    ("Số điện thoại", 15.0),
    ("Ngày tạo", 20.0),
];

pub const ASSIGNMENT_COLUMNS: [(&str, f64); 10] = [
    ("Mã tài sản", 15.0),
    ("Tên tài sản", 25.0),
    ("Mã nhân viên", 15.0),
    ("Tên nhân viên", 25.0),
    ("Ngày bàn giao", 15.0),
    ("Ngày trả", 15.0),
    ("Trạng thái", 15.0),
    ("Người bàn giao", 20.0),
    ("Ghi chú", 30.0),
    ("Ngày tạo", 20.0),
];

pub const USER_ASSET_COLUMNS: [(&str, f64); 11] = [
    ("Người sử dụng", 25.0),
    ("Mã tài sản", 20.0),
    ("Tên tài sản", 30.0),
    ("Loại tài sản", 20.0),
    ("Thương hiệu", 15.0),
    ("Model", 25.0),
    ("Số Serial", 20.0),
    ("Ngày bàn giao", 15.0),
    ("Ngày trả", 15.0),
    ("Trạng thái", 15.0),
    ("Ghi chú", 30.0),
];

pub const ACTIVITY_COLUMNS: [(&str, f64); 5] = [
    ("Thời gian", 20.0),
    ("Hành động", 15.0),
    ("Loại đối tượng", 15.0),
    ("Tên đối tượng", 30.0),
    ("Mô tả", 40.0),
];
