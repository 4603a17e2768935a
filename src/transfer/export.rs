use chrono::{DateTime, NaiveDate, Utc};

use super::codec::{Cell, SheetWriter, write_workbook};
use super::{
    ACTIVITY_COLUMNS, ACTIVITY_SHEET, ASSET_COLUMNS, ASSET_SHEET, ASSIGNMENT_COLUMNS,
    ASSIGNMENT_SHEET, EMPLOYEE_COLUMNS, EMPLOYEE_SHEET, USER_ASSET_COLUMNS, USER_ASSET_SHEET,
};
use crate::error::Result;
use crate::store::Store;
use crate::types::{ActivityLogEntry, AssetView, AssignmentView, Employee, EntityType, User};

pub const ALL_DATA_PREFIX: &str = "export-all-data";
pub const USER_DATA_PREFIX: &str = "export-data-user";

const NO_DATA: &str = "Không có dữ liệu";
const NO_EMPLOYEE_ASSETS: &str = "Chưa có tài sản nào được bàn giao cho nhân viên này";
const NO_USER_ASSETS: &str = "Chưa có tài sản nào được bàn giao bởi user này";

/// `<prefix>-DD-MM-YYYY.xlsx`
#[must_use]
pub fn export_file_name(prefix: &str, day: NaiveDate) -> String {
    format!("{prefix}-{}.xlsx", day.format("%d-%m-%Y"))
}

fn date_cell(date: Option<NaiveDate>) -> Cell {
    date.map_or(Cell::Empty, Cell::Date)
}

fn timestamp_cell(at: &DateTime<Utc>) -> Cell {
    Cell::Text(at.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn asset_row(view: &AssetView) -> Vec<Cell> {
    let asset = &view.asset;
    vec![
        Cell::text(&asset.asset_code),
        Cell::text(&asset.asset_name),
        Cell::opt_text(view.type_name.as_deref()),
        Cell::opt_text(asset.brand.as_deref()),
        Cell::opt_text(asset.model.as_deref()),
        Cell::opt_text(asset.serial_number.as_deref()),
        Cell::text(asset.status.label()),
        date_cell(asset.purchase_date),
        asset.purchase_price.map_or(Cell::Empty, Cell::Number),
        Cell::opt_text(asset.location.as_deref()),
        Cell::opt_text(asset.notes.as_deref()),
        Cell::opt_text(view.assigned_to_name.as_deref()),
        timestamp_cell(&asset.created_at),
    ]
}

fn employee_row(employee: &Employee) -> Vec<Cell> {
    vec![
        Cell::text(&employee.employee_code),
        Cell::text(&employee.full_name),
        Cell::text(&employee.email),
        Cell::opt_text(employee.department.as_deref()),
        Cell::opt_text(employee.position.as_deref()),
        Cell::opt_text(employee.phone.as_deref()),
        timestamp_cell(&employee.created_at),
    ]
}

fn assignment_row(view: &AssignmentView) -> Vec<Cell> {
    let assignment = &view.assignment;
    vec![
        Cell::text(&view.asset_code),
        Cell::text(&view.asset_name),
        Cell::text(&view.employee_code),
        Cell::text(&view.employee_name),
        Cell::Date(assignment.assigned_date),
        date_cell(assignment.return_date),
        Cell::text(assignment.status.label()),
        Cell::opt_text(assignment.assigned_by.as_deref()),
        Cell::opt_text(assignment.notes.as_deref()),
        timestamp_cell(&assignment.created_at),
    ]
}

fn held_asset_row(view: &AssignmentView) -> Vec<Cell> {
    let assignment = &view.assignment;
    vec![
        Cell::text(&view.employee_name),
        Cell::text(&view.asset_code),
        Cell::text(&view.asset_name),
        Cell::opt_text(view.type_name.as_deref()),
        Cell::opt_text(view.brand.as_deref()),
        Cell::opt_text(view.model.as_deref()),
        Cell::opt_text(view.serial_number.as_deref()),
        Cell::Date(assignment.assigned_date),
        date_cell(assignment.return_date),
        Cell::text(assignment.status.label()),
        Cell::opt_text(assignment.notes.as_deref()),
    ]
}

fn activity_row(entry: &ActivityLogEntry) -> Vec<Cell> {
    let entity = EntityType::parse(&entry.entity_type)
        .map_or_else(|| entry.entity_type.clone(), |e| e.title().to_string());
    vec![
        timestamp_cell(&entry.created_at),
        Cell::text(entry.action_type.label()),
        Cell::Text(entity),
        Cell::opt_text(entry.entity_name.as_deref()),
        Cell::opt_text(entry.description.as_deref()),
    ]
}

/// Every asset, employee and assignment, one sheet each.
pub fn export_all(store: &dyn Store) -> Result<Vec<u8>> {
    let mut assets = SheetWriter::new(ASSET_SHEET, &ASSET_COLUMNS);
    for view in store.list_all_assets()? {
        assets.push(asset_row(&view));
    }

    let mut employees = SheetWriter::new(EMPLOYEE_SHEET, &EMPLOYEE_COLUMNS);
    for employee in store.list_all_employees()? {
        employees.push(employee_row(&employee));
    }

    let mut assignments = SheetWriter::new(ASSIGNMENT_SHEET, &ASSIGNMENT_COLUMNS);
    for view in store.list_all_assignments()? {
        assignments.push(assignment_row(&view));
    }

    write_workbook(&[assets, employees, assignments])
}

/// Assignments reachable from `user`: through the linked employee when
/// there is one, otherwise the assignments the user created.
fn reachable_assignments(store: &dyn Store, user: &User) -> Result<Vec<AssignmentView>> {
    let mut views = match user.employee_id {
        Some(employee_id) => store.list_employee_assignments(employee_id, false)?,
        None => store.list_assignments_logged_by(user.id)?,
    };
    views.sort_by(|a, b| {
        a.employee_name
            .cmp(&b.employee_name)
            .then_with(|| b.assignment.assigned_date.cmp(&a.assignment.assigned_date))
    });
    Ok(views)
}

/// The assets handed over to or by `user`, plus their activity history.
pub fn export_user(store: &dyn Store, user: &User) -> Result<Vec<u8>> {
    let mut held = SheetWriter::new(USER_ASSET_SHEET, &USER_ASSET_COLUMNS);
    let views = reachable_assignments(store, user)?;
    if views.is_empty() {
        let reason = if user.employee_id.is_some() {
            NO_EMPLOYEE_ASSETS
        } else {
            NO_USER_ASSETS
        };
        held.push(vec![Cell::Empty, Cell::text(NO_DATA), Cell::text(reason)]);
    }
    for view in &views {
        held.push(held_asset_row(view));
    }

    let mut activity = SheetWriter::new(ACTIVITY_SHEET, &ACTIVITY_COLUMNS);
    for entry in store.list_user_activity_logs(user.id)? {
        activity.push(activity_row(&entry));
    }

    write_workbook(&[held, activity])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;
    use crate::transfer::codec::read_workbook;
    use crate::transfer::decode_assets;
    use crate::types::{
        ActionType, AssetDraft, AssetStatus, EmployeeDraft, NewActivityLog, NewAssignment,
        NewUser, Role,
    };

    fn test_store() -> (TempDir, Arc<SqliteStore>) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, Arc::new(store))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed(store: &SqliteStore) -> (i64, i64) {
        let laptop = store.create_asset_type("Laptop", None).unwrap();
        let asset = store
            .create_asset(&AssetDraft {
                asset_code: "PC001".to_string(),
                asset_name: "Dell OptiPlex".to_string(),
                asset_type_id: Some(laptop.id),
                purchase_price: Some(1500.0),
                purchase_date: Some(date(2023, 12, 1)),
                ..AssetDraft::default()
            })
            .unwrap();
        let employee = store
            .create_employee(&EmployeeDraft {
                employee_code: "E001".to_string(),
                full_name: "Nguyen Van A".to_string(),
                email: "a@example.com".to_string(),
                ..EmployeeDraft::default()
            })
            .unwrap();
        (asset.id, employee.id)
    }

    fn user(store: &SqliteStore, employee_id: Option<i64>) -> User {
        store
            .create_user(
                &NewUser {
                    username: "viewer".to_string(),
                    email: "viewer@example.com".to_string(),
                    password_hash: String::new(),
                    role: Role::User,
                    employee_id,
                    is_active: true,
                },
                &[],
            )
            .unwrap()
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            export_file_name(ALL_DATA_PREFIX, date(2024, 2, 5)),
            "export-all-data-05-02-2024.xlsx"
        );
    }

    #[test]
    fn test_export_all_sheets() {
        let (_temp, store) = test_store();
        let (asset_id, employee_id) = seed(&store);
        store
            .assign_asset(&NewAssignment {
                asset_id,
                employee_id,
                assigned_date: date(2024, 1, 10),
                assigned_by: Some("admin".to_string()),
                notes: None,
            })
            .unwrap();

        let sheets = read_workbook(&export_all(store.as_ref()).unwrap()).unwrap();
        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![ASSET_SHEET, EMPLOYEE_SHEET, ASSIGNMENT_SHEET]);

        let assets = &sheets[0];
        assert_eq!(assets.cell(1, 0).as_text().as_deref(), Some("PC001"));
        assert_eq!(
            assets.cell(1, 6).as_text().as_deref(),
            Some(AssetStatus::Assigned.label())
        );
        assert_eq!(assets.cell(1, 7).as_text().as_deref(), Some("2023-12-01"));
        assert_eq!(assets.cell(1, 8), &Cell::Number(1500.0));
        assert_eq!(assets.cell(1, 11).as_text().as_deref(), Some("Nguyen Van A"));

        let assignments = &sheets[2];
        assert_eq!(assignments.cell(1, 2).as_text().as_deref(), Some("E001"));
        assert_eq!(
            assignments.cell(1, 6).as_text().as_deref(),
            Some("Đang sử dụng")
        );
    }

    #[test]
    fn test_export_then_import_updates_in_place() {
        let (_temp, store) = test_store();
        seed(&store);

        let sheets = read_workbook(&export_all(store.as_ref()).unwrap()).unwrap();
        let decoded = decode_assets(&sheets).unwrap();
        assert!(decoded.errors.is_empty());

        let report = store.import_assets(&decoded.rows).unwrap();
        assert_eq!(report.success.len(), 1);
        assert!(report.errors.is_empty());

        let all = store.list_all_assets().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].asset.asset_code, "PC001");
        assert_eq!(all[0].asset.asset_name, "Dell OptiPlex");
        assert_eq!(all[0].asset.status, AssetStatus::Available);
        assert_eq!(all[0].asset.purchase_price, Some(1500.0));
    }

    #[test]
    fn test_export_user_placeholder_without_assignments() {
        let (_temp, store) = test_store();
        let (_, employee_id) = seed(&store);

        let linked = user(&store, Some(employee_id));
        let sheets = read_workbook(&export_user(store.as_ref(), &linked).unwrap()).unwrap();
        assert_eq!(sheets[0].name, USER_ASSET_SHEET);
        assert_eq!(sheets[0].cell(1, 1).as_text().as_deref(), Some(NO_DATA));
        assert_eq!(
            sheets[0].cell(1, 2).as_text().as_deref(),
            Some(NO_EMPLOYEE_ASSETS)
        );
    }

    #[test]
    fn test_export_user_lists_linked_assignments_and_activity() {
        let (_temp, store) = test_store();
        let (asset_id, employee_id) = seed(&store);
        let linked = user(&store, Some(employee_id));
        store
            .assign_asset(&NewAssignment {
                asset_id,
                employee_id,
                assigned_date: date(2024, 1, 10),
                assigned_by: None,
                notes: Some("new hire".to_string()),
            })
            .unwrap();
        store
            .create_activity_log(&NewActivityLog {
                user_id: Some(linked.id),
                username: Some(linked.username.clone()),
                action_type: ActionType::Update,
                entity_type: EntityType::Employee,
                entity_id: Some(employee_id),
                entity_name: Some("E001".to_string()),
                old_values: None,
                new_values: None,
                description: Some("Cập nhật nhân viên: E001".to_string()),
                ip_address: None,
            })
            .unwrap();

        let sheets = read_workbook(&export_user(store.as_ref(), &linked).unwrap()).unwrap();
        let held = &sheets[0];
        assert_eq!(held.cell(1, 0).as_text().as_deref(), Some("Nguyen Van A"));
        assert_eq!(held.cell(1, 1).as_text().as_deref(), Some("PC001"));
        assert_eq!(held.cell(1, 3).as_text().as_deref(), Some("Laptop"));
        assert_eq!(held.cell(1, 7).as_text().as_deref(), Some("2024-01-10"));
        assert_eq!(held.cell(1, 10).as_text().as_deref(), Some("new hire"));

        let activity = &sheets[1];
        assert_eq!(activity.name, ACTIVITY_SHEET);
        assert_eq!(activity.cell(1, 1).as_text().as_deref(), Some("Cập nhật"));
        assert_eq!(activity.cell(1, 2).as_text().as_deref(), Some("Nhân viên"));
    }
}
