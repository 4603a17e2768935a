use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::{
    Connection, OptionalExtension, Row, ToSql, TransactionBehavior, params, params_from_iter,
};

use super::schema::SCHEMA;
use super::{ActivityFilter, AssetFilter, AssignmentFilter, Store};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

macro_rules! sql_text_enum {
    ($($ty:ty),+ $(,)?) => {$(
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                <$ty>::parse(s).ok_or_else(|| {
                    FromSqlError::Other(format!("unknown {} '{}'", stringify!($ty), s).into())
                })
            }
        }
    )+};
}

sql_text_enum!(AssetStatus, AssignmentStatus, Role, ActionType, EntityType);

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .as_deref()
        .and_then(parse_date))
}

fn required_date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    Ok(parse_date(&raw).unwrap_or_else(|| {
        tracing::error!("Invalid date in database: '{}'", raw);
        Utc::now().date_naive()
    }))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Maps a UNIQUE violation to a business-rule conflict; other failures stay
/// database errors.
fn unique_as_conflict(message: &'static str) -> impl FnOnce(rusqlite::Error) -> Error {
    move |e| {
        if is_unique_violation(&e) {
            Error::conflict(message)
        } else {
            Error::from(e)
        }
    }
}

fn like_pattern(search: &str) -> String {
    format!("%{}%", search.trim())
}

fn opt_date(d: &Option<NaiveDate>) -> Option<String> {
    d.as_ref().map(format_date)
}

fn collect<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> Result<Vec<T>> {
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

// Row mapping

const ASSET_TYPE_COLUMNS: &str = "id, type_name, description, created_at";

fn asset_type_from_row(row: &Row<'_>) -> rusqlite::Result<AssetType> {
    Ok(AssetType {
        id: row.get(0)?,
        type_name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

const ASSET_COLUMNS: &str = "a.id, a.asset_code, a.asset_name, a.asset_type_id, a.brand, a.model,
    a.serial_number, a.purchase_date, a.purchase_price, a.location, a.notes, a.status,
    a.created_at, a.updated_at";

fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        id: row.get(0)?,
        asset_code: row.get(1)?,
        asset_name: row.get(2)?,
        asset_type_id: row.get(3)?,
        brand: row.get(4)?,
        model: row.get(5)?,
        serial_number: row.get(6)?,
        purchase_date: date_column(row, 7)?,
        purchase_price: row.get(8)?,
        location: row.get(9)?,
        notes: row.get(10)?,
        status: row.get(11)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?),
        updated_at: parse_datetime(&row.get::<_, String>(13)?),
    })
}

fn asset_view_select() -> String {
    format!(
        "SELECT {ASSET_COLUMNS}, t.type_name, e.full_name, e.employee_code,
                s.assigned_date, s.notes
         FROM assets a
         LEFT JOIN asset_types t ON t.id = a.asset_type_id
         LEFT JOIN assignments s ON s.asset_id = a.id AND s.status = 'active'
         LEFT JOIN employees e ON e.id = s.employee_id"
    )
}

fn asset_view_from_row(row: &Row<'_>) -> rusqlite::Result<AssetView> {
    Ok(AssetView {
        asset: asset_from_row(row)?,
        type_name: row.get(14)?,
        assigned_to_name: row.get(15)?,
        assigned_to_code: row.get(16)?,
        assigned_date: date_column(row, 17)?,
        assignment_notes: row.get(18)?,
    })
}

const EMPLOYEE_COLUMNS: &str =
    "id, employee_code, full_name, email, department, position, phone, created_at, updated_at";

fn employee_from_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        employee_code: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        department: row.get(4)?,
        position: row.get(5)?,
        phone: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const ASSIGNMENT_COLUMNS: &str = "s.id, s.asset_id, s.employee_id, s.assigned_date, s.return_date,
    s.assigned_by, s.notes, s.status, s.created_at, s.updated_at";

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        asset_id: row.get(1)?,
        employee_id: row.get(2)?,
        assigned_date: required_date_column(row, 3)?,
        return_date: date_column(row, 4)?,
        assigned_by: row.get(5)?,
        notes: row.get(6)?,
        status: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn assignment_view_select() -> String {
    format!(
        "SELECT {ASSIGNMENT_COLUMNS}, a.asset_code, a.asset_name, t.type_name,
                a.brand, a.model, a.serial_number,
                e.employee_code, e.full_name, e.department, e.position
         FROM assignments s
         JOIN assets a ON a.id = s.asset_id
         LEFT JOIN asset_types t ON t.id = a.asset_type_id
         JOIN employees e ON e.id = s.employee_id"
    )
}

const ASSIGNMENT_ORDER: &str = "ORDER BY s.assigned_date DESC, s.id DESC";

fn assignment_view_from_row(row: &Row<'_>) -> rusqlite::Result<AssignmentView> {
    let assignment = assignment_from_row(row)?;
    let usage_days = assignment.usage_days(today());
    Ok(AssignmentView {
        assignment,
        asset_code: row.get(10)?,
        asset_name: row.get(11)?,
        type_name: row.get(12)?,
        brand: row.get(13)?,
        model: row.get(14)?,
        serial_number: row.get(15)?,
        employee_code: row.get(16)?,
        employee_name: row.get(17)?,
        department: row.get(18)?,
        position: row.get(19)?,
        usage_days,
    })
}

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.role, u.employee_id,
    u.is_active, u.created_at, u.updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        employee_id: row.get(5)?,
        is_active: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn user_view_select() -> String {
    format!(
        "SELECT {USER_COLUMNS}, e.full_name, e.employee_code
         FROM users u
         LEFT JOIN employees e ON e.id = u.employee_id"
    )
}

fn grant_from_row(row: &Row<'_>) -> rusqlite::Result<PermissionGrant> {
    Ok(PermissionGrant {
        entity_type: row.get(0)?,
        can_view: row.get(1)?,
        can_edit: row.get(2)?,
        can_delete: row.get(3)?,
    })
}

fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<serde_json::Value>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .and_then(|s| serde_json::from_str(&s).ok()))
}

const ACTIVITY_SELECT: &str = "SELECT l.id, l.user_id, l.username, u.role, l.action_type,
        l.entity_type, l.entity_id, l.entity_name, l.old_values, l.new_values,
        l.description, l.ip_address, l.created_at
     FROM activity_logs l
     LEFT JOIN users u ON u.id = l.user_id";

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<ActivityLogEntry> {
    Ok(ActivityLogEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        user_role: row.get(3)?,
        action_type: row.get(4)?,
        entity_type: row.get(5)?,
        entity_id: row.get(6)?,
        entity_name: row.get(7)?,
        old_values: json_column(row, 8)?,
        new_values: json_column(row, 9)?,
        description: row.get(10)?,
        ip_address: row.get(11)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

// Connection-level helpers, shared by trait methods and transactions.
// None of these lock the mutex, so they may be called while it is held.

fn query_asset(conn: &Connection, id: i64) -> Result<Option<Asset>> {
    conn.query_row(
        &format!("SELECT {ASSET_COLUMNS} FROM assets a WHERE a.id = ?1"),
        params![id],
        asset_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn query_asset_view(conn: &Connection, id: i64) -> Result<Option<AssetView>> {
    conn.query_row(
        &format!("{} WHERE a.id = ?1", asset_view_select()),
        params![id],
        asset_view_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn query_employee(conn: &Connection, id: i64) -> Result<Option<Employee>> {
    conn.query_row(
        &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?1"),
        params![id],
        employee_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn query_assignment(conn: &Connection, id: i64) -> Result<Option<Assignment>> {
    conn.query_row(
        &format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments s WHERE s.id = ?1"),
        params![id],
        assignment_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn query_assignment_views(
    conn: &Connection,
    where_sql: &str,
    values: Vec<Value>,
) -> Result<Vec<AssignmentView>> {
    let sql = format!(
        "{} {} {}",
        assignment_view_select(),
        where_sql,
        ASSIGNMENT_ORDER
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), assignment_view_from_row)?;
    collect(rows)
}

fn asset_type_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM asset_types WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn active_assignment_count(conn: &Connection, column: &str, id: i64) -> Result<i64> {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM assignments WHERE {column} = ?1 AND status = 'active'"),
        params![id],
        |row| row.get(0),
    )
    .map_err(Error::from)
}

fn query_user(conn: &Connection, where_sql: &str, value: &dyn ToSql) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users u WHERE {where_sql}"),
        params![value],
        user_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn query_grants(conn: &Connection, user_id: i64) -> Result<Vec<PermissionGrant>> {
    let mut stmt = conn.prepare(
        "SELECT entity_type, can_view, can_edit, can_delete
         FROM user_permissions WHERE user_id = ?1 ORDER BY entity_type",
    )?;
    let rows = stmt.query_map(params![user_id], grant_from_row)?;
    collect(rows)
}

fn user_view_from_row(conn: &Connection, row: &Row<'_>) -> Result<UserView> {
    let user = user_from_row(row)?;
    let permissions = query_grants(conn, user.id)?;
    Ok(UserView {
        user,
        employee_name: row.get(9)?,
        employee_code: row.get(10)?,
        permissions,
    })
}

/// Natural-key check for assets, ignoring `exclude_id` on update.
fn ensure_asset_code_free(conn: &Connection, code: &str, exclude_id: Option<i64>) -> Result<()> {
    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM assets WHERE asset_code = ?1 AND id != ?2",
            params![code, exclude_id.unwrap_or(0)],
            |row| row.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(Error::conflict(format!("Asset code '{code}' already exists")));
    }
    Ok(())
}

fn ensure_employee_keys_free(
    conn: &Connection,
    draft: &EmployeeDraft,
    exclude_id: Option<i64>,
) -> Result<()> {
    let exclude = exclude_id.unwrap_or(0);
    let code_taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM employees WHERE employee_code = ?1 AND id != ?2",
            params![draft.employee_code, exclude],
            |row| row.get(0),
        )
        .optional()?;
    if code_taken.is_some() {
        return Err(Error::conflict(format!(
            "Employee code '{}' already exists",
            draft.employee_code
        )));
    }
    let email_taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM employees WHERE email = ?1 AND id != ?2",
            params![draft.email, exclude],
            |row| row.get(0),
        )
        .optional()?;
    if email_taken.is_some() {
        return Err(Error::conflict(format!(
            "Email '{}' already exists",
            draft.email
        )));
    }
    Ok(())
}

fn insert_asset(conn: &Connection, draft: &AssetDraft) -> Result<i64> {
    let now = format_datetime(&Utc::now());
    conn.execute(
        "INSERT INTO assets (asset_code, asset_name, asset_type_id, brand, model, serial_number,
                             purchase_date, purchase_price, location, notes, status,
                             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        params![
            draft.asset_code,
            draft.asset_name,
            draft.asset_type_id,
            draft.brand,
            draft.model,
            draft.serial_number,
            opt_date(&draft.purchase_date),
            draft.purchase_price,
            draft.location,
            draft.notes,
            draft.status,
            now,
        ],
    )
    .map_err(unique_as_conflict("Asset code already exists"))?;
    Ok(conn.last_insert_rowid())
}

fn write_asset(conn: &Connection, id: i64, draft: &AssetDraft) -> Result<()> {
    conn.execute(
        "UPDATE assets SET asset_code = ?1, asset_name = ?2, asset_type_id = ?3, brand = ?4,
                model = ?5, serial_number = ?6, purchase_date = ?7, purchase_price = ?8,
                location = ?9, notes = ?10, status = ?11, updated_at = ?12
         WHERE id = ?13",
        params![
            draft.asset_code,
            draft.asset_name,
            draft.asset_type_id,
            draft.brand,
            draft.model,
            draft.serial_number,
            opt_date(&draft.purchase_date),
            draft.purchase_price,
            draft.location,
            draft.notes,
            draft.status,
            format_datetime(&Utc::now()),
            id,
        ],
    )
    .map_err(unique_as_conflict("Asset code already exists"))?;
    Ok(())
}

fn insert_employee(conn: &Connection, draft: &EmployeeDraft) -> Result<i64> {
    let now = format_datetime(&Utc::now());
    conn.execute(
        "INSERT INTO employees (employee_code, full_name, email, department, position, phone,
                                created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            draft.employee_code,
            draft.full_name,
            draft.email,
            draft.department,
            draft.position,
            draft.phone,
            now,
        ],
    )
    .map_err(unique_as_conflict("Employee code or email already exists"))?;
    Ok(conn.last_insert_rowid())
}

fn write_employee(conn: &Connection, id: i64, draft: &EmployeeDraft) -> Result<()> {
    conn.execute(
        "UPDATE employees SET employee_code = ?1, full_name = ?2, email = ?3, department = ?4,
                position = ?5, phone = ?6, updated_at = ?7
         WHERE id = ?8",
        params![
            draft.employee_code,
            draft.full_name,
            draft.email,
            draft.department,
            draft.position,
            draft.phone,
            format_datetime(&Utc::now()),
            id,
        ],
    )
    .map_err(unique_as_conflict("Employee code or email already exists"))?;
    Ok(())
}

/// Looks up an asset type by name, creating it when missing.
/// Replaces every grant of `user_id` with `grants`.
fn write_grants(conn: &Connection, user_id: i64, grants: &[PermissionGrant]) -> Result<()> {
    conn.execute(
        "DELETE FROM user_permissions WHERE user_id = ?1",
        params![user_id],
    )?;
    for grant in grants {
        conn.execute(
            "INSERT INTO user_permissions (user_id, entity_type, can_view, can_edit, can_delete)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (user_id, entity_type) DO UPDATE SET
                can_view = excluded.can_view,
                can_edit = excluded.can_edit,
                can_delete = excluded.can_delete",
            params![
                user_id,
                grant.entity_type,
                grant.can_view,
                grant.can_edit,
                grant.can_delete,
            ],
        )?;
    }
    Ok(())
}

fn ensure_asset_type(conn: &Connection, type_name: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM asset_types WHERE type_name = ?1",
            params![type_name],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO asset_types (type_name, created_at) VALUES (?1, ?2)",
        params![type_name, format_datetime(&Utc::now())],
    )?;
    Ok(conn.last_insert_rowid())
}

fn import_asset_row(conn: &Connection, row: &AssetImportRow) -> Result<ImportAction> {
    let asset_type_id = match &row.type_name {
        Some(name) => Some(ensure_asset_type(conn, name)?),
        None => None,
    };

    let existing: Option<Asset> = conn
        .query_row(
            &format!("SELECT {ASSET_COLUMNS} FROM assets a WHERE a.asset_code = ?1"),
            params![row.asset_code],
            asset_from_row,
        )
        .optional()?;

    let held = match &existing {
        Some(asset) => active_assignment_count(conn, "asset_id", asset.id)? > 0,
        None => false,
    };
    if row.status == Some(AssetStatus::Assigned) && !held {
        return Err(Error::validation(format!(
            "Status '{}' requires an active assignment",
            AssetStatus::Assigned.label()
        )));
    }

    let status = match &existing {
        // The lifecycle owns the status of a held asset.
        Some(asset) if held => asset.status,
        Some(asset) => row.status.unwrap_or(asset.status),
        None => row.status.unwrap_or_default(),
    };

    let draft = AssetDraft {
        asset_code: row.asset_code.clone(),
        asset_name: row.asset_name.clone(),
        asset_type_id,
        brand: row.brand.clone(),
        model: row.model.clone(),
        serial_number: row.serial_number.clone(),
        purchase_date: row.purchase_date,
        purchase_price: row.purchase_price,
        location: row.location.clone(),
        notes: row.notes.clone(),
        status,
    };

    match existing {
        Some(asset) => {
            write_asset(conn, asset.id, &draft)?;
            Ok(ImportAction::Updated)
        }
        None => {
            insert_asset(conn, &draft)?;
            Ok(ImportAction::Created)
        }
    }
}

fn import_employee_row(conn: &Connection, draft: &EmployeeDraft) -> Result<ImportAction> {
    let mut stmt =
        conn.prepare("SELECT id FROM employees WHERE employee_code = ?1 OR email = ?2")?;
    let matches: Vec<i64> = collect(
        stmt.query_map(params![draft.employee_code, draft.email], |row| row.get(0))?,
    )?;

    match matches.as_slice() {
        [] => {
            insert_employee(conn, draft)?;
            Ok(ImportAction::Created)
        }
        [id] => {
            write_employee(conn, *id, draft)?;
            Ok(ImportAction::Updated)
        }
        _ => Err(Error::conflict(format!(
            "Employee code '{}' and email '{}' belong to different employees",
            draft.employee_code, draft.email
        ))),
    }
}

/// Joins filter conditions into a `WHERE` clause, or nothing.
fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

fn paged<T>(
    conn: &Connection,
    select: &str,
    count_select: &str,
    where_sql: &str,
    order: &str,
    values: Vec<Value>,
    page: Page,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<PageOf<T>> {
    let total: i64 = conn.query_row(
        &format!("{count_select} {where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let mut page_values = values;
    page_values.push(Value::Integer(page.limit()));
    page_values.push(Value::Integer(page.offset()));
    let n = page_values.len();

    let mut stmt = conn.prepare(&format!(
        "{select} {where_sql} {order} LIMIT ?{} OFFSET ?{}",
        n - 1,
        n
    ))?;
    let items = collect(stmt.query_map(params_from_iter(page_values), map)?)?;
    Ok(PageOf { items, total })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Asset type operations

    fn create_asset_type(&self, type_name: &str, description: Option<&str>) -> Result<AssetType> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO asset_types (type_name, description, created_at) VALUES (?1, ?2, ?3)",
            params![type_name, description, format_datetime(&Utc::now())],
        )
        .map_err(unique_as_conflict("Asset type name already exists"))?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {ASSET_TYPE_COLUMNS} FROM asset_types WHERE id = ?1"),
            params![id],
            asset_type_from_row,
        )
        .map_err(Error::from)
    }

    fn get_asset_type(&self, id: i64) -> Result<Option<AssetType>> {
        self.conn()
            .query_row(
                &format!("SELECT {ASSET_TYPE_COLUMNS} FROM asset_types WHERE id = ?1"),
                params![id],
                asset_type_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_asset_type_by_name(&self, type_name: &str) -> Result<Option<AssetType>> {
        self.conn()
            .query_row(
                &format!("SELECT {ASSET_TYPE_COLUMNS} FROM asset_types WHERE type_name = ?1"),
                params![type_name],
                asset_type_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_asset_types(&self) -> Result<Vec<AssetType>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ASSET_TYPE_COLUMNS} FROM asset_types ORDER BY type_name"
        ))?;
        let rows = stmt.query_map([], asset_type_from_row)?;
        collect(rows)
    }

    fn update_asset_type(
        &self,
        id: i64,
        type_name: &str,
        description: Option<&str>,
    ) -> Result<AssetType> {
        let conn = self.conn();
        let taken: Option<i64> = conn
            .query_row(
                "SELECT id FROM asset_types WHERE type_name = ?1 AND id != ?2",
                params![type_name, id],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(Error::conflict("Asset type name already exists"));
        }

        let rows = conn
            .execute(
                "UPDATE asset_types SET type_name = ?1, description = ?2 WHERE id = ?3",
                params![type_name, description, id],
            )
            .map_err(unique_as_conflict("Asset type name already exists"))?;
        if rows == 0 {
            return Err(Error::not_found("Asset type not found"));
        }

        conn.query_row(
            &format!("SELECT {ASSET_TYPE_COLUMNS} FROM asset_types WHERE id = ?1"),
            params![id],
            asset_type_from_row,
        )
        .map_err(Error::from)
    }

    fn delete_asset_type(&self, id: i64) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !asset_type_exists(&tx, id)? {
            return Err(Error::not_found("Asset type not found"));
        }
        let in_use: i64 = tx.query_row(
            "SELECT COUNT(*) FROM assets WHERE asset_type_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if in_use > 0 {
            return Err(Error::conflict(format!(
                "Asset type is used by {in_use} asset(s) and cannot be deleted"
            )));
        }

        tx.execute("DELETE FROM asset_types WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    // Asset operations

    fn create_asset(&self, draft: &AssetDraft) -> Result<Asset> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if draft.status == AssetStatus::Assigned {
            return Err(Error::validation(
                "A new asset cannot start as assigned; assign it instead",
            ));
        }
        if let Some(type_id) = draft.asset_type_id {
            if !asset_type_exists(&tx, type_id)? {
                return Err(Error::validation("Asset type does not exist"));
            }
        }
        ensure_asset_code_free(&tx, &draft.asset_code, None)?;

        let id = insert_asset(&tx, draft)?;
        let asset = query_asset(&tx, id)?
            .ok_or_else(|| Error::Internal("inserted asset vanished".to_string()))?;
        tx.commit()?;
        Ok(asset)
    }

    fn get_asset(&self, id: i64) -> Result<Option<Asset>> {
        query_asset(&self.conn(), id)
    }

    fn get_asset_view(&self, id: i64) -> Result<Option<AssetView>> {
        query_asset_view(&self.conn(), id)
    }

    fn get_asset_by_code(&self, asset_code: &str) -> Result<Option<Asset>> {
        self.conn()
            .query_row(
                &format!("SELECT {ASSET_COLUMNS} FROM assets a WHERE a.asset_code = ?1"),
                params![asset_code],
                asset_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_assets(&self, filter: &AssetFilter, page: Page) -> Result<PageOf<AssetView>> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            values.push(Value::Text(like_pattern(search)));
            let n = values.len();
            conditions.push(format!(
                "(a.asset_name LIKE ?{n} OR a.asset_code LIKE ?{n} OR a.serial_number LIKE ?{n})"
            ));
        }
        if let Some(status) = filter.status {
            values.push(Value::Text(status.as_str().to_string()));
            conditions.push(format!("a.status = ?{}", values.len()));
        }
        if let Some(type_id) = filter.asset_type_id {
            values.push(Value::Integer(type_id));
            conditions.push(format!("a.asset_type_id = ?{}", values.len()));
        }

        let conn = self.conn();
        paged(
            &conn,
            &asset_view_select(),
            "SELECT COUNT(*) FROM assets a",
            &where_clause(&conditions),
            "ORDER BY a.created_at DESC, a.id DESC",
            values,
            page,
            asset_view_from_row,
        )
    }

    fn list_all_assets(&self) -> Result<Vec<AssetView>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("{} ORDER BY a.asset_code", asset_view_select()))?;
        let rows = stmt.query_map([], asset_view_from_row)?;
        collect(rows)
    }

    fn update_asset(&self, id: i64, draft: &AssetDraft) -> Result<Asset> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let current = query_asset(&tx, id)?.ok_or_else(|| Error::not_found("Asset not found"))?;

        if draft.status != current.status {
            if draft.status == AssetStatus::Assigned {
                return Err(Error::validation(
                    "Status 'assigned' can only be set by assigning the asset",
                ));
            }
            if active_assignment_count(&tx, "asset_id", id)? > 0 {
                return Err(Error::conflict(
                    "Cannot change the status of an asset with an active assignment",
                ));
            }
        }
        if let Some(type_id) = draft.asset_type_id {
            if !asset_type_exists(&tx, type_id)? {
                return Err(Error::validation("Asset type does not exist"));
            }
        }
        ensure_asset_code_free(&tx, &draft.asset_code, Some(id))?;

        write_asset(&tx, id, draft)?;
        let asset = query_asset(&tx, id)?.ok_or_else(|| Error::not_found("Asset not found"))?;
        tx.commit()?;
        Ok(asset)
    }

    fn delete_asset(&self, id: i64) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if query_asset(&tx, id)?.is_none() {
            return Err(Error::not_found("Asset not found"));
        }
        if active_assignment_count(&tx, "asset_id", id)? > 0 {
            return Err(Error::conflict(
                "Cannot delete an asset that is currently assigned",
            ));
        }

        tx.execute("DELETE FROM assets WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    // Employee operations

    fn create_employee(&self, draft: &EmployeeDraft) -> Result<Employee> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        ensure_employee_keys_free(&tx, draft, None)?;
        let id = insert_employee(&tx, draft)?;
        let employee = query_employee(&tx, id)?
            .ok_or_else(|| Error::Internal("inserted employee vanished".to_string()))?;
        tx.commit()?;
        Ok(employee)
    }

    fn get_employee(&self, id: i64) -> Result<Option<Employee>> {
        query_employee(&self.conn(), id)
    }

    fn list_employees(&self, search: Option<&str>, page: Page) -> Result<PageOf<Employee>> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            values.push(Value::Text(like_pattern(search)));
            conditions.push(
                "(full_name LIKE ?1 OR employee_code LIKE ?1 OR email LIKE ?1)".to_string(),
            );
        }

        let conn = self.conn();
        paged(
            &conn,
            &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees"),
            "SELECT COUNT(*) FROM employees",
            &where_clause(&conditions),
            "ORDER BY created_at DESC, id DESC",
            values,
            page,
            employee_from_row,
        )
    }

    fn list_all_employees(&self) -> Result<Vec<Employee>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY employee_code"
        ))?;
        let rows = stmt.query_map([], employee_from_row)?;
        collect(rows)
    }

    fn update_employee(&self, id: i64, draft: &EmployeeDraft) -> Result<Employee> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if query_employee(&tx, id)?.is_none() {
            return Err(Error::not_found("Employee not found"));
        }
        ensure_employee_keys_free(&tx, draft, Some(id))?;
        write_employee(&tx, id, draft)?;

        let employee =
            query_employee(&tx, id)?.ok_or_else(|| Error::not_found("Employee not found"))?;
        tx.commit()?;
        Ok(employee)
    }

    fn delete_employee(&self, id: i64) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if query_employee(&tx, id)?.is_none() {
            return Err(Error::not_found("Employee not found"));
        }
        if active_assignment_count(&tx, "employee_id", id)? > 0 {
            return Err(Error::conflict(
                "Cannot delete an employee who still holds assigned assets",
            ));
        }

        tx.execute("DELETE FROM employees WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    // Assignment lifecycle

    fn assign_asset(&self, new: &NewAssignment) -> Result<Assignment> {
        let mut conn = self.conn();
        // IMMEDIATE takes the write lock up front, so a concurrent writer on
        // another connection cannot slip in between the checks and the insert.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let status: AssetStatus = tx
            .query_row(
                "SELECT status FROM assets WHERE id = ?1",
                params![new.asset_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Asset not found"))?;
        if status != AssetStatus::Available {
            return Err(Error::conflict("Asset is not available for assignment"));
        }
        if query_employee(&tx, new.employee_id)?.is_none() {
            return Err(Error::not_found("Employee not found"));
        }
        if active_assignment_count(&tx, "asset_id", new.asset_id)? > 0 {
            return Err(Error::conflict("Asset is already assigned"));
        }

        let now = format_datetime(&Utc::now());
        tx.execute(
            "INSERT INTO assignments (asset_id, employee_id, assigned_date, assigned_by, notes,
                                      status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6, ?6)",
            params![
                new.asset_id,
                new.employee_id,
                format_date(&new.assigned_date),
                new.assigned_by,
                new.notes,
                now,
            ],
        )
        .map_err(unique_as_conflict("Asset is already assigned"))?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE assets SET status = 'assigned', updated_at = ?1 WHERE id = ?2",
            params![now, new.asset_id],
        )?;

        let assignment = query_assignment(&tx, id)?
            .ok_or_else(|| Error::Internal("inserted assignment vanished".to_string()))?;
        tx.commit()?;
        Ok(assignment)
    }

    fn return_assignment(
        &self,
        id: i64,
        return_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<Assignment> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = query_assignment(&tx, id)?
            .filter(|a| a.status == AssignmentStatus::Active)
            .ok_or_else(|| Error::not_found("No active assignment found"))?;

        let now = format_datetime(&Utc::now());
        tx.execute(
            "UPDATE assignments
             SET return_date = ?1, status = 'returned', notes = COALESCE(?2, notes),
                 updated_at = ?3
             WHERE id = ?4",
            params![format_date(&return_date), notes, now, id],
        )?;
        tx.execute(
            "UPDATE assets SET status = 'available', updated_at = ?1 WHERE id = ?2",
            params![now, current.asset_id],
        )?;

        let assignment = query_assignment(&tx, id)?
            .ok_or_else(|| Error::not_found("No active assignment found"))?;
        tx.commit()?;
        Ok(assignment)
    }

    fn get_assignment(&self, id: i64) -> Result<Option<AssignmentView>> {
        self.conn()
            .query_row(
                &format!("{} WHERE s.id = ?1", assignment_view_select()),
                params![id],
                assignment_view_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_assignments(
        &self,
        filter: &AssignmentFilter,
        page: Page,
    ) -> Result<PageOf<AssignmentView>> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(status) = filter.status {
            values.push(Value::Text(status.as_str().to_string()));
            conditions.push(format!("s.status = ?{}", values.len()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            values.push(Value::Text(like_pattern(search)));
            let n = values.len();
            conditions.push(format!(
                "(a.asset_name LIKE ?{n} OR a.asset_code LIKE ?{n} OR e.full_name LIKE ?{n})"
            ));
        }

        let conn = self.conn();
        paged(
            &conn,
            &assignment_view_select(),
            "SELECT COUNT(*) FROM assignments s
             JOIN assets a ON a.id = s.asset_id
             JOIN employees e ON e.id = s.employee_id",
            &where_clause(&conditions),
            ASSIGNMENT_ORDER,
            values,
            page,
            assignment_view_from_row,
        )
    }

    fn list_all_assignments(&self) -> Result<Vec<AssignmentView>> {
        query_assignment_views(&self.conn(), "", Vec::new())
    }

    fn list_asset_assignments(&self, asset_id: i64) -> Result<Vec<AssignmentView>> {
        query_assignment_views(
            &self.conn(),
            "WHERE s.asset_id = ?1",
            vec![Value::Integer(asset_id)],
        )
    }

    fn list_employee_assignments(
        &self,
        employee_id: i64,
        active_only: bool,
    ) -> Result<Vec<AssignmentView>> {
        let where_sql = if active_only {
            "WHERE s.employee_id = ?1 AND s.status = 'active'"
        } else {
            "WHERE s.employee_id = ?1"
        };
        query_assignment_views(&self.conn(), where_sql, vec![Value::Integer(employee_id)])
    }

    fn current_assignment(&self, asset_id: i64) -> Result<Option<AssignmentView>> {
        let views = query_assignment_views(
            &self.conn(),
            "WHERE s.asset_id = ?1 AND s.status = 'active'",
            vec![Value::Integer(asset_id)],
        )?;
        Ok(views.into_iter().next())
    }

    // User operations

    fn create_user(&self, user: &NewUser, grants: &[PermissionGrant]) -> Result<User> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        if query_user(&tx, "u.username = ?1", &user.username)?.is_some() {
            return Err(Error::conflict("Username already exists"));
        }
        if query_user(&tx, "u.email = ?1", &user.email)?.is_some() {
            return Err(Error::conflict("Email already exists"));
        }

        let now = format_datetime(&Utc::now());
        tx.execute(
            "INSERT INTO users (username, email, password_hash, role, employee_id, is_active,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                user.username,
                user.email,
                user.password_hash,
                user.role,
                user.employee_id,
                user.is_active,
                now,
            ],
        )
        .map_err(unique_as_conflict("Username or email already exists"))?;

        let id = tx.last_insert_rowid();
        write_grants(&tx, id, grants)?;
        let created = query_user(&tx, "u.id = ?1", &id)?
            .ok_or_else(|| Error::Internal("inserted user vanished".to_string()))?;
        tx.commit()?;
        Ok(created)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        query_user(&self.conn(), "u.id = ?1", &id)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        query_user(&self.conn(), "u.username = ?1", &username)
    }

    fn get_user_view(&self, id: i64) -> Result<Option<UserView>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("{} WHERE u.id = ?1", user_view_select()))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(user_view_from_row(&conn, row)?)),
            None => Ok(None),
        }
    }

    fn list_users(&self, search: Option<&str>, page: Page) -> Result<PageOf<UserView>> {
        let conn = self.conn();

        let (where_sql, mut values) = match search.filter(|s| !s.trim().is_empty()) {
            Some(search) => (
                "WHERE (u.username LIKE ?1 OR u.email LIKE ?1)",
                vec![Value::Text(like_pattern(search))],
            ),
            None => ("", Vec::new()),
        };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM users u {where_sql}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Integer(page.limit()));
        values.push(Value::Integer(page.offset()));
        let n = values.len();
        let mut stmt = conn.prepare(&format!(
            "{} {where_sql} ORDER BY u.created_at DESC, u.id DESC LIMIT ?{} OFFSET ?{}",
            user_view_select(),
            n - 1,
            n
        ))?;
        let mut rows = stmt.query(params_from_iter(values))?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(user_view_from_row(&conn, row)?);
        }
        Ok(PageOf { items, total })
    }

    fn update_user(&self, user: &User, grants: Option<&[PermissionGrant]>) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let taken: Option<i64> = tx
            .query_row(
                "SELECT id FROM users WHERE email = ?1 AND id != ?2",
                params![user.email, user.id],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(Error::conflict("Email already exists"));
        }

        let rows = tx
            .execute(
                "UPDATE users SET email = ?1, password_hash = ?2, role = ?3, employee_id = ?4,
                        is_active = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    user.email,
                    user.password_hash,
                    user.role,
                    user.employee_id,
                    user.is_active,
                    format_datetime(&Utc::now()),
                    user.id,
                ],
            )
            .map_err(unique_as_conflict("Email already exists"))?;

        if rows == 0 {
            return Err(Error::not_found("User not found"));
        }
        if let Some(grants) = grants {
            write_grants(&tx, user.id, grants)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_user(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn has_admin_user(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Permission grant operations

    fn get_permission_grant(
        &self,
        user_id: i64,
        entity_type: EntityType,
    ) -> Result<Option<PermissionGrant>> {
        self.conn()
            .query_row(
                "SELECT entity_type, can_view, can_edit, can_delete
                 FROM user_permissions WHERE user_id = ?1 AND entity_type = ?2",
                params![user_id, entity_type],
                grant_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_permission_grants(&self, user_id: i64) -> Result<Vec<PermissionGrant>> {
        query_grants(&self.conn(), user_id)
    }

    fn replace_permission_grants(&self, user_id: i64, grants: &[PermissionGrant]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        write_grants(&tx, user_id, grants)?;
        tx.commit()?;
        Ok(())
    }

    // Activity log operations

    fn create_activity_log(&self, entry: &NewActivityLog) -> Result<()> {
        let old_values = entry.old_values.as_ref().map(|v| v.to_string());
        let new_values = entry.new_values.as_ref().map(|v| v.to_string());
        self.conn().execute(
            "INSERT INTO activity_logs (user_id, username, action_type, entity_type, entity_id,
                                        entity_name, old_values, new_values, description,
                                        ip_address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.user_id,
                entry.username,
                entry.action_type,
                entry.entity_type,
                entry.entity_id,
                entry.entity_name,
                old_values,
                new_values,
                entry.description,
                entry.ip_address,
                format_datetime(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn list_activity_logs(
        &self,
        filter: &ActivityFilter,
        page: Page,
    ) -> Result<PageOf<ActivityLogEntry>> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(action) = filter.action_type {
            values.push(Value::Text(action.as_str().to_string()));
            conditions.push(format!("l.action_type = ?{}", values.len()));
        }
        if let Some(entity) = filter.entity_type {
            values.push(Value::Text(entity.as_str().to_string()));
            conditions.push(format!("l.entity_type = ?{}", values.len()));
        }
        if let Some(username) = filter.username.as_deref().filter(|s| !s.trim().is_empty()) {
            values.push(Value::Text(like_pattern(username)));
            conditions.push(format!("l.username LIKE ?{}", values.len()));
        }

        let conn = self.conn();
        paged(
            &conn,
            ACTIVITY_SELECT,
            "SELECT COUNT(*) FROM activity_logs l",
            &where_clause(&conditions),
            "ORDER BY l.created_at DESC, l.id DESC",
            values,
            page,
            activity_from_row,
        )
    }

    fn list_entity_activity_logs(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<Vec<ActivityLogEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{ACTIVITY_SELECT} WHERE l.entity_type = ?1 AND l.entity_id = ?2
             ORDER BY l.created_at DESC, l.id DESC"
        ))?;
        let rows = stmt.query_map(params![entity_type, entity_id], activity_from_row)?;
        collect(rows)
    }

    fn list_user_activity_logs(&self, user_id: i64) -> Result<Vec<ActivityLogEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{ACTIVITY_SELECT} WHERE l.user_id = ?1 ORDER BY l.created_at DESC, l.id DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], activity_from_row)?;
        collect(rows)
    }

    fn list_assignments_logged_by(&self, user_id: i64) -> Result<Vec<AssignmentView>> {
        query_assignment_views(
            &self.conn(),
            "WHERE s.id IN (
                SELECT entity_id FROM activity_logs
                WHERE user_id = ?1 AND action_type = 'assign' AND entity_type = 'assignment'
                  AND entity_id IS NOT NULL)",
            vec![Value::Integer(user_id)],
        )
    }

    // Bulk import

    fn import_assets(&self, rows: &[AssetImportRow]) -> Result<ImportReport> {
        let mut conn = self.conn();
        let mut tx = conn.transaction()?;
        let mut report = ImportReport::default();

        for row in rows {
            let sp = tx.savepoint()?;
            match import_asset_row(&sp, row) {
                Ok(action) => {
                    sp.commit()?;
                    report.success.push(ImportedRow {
                        row: row.row,
                        code: row.asset_code.clone(),
                        action,
                    });
                }
                // Dropping the savepoint rolls back this row only.
                Err(e) if e.is_business_rule() => report.reject(row.row, e.to_string()),
                Err(e) => return Err(e),
            }
        }

        tx.commit()?;
        Ok(report)
    }

    fn import_employees(&self, rows: &[EmployeeImportRow]) -> Result<ImportReport> {
        let mut conn = self.conn();
        let mut tx = conn.transaction()?;
        let mut report = ImportReport::default();

        for row in rows {
            let sp = tx.savepoint()?;
            match import_employee_row(&sp, &row.employee) {
                Ok(action) => {
                    sp.commit()?;
                    report.success.push(ImportedRow {
                        row: row.row,
                        code: row.employee.employee_code.clone(),
                        action,
                    });
                }
                Err(e) if e.is_business_rule() => report.reject(row.row, e.to_string()),
                Err(e) => return Err(e),
            }
        }

        tx.commit()?;
        Ok(report)
    }
}
