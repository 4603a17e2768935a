use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityType, PermissionGrant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    #[default]
    Available,
    Assigned,
    Maintenance,
    Retired,
}

impl AssetStatus {
    pub const ALL: [AssetStatus; 4] = [
        AssetStatus::Available,
        AssetStatus::Assigned,
        AssetStatus::Maintenance,
        AssetStatus::Retired,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AssetStatus::Available => "available",
            AssetStatus::Assigned => "assigned",
            AssetStatus::Maintenance => "maintenance",
            AssetStatus::Retired => "retired",
        }
    }

    pub fn parse(s: &str) -> Option<AssetStatus> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }

    /// Human-readable label used in spreadsheets.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            AssetStatus::Available => "Khả dụng",
            AssetStatus::Assigned => "Đã bàn giao",
            AssetStatus::Maintenance => "Bảo trì",
            AssetStatus::Retired => "Ngừng sử dụng",
        }
    }

    pub fn from_label(label: &str) -> Option<AssetStatus> {
        Self::ALL.into_iter().find(|v| v.label() == label)
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Active,
    Returned,
}

impl AssignmentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Returned => "returned",
        }
    }

    pub fn parse(s: &str) -> Option<AssignmentStatus> {
        match s {
            "active" => Some(AssignmentStatus::Active),
            "returned" => Some(AssignmentStatus::Returned),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            AssignmentStatus::Active => "Đang sử dụng",
            AssignmentStatus::Returned => "Đã trả",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    Assign,
    Return,
    Import,
}

impl ActionType {
    pub const ALL: [ActionType; 6] = [
        ActionType::Create,
        ActionType::Update,
        ActionType::Delete,
        ActionType::Assign,
        ActionType::Return,
        ActionType::Import,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ActionType::Create => "create",
            ActionType::Update => "update",
            ActionType::Delete => "delete",
            ActionType::Assign => "assign",
            ActionType::Return => "return",
            ActionType::Import => "import",
        }
    }

    pub fn parse(s: &str) -> Option<ActionType> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ActionType::Create => "Tạo mới",
            ActionType::Update => "Cập nhật",
            ActionType::Delete => "Xóa",
            ActionType::Assign => "Bàn giao",
            ActionType::Return => "Trả lại",
            ActionType::Import => "Nhập dữ liệu",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetType {
    pub id: i64,
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub asset_code: String,
    pub asset_name: String,
    pub asset_type_id: Option<i64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: AssetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The editable fields of an asset, shared by create, update and import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetDraft {
    pub asset_code: String,
    pub asset_name: String,
    pub asset_type_id: Option<i64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: AssetStatus,
}

/// An asset joined with its type name and current holder.
#[derive(Debug, Clone, Serialize)]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: Asset,
    pub type_name: Option<String>,
    pub assigned_to_name: Option<String>,
    pub assigned_to_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub employee_code: String,
    pub full_name: String,
    pub email: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeDraft {
    pub employee_code: String,
    pub full_name: String,
    pub email: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub asset_id: i64,
    pub employee_id: i64,
    pub assigned_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub assigned_by: Option<String>,
    pub notes: Option<String>,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    /// Days the asset has been (or was) held: up to the return date once
    /// returned, otherwise up to `today`.
    #[must_use]
    pub fn usage_days(&self, today: NaiveDate) -> i64 {
        let end = self.return_date.unwrap_or(today);
        (end - self.assigned_date).num_days()
    }
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub asset_id: i64,
    pub employee_id: i64,
    pub assigned_date: NaiveDate,
    pub assigned_by: Option<String>,
    pub notes: Option<String>,
}

/// An assignment joined with the asset and employee it binds.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub asset_code: String,
    pub asset_name: String,
    pub type_name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub employee_code: String,
    pub employee_name: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub usage_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub employee_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub employee_id: Option<i64>,
    pub is_active: bool,
}

/// A user with the linked employee's identity and the stored grants.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub employee_name: Option<String>,
    pub employee_code: Option<String>,
    pub permissions: Vec<PermissionGrant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub user_role: Option<Role>,
    pub action_type: ActionType,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub entity_name: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An audit entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub action_type: ActionType,
    pub entity_type: EntityType,
    pub entity_id: Option<i64>,
    pub entity_name: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
}

/// A spreadsheet row decoded into asset fields. `row` is the 1-based sheet
/// row number used in error reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetImportRow {
    pub row: usize,
    pub asset_code: String,
    pub asset_name: String,
    pub type_name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<AssetStatus>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeImportRow {
    pub row: usize,
    pub employee: EmployeeDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedRow {
    pub row: usize,
    pub code: String,
    pub action: ImportAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// Outcome of one imported file: rows written and rows rejected.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub success: Vec<ImportedRow>,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn reject(&mut self, row: usize, message: impl Into<String>) {
        self.errors.push(RowError {
            row,
            message: message.into(),
        });
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    #[must_use]
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            per_page: per_page.filter(|p| *p > 0).unwrap_or(default_per_page),
        }
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// One page of rows plus the total row count across all pages.
#[derive(Debug, Clone)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub total: i64,
}
