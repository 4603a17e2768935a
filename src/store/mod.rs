mod schema;
mod sqlite;

pub use schema::DEFAULT_ASSET_TYPES;
pub use sqlite::SqliteStore;

use chrono::NaiveDate;

use crate::error::Result;
use crate::types::*;

/// Filters accepted by the asset listing.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    /// Case-insensitive substring of name, code or serial number.
    pub search: Option<String>,
    pub status: Option<AssetStatus>,
    pub asset_type_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    /// Case-insensitive substring of asset name, asset code or employee name.
    pub search: Option<String>,
    pub status: Option<AssignmentStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub action_type: Option<ActionType>,
    pub entity_type: Option<EntityType>,
    /// Case-insensitive substring of the actor's username.
    pub username: Option<String>,
}

/// Store defines the database interface.
///
/// Natural-key uniqueness and the cross-entity deletion guards are enforced
/// here, so every caller (HTTP handlers and bulk import alike) gets the same
/// rules. Violations come back as `Error::Conflict`.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Asset type operations
    fn create_asset_type(&self, type_name: &str, description: Option<&str>) -> Result<AssetType>;
    fn get_asset_type(&self, id: i64) -> Result<Option<AssetType>>;
    fn get_asset_type_by_name(&self, type_name: &str) -> Result<Option<AssetType>>;
    fn list_asset_types(&self) -> Result<Vec<AssetType>>;
    fn update_asset_type(
        &self,
        id: i64,
        type_name: &str,
        description: Option<&str>,
    ) -> Result<AssetType>;
    fn delete_asset_type(&self, id: i64) -> Result<()>;

    // Asset operations
    fn create_asset(&self, draft: &AssetDraft) -> Result<Asset>;
    fn get_asset(&self, id: i64) -> Result<Option<Asset>>;
    fn get_asset_view(&self, id: i64) -> Result<Option<AssetView>>;
    fn get_asset_by_code(&self, asset_code: &str) -> Result<Option<Asset>>;
    fn list_assets(&self, filter: &AssetFilter, page: Page) -> Result<PageOf<AssetView>>;
    fn list_all_assets(&self) -> Result<Vec<AssetView>>;
    fn update_asset(&self, id: i64, draft: &AssetDraft) -> Result<Asset>;
    fn delete_asset(&self, id: i64) -> Result<()>;

    // Employee operations
    fn create_employee(&self, draft: &EmployeeDraft) -> Result<Employee>;
    fn get_employee(&self, id: i64) -> Result<Option<Employee>>;
    fn list_employees(&self, search: Option<&str>, page: Page) -> Result<PageOf<Employee>>;
    fn list_all_employees(&self) -> Result<Vec<Employee>>;
    fn update_employee(&self, id: i64, draft: &EmployeeDraft) -> Result<Employee>;
    fn delete_employee(&self, id: i64) -> Result<()>;

    // Assignment lifecycle
    fn assign_asset(&self, assignment: &NewAssignment) -> Result<Assignment>;
    fn return_assignment(
        &self,
        id: i64,
        return_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<Assignment>;
    fn get_assignment(&self, id: i64) -> Result<Option<AssignmentView>>;
    fn list_assignments(
        &self,
        filter: &AssignmentFilter,
        page: Page,
    ) -> Result<PageOf<AssignmentView>>;
    fn list_all_assignments(&self) -> Result<Vec<AssignmentView>>;
    fn list_asset_assignments(&self, asset_id: i64) -> Result<Vec<AssignmentView>>;
    fn list_employee_assignments(
        &self,
        employee_id: i64,
        active_only: bool,
    ) -> Result<Vec<AssignmentView>>;
    fn current_assignment(&self, asset_id: i64) -> Result<Option<AssignmentView>>;

    // User operations
    /// Inserts the user and its grants in one transaction.
    fn create_user(&self, user: &NewUser, grants: &[PermissionGrant]) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn get_user_view(&self, id: i64) -> Result<Option<UserView>>;
    fn list_users(&self, search: Option<&str>, page: Page) -> Result<PageOf<UserView>>;
    /// Writes the profile and, when given, replaces the grants in the same
    /// transaction.
    fn update_user(&self, user: &User, grants: Option<&[PermissionGrant]>) -> Result<()>;
    fn delete_user(&self, id: i64) -> Result<bool>;
    fn has_admin_user(&self) -> Result<bool>;

    // Permission grant operations
    fn get_permission_grant(
        &self,
        user_id: i64,
        entity_type: EntityType,
    ) -> Result<Option<PermissionGrant>>;
    fn list_permission_grants(&self, user_id: i64) -> Result<Vec<PermissionGrant>>;
    fn replace_permission_grants(&self, user_id: i64, grants: &[PermissionGrant]) -> Result<()>;

    // Activity log operations (append-only)
    fn create_activity_log(&self, entry: &NewActivityLog) -> Result<()>;
    fn list_activity_logs(
        &self,
        filter: &ActivityFilter,
        page: Page,
    ) -> Result<PageOf<ActivityLogEntry>>;
    fn list_entity_activity_logs(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<Vec<ActivityLogEntry>>;
    fn list_user_activity_logs(&self, user_id: i64) -> Result<Vec<ActivityLogEntry>>;
    /// Assignments whose creation was logged against `user_id`.
    fn list_assignments_logged_by(&self, user_id: i64) -> Result<Vec<AssignmentView>>;

    // Bulk import: one transaction per call, per-row failures collected
    fn import_assets(&self, rows: &[AssetImportRow]) -> Result<ImportReport>;
    fn import_employees(&self, rows: &[EmployeeImportRow]) -> Result<ImportReport>;
}
