use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Role, User};

/// Kinds of records that grants and audit entries refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Asset,
    Employee,
    Assignment,
    AssetType,
    User,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::Asset,
        EntityType::Employee,
        EntityType::Assignment,
        EntityType::AssetType,
        EntityType::User,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityType::Asset => "asset",
            EntityType::Employee => "employee",
            EntityType::Assignment => "assignment",
            EntityType::AssetType => "asset_type",
            EntityType::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<EntityType> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }

    /// Localized noun used in activity descriptions.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            EntityType::Asset => "tài sản",
            EntityType::Employee => "nhân viên",
            EntityType::Assignment => "bàn giao tài sản",
            EntityType::AssetType => "loại tài sản",
            EntityType::User => "người dùng",
        }
    }

    /// Localized column value used in spreadsheet exports.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            EntityType::Asset => "Tài sản",
            EntityType::Employee => "Nhân viên",
            EntityType::Assignment => "Bàn giao",
            EntityType::AssetType => "Loại tài sản",
            EntityType::User => "Người dùng",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    View,
    Edit,
    Delete,
    Create,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::View => "view",
            Operation::Edit => "edit",
            Operation::Delete => "delete",
            Operation::Create => "create",
        }
    }
}

/// A stored per-user, per-entity-type grant. There is no create flag:
/// creating records is reserved to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub entity_type: EntityType,
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl PermissionGrant {
    /// The stored flag for `op`; there is never one for create.
    #[must_use]
    pub const fn permits(&self, op: Operation) -> bool {
        match op {
            Operation::View => self.can_view,
            Operation::Edit => self.can_edit,
            Operation::Delete => self.can_delete,
            Operation::Create => false,
        }
    }
}

/// Decides whether a user may perform `op` given the grant stored for the
/// entity type in question (if any).
///
/// Admins may do everything. Everyone else needs a grant row carrying the
/// matching flag, and can never create.
#[must_use]
pub fn allowed(user: &User, grant: Option<&PermissionGrant>, op: Operation) -> bool {
    if user.role == Role::Admin {
        return true;
    }
    grant.is_some_and(|g| g.permits(op))
}
