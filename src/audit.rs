//! Audit recorder.
//!
//! Appends an activity log entry for every successful mutation. Recording is
//! best effort: a failed write is logged and dropped, never surfaced to the
//! operation being recorded.

use std::sync::Arc;

use serde::Serialize;

use crate::store::Store;
use crate::types::{ActionType, EntityType, NewActivityLog, User};

/// Builder for one activity log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    action: ActionType,
    entity_type: EntityType,
    entity_id: Option<i64>,
    entity_name: Option<String>,
    old_values: Option<serde_json::Value>,
    new_values: Option<serde_json::Value>,
    description: Option<String>,
}

impl AuditEntry {
    pub fn new(action: ActionType, entity_type: EntityType) -> Self {
        Self {
            action,
            entity_type,
            entity_id: None,
            entity_name: None,
            old_values: None,
            new_values: None,
            description: None,
        }
    }

    pub fn entity(mut self, id: i64, name: impl Into<String>) -> Self {
        self.entity_id = Some(id);
        self.entity_name = Some(name.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = Some(name.into());
        self
    }

    pub fn old_values<T: Serialize>(mut self, values: &T) -> Self {
        self.old_values = snapshot(values);
        self
    }

    pub fn new_values<T: Serialize>(mut self, values: &T) -> Self {
        self.new_values = snapshot(values);
        self
    }

    /// Overrides the generated description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

fn snapshot<T: Serialize>(values: &T) -> Option<serde_json::Value> {
    serde_json::to_value(values)
        .map_err(|e| tracing::warn!("Failed to snapshot audit values: {e}"))
        .ok()
}

/// Builds the human-readable summary stored with each entry, e.g.
/// `"Tạo mới tài sản: PC001"`.
#[must_use]
pub fn describe(action: ActionType, entity_type: EntityType, entity_name: Option<&str>) -> String {
    let summary = format!("{} {}", action.label(), entity_type.label());
    match entity_name {
        Some(name) if !name.is_empty() => format!("{summary}: {name}"),
        _ => summary,
    }
}

pub struct AuditRecorder {
    store: Arc<dyn Store>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Appends an entry attributed to `actor`. Never fails.
    pub fn record(&self, actor: &User, source: Option<&str>, entry: AuditEntry) {
        let description = entry.description.unwrap_or_else(|| {
            describe(entry.action, entry.entity_type, entry.entity_name.as_deref())
        });

        let log = NewActivityLog {
            user_id: Some(actor.id),
            username: Some(actor.username.clone()),
            action_type: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            entity_name: entry.entity_name,
            old_values: entry.old_values,
            new_values: entry.new_values,
            description: Some(description),
            ip_address: source.map(str::to_string),
        };

        if let Err(e) = self.store.create_activity_log(&log) {
            tracing::error!(
                action = log.action_type.as_str(),
                entity_type = log.entity_type.as_str(),
                entity_id = ?log.entity_id,
                "Failed to record activity: {e}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::Role;

    fn actor() -> User {
        let now = Utc::now();
        User {
            id: 1,
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: String::new(),
            role: Role::Admin,
            employee_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_describe_with_and_without_name() {
        assert_eq!(
            describe(ActionType::Create, EntityType::Asset, Some("PC001")),
            "Tạo mới tài sản: PC001"
        );
        assert_eq!(
            describe(ActionType::Return, EntityType::Assignment, None),
            "Trả lại bàn giao tài sản"
        );
        assert_eq!(
            describe(ActionType::Delete, EntityType::Employee, Some("")),
            "Xóa nhân viên"
        );
    }

    #[test]
    fn test_record_writes_entry() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(temp.path().join("test.db")).unwrap());
        store.initialize().unwrap();
        let recorder = AuditRecorder::new(store.clone());

        recorder.record(
            &actor(),
            Some("127.0.0.1"),
            AuditEntry::new(ActionType::Update, EntityType::Employee)
                .entity(3, "E001")
                .old_values(&serde_json::json!({"full_name": "A"}))
                .new_values(&serde_json::json!({"full_name": "B"})),
        );

        let logs = store
            .list_entity_activity_logs(EntityType::Employee, 3)
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].description.as_deref(), Some("Cập nhật nhân viên: E001"));
        assert_eq!(logs[0].ip_address.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_record_swallows_storage_failure() {
        let temp = TempDir::new().unwrap();
        // Never initialized: the activity table does not exist.
        let store = Arc::new(SqliteStore::new(temp.path().join("test.db")).unwrap());
        let recorder = AuditRecorder::new(store);

        recorder.record(
            &actor(),
            None,
            AuditEntry::new(ActionType::Delete, EntityType::Asset).entity(1, "PC001"),
        );
    }
}
