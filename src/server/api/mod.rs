pub mod access;
mod activity;
mod asset_types;
mod assets;
mod assignments;
mod auth;
mod employees;
mod transfer;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

use crate::server::AppState;
use crate::transfer::MAX_IMPORT_BYTES;

// Room for the multipart framing around a maximum-size file.
const UPLOAD_OVERHEAD: usize = 64 * 1024;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Session
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        // Users (admin only)
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", put(users::update_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/permissions", put(users::set_permissions))
        // Assets
        .route("/assets", get(assets::list_assets))
        .route("/assets", post(assets::create_asset))
        .route("/assets/{id}", get(assets::get_asset))
        .route("/assets/{id}", put(assets::update_asset))
        .route("/assets/{id}", delete(assets::delete_asset))
        .route("/assets/{id}/usage-history", get(assets::usage_history))
        .route("/assets/{id}/assignments", get(assets::asset_assignments))
        .route("/assets/{id}/current", get(assets::current_assignment))
        // Employees
        .route("/employees", get(employees::list_employees))
        .route("/employees", post(employees::create_employee))
        .route("/employees/{id}", get(employees::get_employee))
        .route("/employees/{id}", put(employees::update_employee))
        .route("/employees/{id}", delete(employees::delete_employee))
        .route("/employees/{id}/assets", get(employees::employee_assets))
        .route(
            "/employees/{id}/assignments",
            get(employees::employee_assignments),
        )
        // Asset types
        .route("/asset-types", get(asset_types::list_asset_types))
        .route("/asset-types", post(asset_types::create_asset_type))
        .route("/asset-types/{id}", get(asset_types::get_asset_type))
        .route("/asset-types/{id}", put(asset_types::update_asset_type))
        .route("/asset-types/{id}", delete(asset_types::delete_asset_type))
        // Assignment lifecycle
        .route("/assignments", get(assignments::list_assignments))
        .route("/assignments", post(assignments::assign_asset))
        .route("/assignments/{id}", get(assignments::get_assignment))
        .route("/assignments/{id}/return", put(assignments::return_asset))
        .route(
            "/assignments/employee/{employee_id}",
            get(assignments::employee_assignments),
        )
        // Activity log (admin only)
        .route("/activity-logs", get(activity::list_activity_logs))
        .route(
            "/activity-logs/entity/{entity_type}/{entity_id}",
            get(activity::entity_activity_logs),
        )
        // Bulk transfer
        .route("/export/all", get(transfer::export_all))
        .route("/export/user/{id}", get(transfer::export_user))
        .route(
            "/import/assets",
            post(transfer::import_assets)
                .layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES + UPLOAD_OVERHEAD)),
        )
        .route(
            "/import/employees",
            post(transfer::import_employees)
                .layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES + UPLOAD_OVERHEAD)),
        )
}
