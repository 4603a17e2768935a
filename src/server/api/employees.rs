use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use super::access::require_permission;
use crate::audit::AuditEntry;
use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{EmployeeRequest, ListParams};
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt,
};
use crate::server::validation::{optional, required, validate_code, validate_email};
use crate::types::{ActionType, EmployeeDraft, EntityType, Operation, Page};

fn draft_from(req: EmployeeRequest) -> Result<EmployeeDraft, ApiError> {
    Ok(EmployeeDraft {
        employee_code: validate_code(&req.employee_code, "Employee code")?,
        full_name: required(&req.full_name, "Full name")?,
        email: validate_email(&req.email)?,
        department: optional(req.department),
        position: optional(req.position),
        phone: optional(req.phone),
    })
}

pub async fn list_employees(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Employee, Operation::View)?;

    let page = Page::new(params.page, params.limit, DEFAULT_PAGE_SIZE);
    let search = optional(params.search);
    let employees = store.list_employees(search.as_deref(), page)?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        employees, page,
    ))))
}

pub async fn get_employee(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Employee, Operation::View)?;

    let employee = store.get_employee(id)?.or_not_found("Employee not found")?;
    Ok(Json(ApiResponse::success(employee)))
}

pub async fn create_employee(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<EmployeeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Employee, Operation::Create)?;

    let employee = store.create_employee(&draft_from(req)?)?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Create, EntityType::Employee)
            .entity(employee.id, &employee.full_name)
            .new_values(&employee),
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(employee))))
}

pub async fn update_employee(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<EmployeeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Employee, Operation::Edit)?;

    let before = store.get_employee(id)?.or_not_found("Employee not found")?;
    let after = store.update_employee(id, &draft_from(req)?)?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Update, EntityType::Employee)
            .entity(id, &after.full_name)
            .old_values(&before)
            .new_values(&after),
    );

    Ok(Json(ApiResponse::success(after)))
}

pub async fn delete_employee(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Employee, Operation::Delete)?;

    let before = store.get_employee(id)?.or_not_found("Employee not found")?;
    store.delete_employee(id)?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Delete, EntityType::Employee)
            .entity(id, &before.full_name)
            .old_values(&before),
    );

    Ok(Json(ApiResponse::message("Employee deleted")))
}

/// Assets the employee currently holds, newest first.
pub async fn employee_assets(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Employee, Operation::View)?;

    store.get_employee(id)?.or_not_found("Employee not found")?;
    let held = store.list_employee_assignments(id, true)?;
    Ok(Json(ApiResponse::success(held)))
}

pub async fn employee_assignments(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Employee, Operation::View)?;

    store.get_employee(id)?.or_not_found("Employee not found")?;
    let history = store.list_employee_assignments(id, false)?;
    Ok(Json(ApiResponse::success(history)))
}
