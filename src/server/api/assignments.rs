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
use crate::server::dto::{
    AssignRequest, AssignmentListParams, EmployeeAssignmentParams, ReturnRequest,
};
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt,
};
use crate::server::validation::optional;
use crate::store::AssignmentFilter;
use crate::types::{
    ActionType, AssignmentStatus, AssignmentView, EntityType, NewAssignment, Operation, Page,
};

fn audit_name(view: &AssignmentView) -> String {
    format!("{} → {}", view.asset_code, view.employee_code)
}

fn parse_status(value: Option<&str>) -> Result<Option<AssignmentStatus>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => AssignmentStatus::parse(v)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid assignment status: '{v}'"))),
    }
}

pub async fn list_assignments(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<AssignmentListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Assignment, Operation::View)?;

    let filter = AssignmentFilter {
        search: optional(params.search),
        status: parse_status(params.status.as_deref())?,
    };
    let page = Page::new(params.page, params.limit, DEFAULT_PAGE_SIZE);
    let assignments = store.list_assignments(&filter, page)?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        assignments,
        page,
    ))))
}

pub async fn get_assignment(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Assignment, Operation::View)?;

    let assignment = store
        .get_assignment(id)?
        .or_not_found("Assignment not found")?;
    Ok(Json(ApiResponse::success(assignment)))
}

pub async fn employee_assignments(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(employee_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<EmployeeAssignmentParams>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Assignment, Operation::View)?;

    store
        .get_employee(employee_id)?
        .or_not_found("Employee not found")?;
    let assignments =
        store.list_employee_assignments(employee_id, params.active_only.unwrap_or(false))?;
    Ok(Json(ApiResponse::success(assignments)))
}

pub async fn assign_asset(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AssignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Assignment, Operation::Create)?;

    let assigned_date = req
        .assigned_date
        .ok_or_else(|| ApiError::bad_request("Assigned date is required"))?;
    let assigned_by = optional(req.assigned_by).unwrap_or_else(|| auth.user.username.clone());
    let assignment = store.assign_asset(&NewAssignment {
        asset_id: req.asset_id,
        employee_id: req.employee_id,
        assigned_date,
        assigned_by: Some(assigned_by),
        notes: optional(req.notes),
    })?;

    let view = store
        .get_assignment(assignment.id)?
        .or_not_found("Assignment not found")?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Assign, EntityType::Assignment)
            .entity(view.assignment.id, audit_name(&view))
            .new_values(&view.assignment),
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(view))))
}

pub async fn return_asset(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ReturnRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Assignment, Operation::Edit)?;

    let return_date = req
        .return_date
        .ok_or_else(|| ApiError::bad_request("Return date is required"))?;

    let before = store
        .get_assignment(id)?
        .filter(|view| view.assignment.status == AssignmentStatus::Active)
        .or_not_found("No active assignment found")?;
    if return_date < before.assignment.assigned_date {
        return Err(ApiError::bad_request(
            "Return date cannot be earlier than the assigned date",
        ));
    }

    store.return_assignment(id, return_date, optional(req.notes).as_deref())?;

    let after = store
        .get_assignment(id)?
        .or_not_found("Assignment not found")?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Return, EntityType::Assignment)
            .entity(id, audit_name(&after))
            .old_values(&before.assignment)
            .new_values(&after.assignment),
    );

    Ok(Json(ApiResponse::success(after)))
}
