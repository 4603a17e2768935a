use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::audit::AuditEntry;
use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{CreateUserRequest, ListParams, PermissionsRequest, UpdateUserRequest};
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt,
};
use crate::server::validation::{optional, validate_email, validate_password, validate_username};
use crate::store::Store;
use crate::types::{ActionType, EntityType, NewUser, Page, PermissionGrant, Role};

fn check_grants(grants: &[PermissionGrant]) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for grant in grants {
        if !seen.insert(grant.entity_type) {
            return Err(ApiError::bad_request(format!(
                "Duplicate permission entry for '{}'",
                grant.entity_type
            )));
        }
    }
    Ok(())
}

fn check_employee(store: &dyn Store, employee_id: Option<i64>) -> Result<(), ApiError> {
    if let Some(id) = employee_id {
        if store.get_employee(id)?.is_none() {
            return Err(ApiError::bad_request("Linked employee does not exist"));
        }
    }
    Ok(())
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = Page::new(params.page, params.limit, DEFAULT_PAGE_SIZE);
    let search = optional(params.search);
    let users = state.store.list_users(search.as_deref(), page)?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(users, page))))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.store.get_user_view(id)?.or_not_found("User not found")?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn create_user(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    let username = validate_username(&req.username)?;
    let email = validate_email(&req.email)?;
    validate_password(&req.password)?;
    check_employee(store, req.employee_id)?;
    if let Some(grants) = &req.permissions {
        check_grants(grants)?;
    }

    let new_user = NewUser {
        username,
        email,
        password_hash: state.passwords.hash(&req.password)?,
        role: req.role.unwrap_or_default(),
        employee_id: req.employee_id,
        is_active: req.is_active.unwrap_or(true),
    };
    let grants = req.permissions.as_deref().unwrap_or_default();
    let user = store.create_user(&new_user, grants)?;

    let view = store.get_user_view(user.id)?.or_not_found("User not found")?;

    state.audit.record(
        &admin.user,
        admin.source.as_deref(),
        AuditEntry::new(ActionType::Create, EntityType::User)
            .entity(user.id, &user.username)
            .new_values(&view),
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(view))))
}

pub async fn update_user(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    let before = store.get_user_view(id)?.or_not_found("User not found")?;
    let mut user = before.user.clone();
    let is_self = user.id == admin.user.id;

    if let Some(email) = &req.email {
        user.email = validate_email(email)?;
    }
    if let Some(role) = req.role {
        if is_self && role != Role::Admin {
            return Err(ApiError::bad_request("Cannot remove your own admin role"));
        }
        user.role = role;
    }
    if let Some(is_active) = req.is_active {
        if is_self && !is_active {
            return Err(ApiError::bad_request("Cannot deactivate your own account"));
        }
        user.is_active = is_active;
    }
    if let Some(employee_id) = req.employee_id {
        check_employee(store, employee_id)?;
        user.employee_id = employee_id;
    }
    if let Some(password) = &req.password {
        validate_password(password)?;
        user.password_hash = state.passwords.hash(password)?;
    }
    if let Some(grants) = &req.permissions {
        check_grants(grants)?;
    }

    store.update_user(&user, req.permissions.as_deref())?;

    let after = store.get_user_view(id)?.or_not_found("User not found")?;

    state.audit.record(
        &admin.user,
        admin.source.as_deref(),
        AuditEntry::new(ActionType::Update, EntityType::User)
            .entity(id, &after.user.username)
            .old_values(&before)
            .new_values(&after),
    );

    Ok(Json(ApiResponse::success(after)))
}

pub async fn delete_user(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if id == admin.user.id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }

    let before = state
        .store
        .get_user_view(id)?
        .or_not_found("User not found")?;

    if !state.store.delete_user(id)? {
        return Err(ApiError::not_found("User not found"));
    }

    state.audit.record(
        &admin.user,
        admin.source.as_deref(),
        AuditEntry::new(ActionType::Delete, EntityType::User)
            .entity(id, &before.user.username)
            .old_values(&before),
    );

    Ok(Json(ApiResponse::message("User deleted")))
}

pub async fn set_permissions(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<PermissionsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    let user = store.get_user(id)?.or_not_found("User not found")?;
    check_grants(&req.permissions)?;

    let before = store.list_permission_grants(id)?;
    store.replace_permission_grants(id, &req.permissions)?;
    let after = store.list_permission_grants(id)?;

    state.audit.record(
        &admin.user,
        admin.source.as_deref(),
        AuditEntry::new(ActionType::Update, EntityType::User)
            .entity(id, &user.username)
            .old_values(&before)
            .new_values(&after)
            .description(format!("Cập nhật quyền người dùng: {}", user.username)),
    );

    Ok(Json(ApiResponse::success(after)))
}
