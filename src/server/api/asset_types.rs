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
use crate::server::dto::AssetTypeRequest;
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::server::validation::{optional, required};
use crate::types::{ActionType, EntityType, Operation};

// Listing is open to every signed-in user: asset forms need the type names.
pub async fn list_asset_types(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let types = state.store.list_asset_types()?;
    Ok(Json(ApiResponse::success(types)))
}

pub async fn get_asset_type(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let asset_type = state
        .store
        .get_asset_type(id)?
        .or_not_found("Asset type not found")?;
    Ok(Json(ApiResponse::success(asset_type)))
}

pub async fn create_asset_type(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AssetTypeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::AssetType, Operation::Create)?;

    let type_name = required(&req.type_name, "Type name")?;
    let description = optional(req.description);
    let asset_type = store.create_asset_type(&type_name, description.as_deref())?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Create, EntityType::AssetType)
            .entity(asset_type.id, &asset_type.type_name)
            .new_values(&asset_type),
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(asset_type))))
}

pub async fn update_asset_type(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<AssetTypeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::AssetType, Operation::Edit)?;

    let before = store
        .get_asset_type(id)?
        .or_not_found("Asset type not found")?;
    let type_name = required(&req.type_name, "Type name")?;
    let description = optional(req.description);
    let after = store.update_asset_type(id, &type_name, description.as_deref())?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Update, EntityType::AssetType)
            .entity(id, &after.type_name)
            .old_values(&before)
            .new_values(&after),
    );

    Ok(Json(ApiResponse::success(after)))
}

pub async fn delete_asset_type(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::AssetType, Operation::Delete)?;

    let before = store
        .get_asset_type(id)?
        .or_not_found("Asset type not found")?;
    store.delete_asset_type(id)?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Delete, EntityType::AssetType)
            .entity(id, &before.type_name)
            .old_values(&before),
    );

    Ok(Json(ApiResponse::message("Asset type deleted")))
}
