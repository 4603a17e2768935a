use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use super::access::require_permission;
use crate::audit::AuditEntry;
use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{AssetListParams, AssetRequest};
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt,
};
use crate::server::validation::{optional, required, validate_code, validate_price};
use crate::store::AssetFilter;
use crate::types::{
    ActionType, AssetDraft, AssetStatus, AssetView, AssignmentView, EntityType, Operation, Page,
};

/// Parses a status query or body value. Blank means "not given".
pub(super) fn parse_asset_status(value: Option<&str>) -> Result<Option<AssetStatus>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => AssetStatus::parse(v)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid asset status: '{v}'"))),
    }
}

fn draft_from(req: AssetRequest, current_status: AssetStatus) -> Result<AssetDraft, ApiError> {
    let asset_type_id = req
        .asset_type_id
        .ok_or_else(|| ApiError::bad_request("Asset type is required"))?;

    Ok(AssetDraft {
        asset_code: validate_code(&req.asset_code, "Asset code")?,
        asset_name: required(&req.asset_name, "Asset name")?,
        asset_type_id: Some(asset_type_id),
        brand: optional(req.brand),
        model: optional(req.model),
        serial_number: optional(req.serial_number),
        purchase_date: req.purchase_date,
        purchase_price: validate_price(req.purchase_price)?,
        location: optional(req.location),
        notes: optional(req.notes),
        status: parse_asset_status(req.status.as_deref())?.unwrap_or(current_status),
    })
}

pub async fn list_assets(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<AssetListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Asset, Operation::View)?;

    let filter = AssetFilter {
        search: optional(params.search),
        status: parse_asset_status(params.status.as_deref())?,
        asset_type_id: params.asset_type,
    };
    let page = Page::new(params.page, params.limit, DEFAULT_PAGE_SIZE);
    let assets = store.list_assets(&filter, page)?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(assets, page))))
}

pub async fn get_asset(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Asset, Operation::View)?;

    let asset = store.get_asset_view(id)?.or_not_found("Asset not found")?;
    Ok(Json(ApiResponse::success(asset)))
}

pub async fn create_asset(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AssetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Asset, Operation::Create)?;

    let draft = draft_from(req, AssetStatus::Available)?;
    let asset = store.create_asset(&draft)?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Create, EntityType::Asset)
            .entity(asset.id, &asset.asset_code)
            .new_values(&asset),
    );

    let view = store.get_asset_view(asset.id)?.or_not_found("Asset not found")?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(view))))
}

pub async fn update_asset(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<AssetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Asset, Operation::Edit)?;

    let before = store.get_asset(id)?.or_not_found("Asset not found")?;
    let draft = draft_from(req, before.status)?;
    let after = store.update_asset(id, &draft)?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Update, EntityType::Asset)
            .entity(id, &after.asset_code)
            .old_values(&before)
            .new_values(&after),
    );

    let view = store.get_asset_view(id)?.or_not_found("Asset not found")?;
    Ok(Json(ApiResponse::success(view)))
}

pub async fn delete_asset(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Asset, Operation::Delete)?;

    let before = store.get_asset(id)?.or_not_found("Asset not found")?;
    store.delete_asset(id)?;

    state.audit.record(
        &auth.user,
        auth.source.as_deref(),
        AuditEntry::new(ActionType::Delete, EntityType::Asset)
            .entity(id, &before.asset_code)
            .old_values(&before),
    );

    Ok(Json(ApiResponse::message("Asset deleted")))
}

#[derive(Debug, Serialize)]
pub struct UsageHistory {
    pub asset: AssetView,
    pub total_usage_days: i64,
    pub history: Vec<AssignmentView>,
}

pub async fn usage_history(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Asset, Operation::View)?;

    let asset = store.get_asset_view(id)?.or_not_found("Asset not found")?;
    let history = store.list_asset_assignments(id)?;
    let total_usage_days = history.iter().map(|h| h.usage_days).sum();

    Ok(Json(ApiResponse::success(UsageHistory {
        asset,
        total_usage_days,
        history,
    })))
}

pub async fn asset_assignments(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Asset, Operation::View)?;

    store.get_asset(id)?.or_not_found("Asset not found")?;
    let history = store.list_asset_assignments(id)?;
    Ok(Json(ApiResponse::success(history)))
}

/// The active assignment of an asset; `data` is null when it is not held.
pub async fn current_assignment(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    require_permission(store, &auth.user, EntityType::Asset, Operation::View)?;

    store.get_asset(id)?.or_not_found("Asset not found")?;
    let current = store.current_assignment(id)?;
    Ok(Json(ApiResponse {
        data: current,
        error: None,
    }))
}
