use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;

use super::access::require_permission;
use crate::audit::AuditEntry;
use crate::auth::{RequireAdmin, RequireAuth};
use crate::server::AppState;
use crate::server::dto::ImportResponse;
use crate::server::extract::ApiPath;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::transfer::{
    self, ALL_DATA_PREFIX, MAX_IMPORT_BYTES, USER_DATA_PREFIX, XLSX_CONTENT_TYPE,
    export_file_name,
};
use crate::types::{ActionType, EntityType, ImportReport, Operation, Role, RowError};

const UPLOAD_FIELD: &str = "file";

fn attachment(prefix: &str, bytes: Vec<u8>) -> impl IntoResponse {
    let file_name = export_file_name(prefix, Utc::now().date_naive());
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
}

pub async fn export_all(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();
    for entity in [EntityType::Asset, EntityType::Employee, EntityType::Assignment] {
        require_permission(store, &auth.user, entity, Operation::View)?;
    }

    let bytes = transfer::export_all(store)?;
    tracing::info!(username = %auth.user.username, size = bytes.len(), "Exported all data");
    Ok(attachment(ALL_DATA_PREFIX, bytes))
}

pub async fn export_user(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if auth.user.id != id && auth.user.role != Role::Admin {
        return Err(ApiError::forbidden("You can only export your own data"));
    }

    let store = state.store.as_ref();
    let user = store.get_user(id)?.or_not_found("User not found")?;
    let bytes = transfer::export_user(store, &user)?;
    Ok(attachment(USER_DATA_PREFIX, bytes))
}

fn upload_error(err: MultipartError) -> ApiError {
    ApiError {
        status: err.status(),
        message: err.body_text(),
    }
}

/// Reads the `file` field of an upload, accepting `.xlsx` files only.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_lowercase();
        if !file_name.ends_with(".xlsx") {
            return Err(ApiError::bad_request("Only .xlsx files are accepted"));
        }

        let bytes = field.bytes().await.map_err(upload_error)?;
        if bytes.len() > MAX_IMPORT_BYTES {
            return Err(ApiError::payload_too_large("File exceeds the 10 MB limit"));
        }
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }
        return Ok(bytes.to_vec());
    }

    Err(ApiError::bad_request("No file uploaded"))
}

fn merge(mut report: ImportReport, rejected: Vec<RowError>) -> ImportReport {
    report.errors.extend(rejected);
    report.errors.sort_by_key(|e| e.row);
    report
}

fn record_import(state: &AppState, admin: &RequireAdmin, entity: EntityType, report: &ImportReport) {
    let imported = report.success.len();
    let noun = entity.label();
    state.audit.record(
        &admin.user,
        admin.source.as_deref(),
        AuditEntry::new(ActionType::Import, entity)
            .name(format!("Import {imported} {noun} từ file Excel"))
            .new_values(report)
            .description(format!(
                "Import {imported} {noun} thành công, {} lỗi",
                report.errors.len()
            )),
    );
}

pub async fn import_assets(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = read_upload(multipart).await?;
    let decoded = transfer::read_assets(&bytes)?;
    let report = merge(state.store.import_assets(&decoded.rows)?, decoded.errors);

    tracing::info!(
        imported = report.success.len(),
        failed = report.errors.len(),
        "Imported assets"
    );
    record_import(&state, &admin, EntityType::Asset, &report);

    Ok(Json(ApiResponse::success(ImportResponse::from(report))))
}

pub async fn import_employees(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = read_upload(multipart).await?;
    let decoded = transfer::read_employees(&bytes)?;
    let report = merge(state.store.import_employees(&decoded.rows)?, decoded.errors);

    tracing::info!(
        imported = report.success.len(),
        failed = report.errors.len(),
        "Imported employees"
    );
    record_import(&state, &admin, EntityType::Employee, &report);

    Ok(Json(ApiResponse::success(ImportResponse::from(report))))
}
