use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::ActivityListParams;
use crate::server::extract::{ApiPath, ApiQuery};
use crate::server::response::{ApiError, ApiResponse, DEFAULT_LOG_PAGE_SIZE, PaginatedResponse};
use crate::server::validation::optional;
use crate::store::ActivityFilter;
use crate::types::{ActionType, EntityType, Page};

fn parse_entity_type(value: &str) -> Result<EntityType, ApiError> {
    EntityType::parse(value)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid entity type: '{value}'")))
}

pub async fn list_activity_logs(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ActivityListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let action_type = match optional(params.action_type) {
        Some(v) => Some(
            ActionType::parse(&v)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid action type: '{v}'")))?,
        ),
        None => None,
    };
    let entity_type = optional(params.entity_type)
        .map(|v| parse_entity_type(&v))
        .transpose()?;

    let filter = ActivityFilter {
        action_type,
        entity_type,
        username: optional(params.username),
    };
    let page = Page::new(params.page, params.limit, DEFAULT_LOG_PAGE_SIZE);
    let logs = state.store.list_activity_logs(&filter, page)?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(logs, page))))
}

pub async fn entity_activity_logs(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    ApiPath((entity_type, entity_id)): ApiPath<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let entity_type = parse_entity_type(&entity_type)?;
    let logs = state
        .store
        .list_entity_activity_logs(entity_type, entity_id)?;
    Ok(Json(ApiResponse::success(logs)))
}
