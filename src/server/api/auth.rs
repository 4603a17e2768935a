use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{LoginRequest, LoginResponse, ProfileResponse};
use crate::server::extract::ApiJson;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store.as_ref();

    let user = store
        .get_user_by_username(req.username.trim())?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    if !state.passwords.verify(&req.password, &user.password_hash)? {
        tracing::info!(username = %user.username, "Rejected login: wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    if !user.is_active {
        return Err(ApiError::unauthorized("Account is disabled"));
    }

    let token = state.tokens.issue(&user)?;
    let view = store
        .get_user_view(user.id)?
        .or_not_found("User not found")?;

    tracing::info!(username = %user.username, "User logged in");

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        user: ProfileResponse::from(view),
    })))
}

pub async fn me(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .store
        .get_user_view(auth.user.id)?
        .or_not_found("User not found")?;

    Ok(Json(ApiResponse::success(ProfileResponse::from(view))))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout(_auth: RequireAuth) -> impl IntoResponse {
    Json(ApiResponse::message("Logged out"))
}
