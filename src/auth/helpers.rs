use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::request::Parts;

use super::middleware::AuthError;
use super::token::TokenValidationError;
use crate::server::AppState;
use crate::types::User;

/// Extracts the token from a `Bearer` Authorization header.
/// Returns Ok(None) if no header is present.
pub fn extract_bearer_token(auth_header: Option<&str>) -> Result<Option<&str>, AuthError> {
    match auth_header {
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
            Some(_) => Err(AuthError::InvalidToken),
            None => Err(AuthError::InvalidScheme),
        },
        None => Ok(None),
    }
}

/// Verifies a raw token and resolves it to the live user record.
///
/// The token alone is not trusted: a user deleted or disabled after the token
/// was issued is rejected here.
pub fn validate_token(state: &AppState, raw_token: &str) -> Result<User, AuthError> {
    let claims = state.tokens.verify(raw_token).map_err(|e| match e {
        TokenValidationError::TokenExpired => AuthError::TokenExpired,
        TokenValidationError::InvalidToken => AuthError::InvalidToken,
    })?;

    let user_id = claims.user_id().ok_or(AuthError::InvalidToken)?;
    let user = state
        .store
        .get_user(user_id)
        .map_err(|e| {
            tracing::error!("Failed to load user {user_id}: {e}");
            AuthError::InternalError
        })?
        .ok_or(AuthError::InvalidToken)?;

    if !user.is_active {
        return Err(AuthError::AccountDisabled);
    }

    Ok(user)
}

/// Best-effort client address: the peer address when the server was started
/// with connect info. With `trust_forwarded` the first `X-Forwarded-For` hop
/// takes precedence.
pub fn client_address(parts: &Parts, trust_forwarded: bool) -> Option<String> {
    let forwarded = || {
        parts
            .headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    trust_forwarded
        .then(forwarded)
        .flatten()
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}
