//! Request-scoped session context.
//!
//! Handlers that need a signed-in user take `SessionContext` as an argument;
//! handlers that must refuse signed-in users take `MaybeSession`. The token
//! comes from an `Authorization: Bearer <token>` header.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub token: String,
    pub user: User,
}

/// Present when the request carries a live session, absent otherwise.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<SessionContext>);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves the bearer token to its user. Unknown or expired tokens, tokens
/// whose user no longer exists, and deactivated users all yield `None`.
async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<SessionContext>, AppError> {
    let Some(token) = bearer_token(&parts.headers) else {
        return Ok(None);
    };
    let Some(user_id) = state.sessions.resolve(token).await? else {
        debug!("Bearer token does not map to a live session");
        return Ok(None);
    };
    let Some(user) = state.registry.store().find_by_id(user_id).await? else {
        return Ok(None);
    };
    if !user.is_active {
        debug!("Session {user_id} belongs to a deactivated account");
        return Ok(None);
    }
    Ok(Some(SessionContext {
        token: token.to_string(),
        user,
    }))
}

#[async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await?.ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(resolve(parts, state).await?))
    }
}
