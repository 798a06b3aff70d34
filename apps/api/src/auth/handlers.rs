use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::auth::extract::{MaybeSession, SessionContext};
use crate::auth::registry::NewAccount;
use crate::auth::validation::{ChangePasswordForm, LoginForm, RegistrationForm};
use crate::auth::AuthError;
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
    pub message: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub full_name: String,
    #[serde(flatten)]
    pub user: User,
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub count: usize,
    pub users: Vec<User>,
}

fn reject_signed_in(session: &MaybeSession) -> Result<(), AppError> {
    match session.0 {
        Some(_) => Err(AppError::AlreadyAuthenticated),
        None => Ok(()),
    }
}

/// POST /api/v1/auth/register
/// Creates the account and signs it in.
pub async fn handle_register(
    State(state): State<AppState>,
    session: MaybeSession,
    payload: Result<Json<RegistrationForm>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    reject_signed_in(&session)?;
    let Json(form) = payload?;

    let violations = form.validate();
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    let mut user = state
        .registry
        .register(NewAccount {
            username: form.username,
            email: form.email,
            password: form.password,
            first_name: form.first_name,
            last_name: form.last_name,
        })
        .await
        .map_err(|e| match e {
            AuthError::Storage(cause) => AppError::RegistrationFailed(cause.to_string()),
            other => other.into(),
        })?;

    let token = state
        .sessions
        .start(user.id, state.config.session_ttl_for(false))
        .await?;
    state.registry.record_login(&mut user).await?;

    let message = format!("Registration successful! Welcome, {}!", user.first_name);
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            user,
            message,
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    session: MaybeSession,
    payload: Result<Json<LoginForm>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    reject_signed_in(&session)?;
    let Json(form) = payload?;

    let violations = form.validate();
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    let mut user = state
        .registry
        .authenticate(&form.username_or_email, &form.password)
        .await?;

    let token = state
        .sessions
        .start(user.id, state.config.session_ttl_for(form.remember_me))
        .await?;
    state.registry.record_login(&mut user).await?;
    info!("User {} signed in", user.username);

    let message = format!("Welcome back, {}!", user.first_name);
    Ok(Json(SessionResponse {
        token,
        user,
        message,
    }))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> Result<Json<MessageResponse>, AppError> {
    state.sessions.end(&ctx.token).await?;
    info!("User {} signed out", ctx.user.username);
    Ok(Json(MessageResponse {
        message: format!(
            "You have been logged out successfully. Goodbye, {}!",
            ctx.user.first_name
        ),
    }))
}

/// POST /api/v1/auth/password
pub async fn handle_change_password(
    State(state): State<AppState>,
    ctx: SessionContext,
    payload: Result<Json<ChangePasswordForm>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(form) = payload?;
    let violations = form.validate();
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    let mut user = ctx.user;
    state
        .registry
        .change_password(&mut user, &form.current_password, &form.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Your password has been updated.".to_string(),
    }))
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(ctx: SessionContext) -> Json<User> {
    Json(ctx.user)
}

/// GET /api/v1/profile
pub async fn handle_profile(ctx: SessionContext) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        full_name: ctx.user.full_name(),
        user: ctx.user,
    })
}

/// GET /api/v1/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    _ctx: SessionContext,
) -> Result<Json<UserListResponse>, AppError> {
    let users = state.registry.list_users().await?;
    Ok(Json(UserListResponse {
        count: users.len(),
        users,
    }))
}
