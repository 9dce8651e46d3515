use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::json;

use crate::audit::{log_action, AuditAction};
use crate::auth::token::Identity;
use crate::errors::{AppError, AppResult};
use crate::models::user::{AuthUserData, LoginPayload, LoginResult};
use crate::validation::normalize_email;
use crate::AppState;

const INVALID_LOGIN: &str = "Invalid email or password";

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> AppResult<Json<LoginResult>> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);

    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }

    state.login_limiter.check(&email)?;

    let Some(user) = state.credentials.verify(&email, &payload.password).await? else {
        state.login_limiter.record(&email);
        tracing::warn!(target: "AUTH", email = %email, "Failed login attempt");
        log_action(
            &state.db,
            None,
            AuditAction::LoginFailed,
            "Failed login attempt",
            Some(json!({ "email": email })),
        )
        .await;
        return Err(AppError::InvalidCredential(INVALID_LOGIN.into()));
    };

    state.login_limiter.reset(&email);

    let identity = Identity {
        id: user.id,
        email: user.email.clone(),
        role: user.role(),
    };
    let (token, expires_at) = state.tokens.issue(&identity)?;

    if let Err(e) = state.credentials.touch_last_login(user.id).await {
        tracing::warn!(target: "AUTH", user_id = user.id, error = %e, "Failed to stamp last login");
    }
    log_action(
        &state.db,
        Some(user.id),
        AuditAction::Login,
        &format!("User {} logged in", user.email),
        None,
    )
    .await;

    tracing::info!(target: "AUTH", user_id = user.id, role = identity.role.as_str(), "Login successful");

    Ok(Json(LoginResult {
        token,
        expires_at,
        user: AuthUserData {
            id: user.id,
            role: identity.role,
            name: user.name,
            email: user.email,
        },
    }))
}
