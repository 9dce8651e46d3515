use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::audit::{log_action, AuditAction};
use crate::auth::guard::Caller;
use crate::auth::policy::{authorize, require_identity, Operation};
use crate::errors::{AppError, AppResult};
use crate::models::user::{CreateUserPayload, Role, UpdateProfilePayload, User};
use crate::AppState;

/// `GET /api/users/me`
pub async fn me(State(state): State<AppState>, caller: Caller) -> AppResult<Json<User>> {
    authorize(&caller, Operation::ReadOwnProfile, None)?;
    let identity = require_identity(&caller)?;

    let user = state
        .credentials
        .find_by_id(identity.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// `PUT /api/users/me`: name, email and password only; the role never changes here.
pub async fn update_me(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<UpdateProfilePayload>, JsonRejection>,
) -> AppResult<Json<User>> {
    authorize(&caller, Operation::UpdateOwnProfile, None)?;
    let identity = require_identity(&caller)?;
    let Json(payload) = payload?;

    let user = state.credentials.update_profile(identity.id, &payload).await?;

    log_action(
        &state.db,
        Some(identity.id),
        AuditAction::UpdateProfile,
        "Updated own profile",
        Some(json!({
            "name": payload.name.is_some(),
            "email": payload.email.is_some(),
            "password": payload.password.is_some(),
        })),
    )
    .await;

    Ok(Json(user.into()))
}

/// `POST /api/users`
pub async fn create_user(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<CreateUserPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<User>)> {
    let actor = authorize(&caller, Operation::CreateUser, None)?.map(|i| i.id);
    let Json(payload) = payload?;
    let role = payload.role.unwrap_or(Role::User);

    let user = state
        .credentials
        .create_user(&payload.name, &payload.email, &payload.password, role)
        .await?;

    log_action(
        &state.db,
        actor,
        AuditAction::CreateUser,
        &format!("Created user {}", user.email),
        Some(json!({ "userId": user.id, "role": role.as_str() })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(user.into())))
}
