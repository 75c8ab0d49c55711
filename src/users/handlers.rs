use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue},
    Json,
};
use tracing::instrument;

use crate::auth::extractors::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{
    Ack, DeleteRequest, LoginRequest, LoginResponse, RegisterRequest, UpdateRequest,
    UpdateResponse, UserProfile,
};
use super::services;

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<Ack>, ApiError> {
    services::register(&state, payload).await?;
    Ok(Json(Ack::new("registered successfully")))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<LoginResponse>), ApiError> {
    let outcome = services::login(&state, payload).await?;

    let mut headers = HeaderMap::new();
    let value =
        HeaderValue::from_str(&outcome.token).map_err(|e| ApiError::Internal(e.into()))?;
    headers.insert("auth-token", value);

    Ok((
        headers,
        Json(LoginResponse {
            status: "success",
            token: outcome.token,
            user_id: outcome.user_id,
            logged_in: true,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn user_info(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user = services::get_info(&state, user_id).await?;
    Ok(Json(UserProfile::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_info(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let modified = services::update_info(&state, user_id, payload).await?;
    Ok(Json(UpdateResponse {
        status: "success",
        message: "updated successfully",
        modified,
    }))
}

#[instrument(skip(state, payload))]
pub async fn user_delete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Option<Json<DeleteRequest>>,
) -> Result<Json<Ack>, ApiError> {
    let requested = payload.and_then(|Json(body)| body.user_id);
    services::delete_account(&state, user_id, requested).await?;
    Ok(Json(Ack::new("user deleted successfully")))
}
