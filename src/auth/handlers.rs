use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        claims::Claims,
        dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        middleware::{require_bearer, CurrentUser},
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/validate", get(validate))
        .route_layer(from_fn_with_state(state.clone(), require_bearer))
}

fn bad_body(rejection: JsonRejection) -> AppError {
    warn!(error = %rejection.body_text(), "malformed request body");
    AppError::BadRequest(rejection.body_text())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let out = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(out.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let out = state.auth.login(payload).await?;
    Ok(Json(LoginResponse {
        access_token: out.access_token,
    }))
}

#[instrument(skip_all)]
pub async fn validate(CurrentUser(claims): CurrentUser) -> Json<Claims> {
    Json(claims)
}
