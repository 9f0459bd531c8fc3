use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use weather_core::{Error, SavedLocation, parse_coordinates};

use crate::{error::ApiError, state::SharedState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    lat: Option<String>,
    lon: Option<String>,
}

fn malformed(rejection: JsonRejection) -> Error {
    Error::InvalidInput(rejection.body_text())
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn register_handler(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::auth(malformed(e)))?;

    let session = state
        .credentials
        .register(&req.name, &req.email, &req.password)
        .await
        .map_err(ApiError::auth)?;

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login_handler(
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::auth(malformed(e)))?;

    let session = state
        .credentials
        .login(&req.email, &req.password)
        .await
        .map_err(ApiError::auth)?;

    Ok(Json(session))
}

pub async fn geocode_handler(
    State(state): State<SharedState>,
    Query(params): Query<GeocodeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.q.unwrap_or_default();
    let suggestions = state.weather.geocode(&query).await?;

    Ok(Json(suggestions))
}

pub async fn forecast_handler(
    State(state): State<SharedState>,
    Query(params): Query<ForecastParams>,
) -> Result<impl IntoResponse, ApiError> {
    let coords = parse_coordinates(params.lat.as_deref(), params.lon.as_deref())?;
    let data = state.weather.forecast(coords).await?;

    Ok(Json(data))
}

/// Enforces `Authorization: Bearer <token>` for `user_id` when enabled.
fn authorize(state: &SharedState, headers: &HeaderMap, user_id: &str) -> Result<(), ApiError> {
    if !state.require_auth {
        return Ok(());
    }

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Error::Unauthorized)?;

    let claims = state.credentials.verify_token(token)?;
    if claims.id != user_id {
        return Err(Error::Forbidden.into());
    }

    Ok(())
}

pub async fn list_locations_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers, &user_id)?;
    let locations = state.locations.list(&user_id).await?;

    Ok(Json(locations))
}

pub async fn add_location_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<SavedLocation>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers, &user_id)?;
    let Json(location) = payload.map_err(malformed)?;

    let locations = state.locations.add(&user_id, location).await?;

    Ok((StatusCode::CREATED, Json(locations)))
}

pub async fn remove_location_handler(
    State(state): State<SharedState>,
    Path((user_id, location_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers, &user_id)?;
    let locations = state.locations.remove(&user_id, &location_id).await?;

    Ok(Json(locations))
}
