use crate::error::{AppError, Result};
use crate::model::{ApiResponse, ShortenRequest, ShortenResponse, StatsResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use linko_core::ShortCode;
use tracing::instrument;

pub async fn shorten_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ShortenResponse>>> {
    let Json(request) = payload?;
    let shortened = state.shortener.shorten(&request.url).await?;
    Ok(Json(ApiResponse::ok("URL Shortened", shortened.into())))
}

#[instrument(skip(state))]
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response> {
    let code = ShortCode::parse(code, state.code_length)?;
    let original_url = state.redirector.resolve(&code).await?;
    let location = HeaderValue::try_from(original_url)
        .map_err(|e| AppError::InvalidRedirect(format!("{code}: {e}")))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

#[instrument(skip(state))]
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<StatsResponse>>> {
    let code = ShortCode::parse(code, state.code_length)?;
    let snapshot = state.redirector.stats(&code).await?;
    Ok(Json(ApiResponse::ok("Stats Data", snapshot.into())))
}
