//! HTTP request handlers for the web adapter.

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use crate::domain::chart::ChartService;
use crate::domain::error::ChartError;

use super::{AppState, WebError};

pub async fn render_chart(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, WebError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ChartError::payload_shape(format!("request body is not valid JSON: {e}")))?;

    let image = tokio::task::spawn_blocking(move || {
        let service = ChartService {
            settings: &state.settings,
            assets: state.assets.as_ref(),
            renderer: state.renderer.as_ref(),
        };
        service.render(&payload)
    })
    .await
    .map_err(|e| WebError::internal(format!("render task failed: {e}")))??;

    Ok(([(header::CONTENT_TYPE, image.content_type)], image.bytes).into_response())
}

pub async fn not_found() -> WebError {
    WebError::not_found("no such route; POST a payload to /chart")
}
