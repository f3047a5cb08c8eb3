//! HTTP surface for the chart pipeline.
//!
//! A single route, `POST /chart`, accepts the JSON payload and answers with
//! PNG bytes or a plain-text error. Rendering is CPU-bound, so handlers move
//! it onto tokio's blocking pool.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{routing::post, Router};
use std::sync::Arc;

use crate::domain::settings::RenderSettings;
use crate::ports::asset_port::BrandAssetPort;
use crate::ports::render_port::RenderPort;

/// Shared, read-only collaborators for every request.
pub struct AppState {
    pub settings: RenderSettings,
    pub assets: Arc<dyn BrandAssetPort + Send + Sync>,
    pub renderer: Arc<dyn RenderPort + Send + Sync>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chart", post(handlers::render_chart))
        .fallback(handlers::not_found)
        .with_state(Arc::new(state))
}
