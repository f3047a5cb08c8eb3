//! Concrete adapter implementations for ports.

pub mod file_asset_adapter;
pub mod file_config_adapter;
pub mod png_renderer;
#[cfg(feature = "web")]
pub mod web;
