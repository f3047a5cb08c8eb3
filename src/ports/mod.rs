//! Port traits implemented by adapters.

pub mod asset_port;
pub mod config_port;
pub mod render_port;
