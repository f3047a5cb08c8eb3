//! candlechart: candlestick chart rendering service.
//!
//! Hexagonal architecture: the render pipeline lives in [`domain`], port traits
//! in [`ports`], concrete implementations (PNG rasterizer, INI config, brand
//! asset loader, HTTP surface) in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
