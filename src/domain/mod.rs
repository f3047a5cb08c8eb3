//! Core domain types and the chart pipeline.

pub mod ohlcv;
pub mod normalizer;
pub mod indicator;
pub mod pattern;
pub mod layer;
pub mod composer;
pub mod chart;
pub mod settings;
pub mod error;
