//! Choropleth maps of per-county values.
//!
//! A run loads a value table and a county boundary collection, joins them on
//! a normalized county name, classifies the values and writes a PNG map and
//! a Leaflet HTML map that share one colour ramp.

pub mod classify;
pub mod config;
pub mod data;
pub mod error;
pub mod interactive;
pub mod names;
pub mod palette;
pub mod pipeline;
pub mod processing;
pub mod render;
pub mod types;

pub use config::AppConfig;
pub use error::{DataQualityWarning, PipelineError};
pub use names::{normalize, RegionKey};
