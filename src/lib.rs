//! Polygon annotation over a single image, exported as PNG.
//!
//! Points are placed by clicking on a fixed-size surface, grouped into
//! closed colored polygons, and composited over the loaded image.

pub mod app;
pub mod config;
pub mod error;
pub mod export;
pub mod image_layer;
pub mod input;
pub mod model;
pub mod render;
pub mod session;
pub mod store;
