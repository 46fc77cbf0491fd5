//! Locates a target's horizontal offset in a rasterized camera frame with a
//! small tanh feedforward network, trained online on synthetic renders.

pub mod activator;
pub mod config;
pub mod error;
pub mod feed_forward;
pub mod matrix;
pub mod pipeline;
pub mod raster;
pub mod render;
pub mod sample;
pub mod telemetry;
pub mod trainer;

mod layers;
mod persist;
mod utils;

pub use error::{Error, Result};
