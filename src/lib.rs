//! Normalize liquid-xenon yield measurements into per-field records, filter
//! them, and compare them against a recoil yield model.

pub mod color;
pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod physics;
pub mod render;

pub use error::{Error, Result};
