//! Core library modules for isocost
//!
//! Geometry, cost model, exploration and rendering sinks. The public surface
//! is re-exported from the crate root.

pub mod bbox;
pub mod cost;
pub mod destination;
pub mod discretizer;
pub mod error;
pub mod explorer;
pub mod input;
pub mod lines;
pub mod matrix;
pub mod options;
pub mod place;
pub mod sink;
pub mod svg;
