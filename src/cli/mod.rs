//! CLI-specific utilities for isocost
//!
//! This module contains code specific to the command-line interface,
//! separate from the core library functionality.

pub mod args;
pub mod output;
pub mod progress;

pub use output::{OutputDestination, OverwriteBehavior};
pub use progress::ProgressManager;
