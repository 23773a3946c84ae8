//! Exploration settings and statistics

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::bbox::BoundingBox;
use crate::core::destination::Destination;
use crate::core::error::{Error, Result};
use crate::core::place::{Place, MAX_LAT, MAX_LONG};

/// Progress callback, called after every terminal cell with the running totals
pub type ProgressCallback = Arc<dyn Fn(&ExploreStats) + Send + Sync>;

/// Counters collected during an exploration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExploreStats {
    pub boxes_visited: usize,
    pub flat_cells: usize,
    pub fine_cells: usize,
    pub segments: usize,
    pub saddles: usize,
    pub matrix_entries: usize,
}

impl ExploreStats {
    /// Accumulate another run's counters; `matrix_entries` keeps the latest size
    pub fn absorb(&mut self, other: &ExploreStats) {
        self.boxes_visited += other.boxes_visited;
        self.flat_cells += other.flat_cells;
        self.fine_cells += other.fine_cells;
        self.segments += other.segments;
        self.saddles += other.saddles;
        self.matrix_entries = other.matrix_entries;
    }
}

impl fmt::Display for ExploreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} boxes, {} flat cells, {} fine cells, {} segments ({} saddles), {} cached costs",
            self.boxes_visited, self.flat_cells, self.fine_cells, self.segments, self.saddles, self.matrix_entries
        )
    }
}

/// Options for an exploration
#[derive(Clone)]
pub struct ExploreOptions {
    /// Boxes wider or taller than this (in degrees) are always subdivided
    pub max_size: f64,

    /// Boxes narrower and shorter than this (in degrees) are contoured, not subdivided
    pub min_size: f64,

    /// Report flat and fine cells to the sink
    pub draw_cells: bool,

    /// Optional progress callback
    pub progress: Option<ProgressCallback>,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self {
            max_size: 1.0,
            min_size: 1.0 / 80.0,
            draw_cells: false,
            progress: None,
        }
    }
}

impl fmt::Debug for ExploreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExploreOptions")
            .field("max_size", &self.max_size)
            .field("min_size", &self.min_size)
            .field("draw_cells", &self.draw_cells)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ExploreOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.min_size.is_finite() || self.min_size <= 0.0 {
            return Err(Error::InvalidConfig(format!("min size must be positive, got {}", self.min_size)));
        }
        if self.max_size.is_nan() || self.max_size < self.min_size {
            return Err(Error::InvalidConfig(format!(
                "max size {} must not be below min size {}",
                self.max_size, self.min_size
            )));
        }
        Ok(())
    }
}

/// How the explored box and cell sizes derive from the destinations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewConfig {
    /// Growth of the destinations' bounding box, in percent of its size
    pub expand_percent: f64,

    /// Max cell size is the view's smaller side divided by this
    pub max_divisor: f64,

    /// Min cell size is the view's smaller side divided by this
    pub min_divisor: f64,

    /// Smallest side in degrees, applied before expansion to degenerate views
    pub min_extent: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            expand_percent: 50.0,
            max_divisor: 2.0,
            min_divisor: 80.0,
            min_extent: 0.1,
        }
    }
}

impl ViewConfig {
    /// Globe-clamped box around every place of the tree
    pub fn view_box(&self, destination: &Destination) -> Result<BoundingBox> {
        let mut view = BoundingBox::from_places(destination.places().iter())?.with_globe(true);
        let pad_lat = (self.min_extent - view.size_lat()).max(0.0) / 2.0;
        let pad_long = (self.min_extent - view.size_long()).max(0.0) / 2.0;
        if pad_lat > 0.0 || pad_long > 0.0 {
            let (min, max) = (view.min(), view.max());
            view.expand(&Place::new((min.lat() - pad_lat).max(-MAX_LAT), (min.long() - pad_long).max(-MAX_LONG))?)?;
            view.expand(&Place::new((max.lat() + pad_lat).min(MAX_LAT), (max.long() + pad_long).min(MAX_LONG))?)?;
        }
        view.expand_by_percent(self.expand_percent)?;
        Ok(view)
    }

    /// Cell size limits for exploring `view`
    pub fn explore_options(&self, view: &BoundingBox) -> Result<ExploreOptions> {
        if self.max_divisor <= 0.0 || self.min_divisor <= 0.0 {
            return Err(Error::InvalidConfig("size divisors must be positive".to_string()));
        }
        let size = view.size_lat().min(view.size_long());
        let options = ExploreOptions {
            max_size: size / self.max_divisor,
            min_size: size / self.min_divisor,
            ..Default::default()
        };
        options.validate()?;
        Ok(options)
    }
}
