//! # Isocost Library
//!
//! Computes isolines ("isocost" curves) of a travel-cost field over
//! geographic coordinates. The field is the weighted, aggregated cost of
//! reaching a tree of destinations from every point of a bounding box.
//!
//! ## Features
//!
//! - **Five cost calculators**: taxicab, eight-direction, euclidean,
//!   latitude-corrected euclidean and haversine
//! - **Banding**: linear, ln, log2, log10, log-base-B and sqrt discretizers
//! - **Destination trees**: all / any / two-of-them / traveling-salesman sets, nested freely
//! - **Adaptive exploration**: boxes are only refined where a band boundary runs through them
//! - **Pluggable output**: any [`RenderSink`]; log, in-memory and SVG sinks included
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use isocost::{Aggregation, DestinationRecord, Discretizer, Haversine, RecordingSink, ViewConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let records = vec![
//!         DestinationRecord::new(48.8566, 2.3522, 3.0, "office"),
//!         DestinationRecord::new(48.8049, 2.1204, 1.0, "parents"),
//!     ];
//!     let destination = isocost::destinations_from_records(&records, Aggregation::All)?;
//!     let view = ViewConfig::default().view_box(&destination)?;
//!
//!     let mut sink = RecordingSink::new(vec![view.clone()]);
//!     let stats = isocost::explore(
//!         destination,
//!         Arc::new(Haversine::new()),
//!         Discretizer::linear(5.0, 0.0)?,
//!         view,
//!         &mut sink,
//!     )
//!     .await?;
//!     println!("{} segments: {stats}", sink.segments.len());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

// Internal modules
mod core;

pub use crate::core::bbox::BoundingBox;
pub use crate::core::cost::{
    CalculatorKind, CostCalculator, EightDirections, Euclidean, Haversine, LatCorrectedEuclidean, Taxicab,
    EARTH_RADIUS_KM,
};
pub use crate::core::destination::{Aggregation, Destination, DestinationSet, WeightedPlace, TSP_SOFT_LIMIT};
pub use crate::core::discretizer::{Discretize, Discretizer, Scale};
pub use crate::core::error::{suggest_correction, Error, Result};
pub use crate::core::explorer::Explorer;
pub use crate::core::input::{destinations_from_records, load_destinations, parse_destinations, DestinationRecord};
pub use crate::core::lines::{CellContours, CellSample, LineDrawer, Segment};
pub use crate::core::matrix::{CostMatrix, CostMatrixProvider, DefaultCostMatrixProvider, ProviderOptions};
pub use crate::core::options::{ExploreOptions, ExploreStats, ProgressCallback, ViewConfig};
pub use crate::core::place::{lerp, Place, MAX_LAT, MAX_LONG};
pub use crate::core::sink::{FlatCell, LogSink, RecordingSink, RenderSink};
pub use crate::core::svg::SvgSink;

/// Explore a box with cell sizes derived from it by [`ViewConfig::default`]
///
/// Destination markers are added to the sink before exploring.
pub async fn explore<S: RenderSink + ?Sized>(
    destination: Destination,
    calculator: Arc<dyn CostCalculator>,
    discretizer: Discretizer,
    bbox: BoundingBox,
    sink: &mut S,
) -> Result<ExploreStats> {
    let options = ViewConfig::default().explore_options(&bbox)?;
    explore_with_options(destination, calculator, discretizer, bbox, sink, options).await
}

/// Explore a box with custom options
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use isocost::{Aggregation, BoundingBox, DestinationRecord, Discretizer, Euclidean, ExploreOptions, Place, RecordingSink};
///
/// let destination = isocost::destinations_from_records(
///     &[DestinationRecord::new(0.0, 0.0, 1.0, "origin")],
///     Aggregation::Any,
/// )?;
/// let bbox = BoundingBox::new(Place::new(-2.0, -2.0)?, Place::new(2.0, 2.0)?)?;
/// let options = ExploreOptions { max_size: 1.0, min_size: 0.05, draw_cells: true, ..Default::default() };
///
/// let mut sink = RecordingSink::default();
/// isocost::explore_with_options(destination, Arc::new(Euclidean), Discretizer::linear(0.5, 0.0)?, bbox, &mut sink, options).await?;
/// println!("{} flat cells", sink.flat_cells.len());
/// # Ok(())
/// # }
/// ```
pub async fn explore_with_options<S: RenderSink + ?Sized>(
    destination: Destination,
    calculator: Arc<dyn CostCalculator>,
    discretizer: Discretizer,
    bbox: BoundingBox,
    sink: &mut S,
    options: ExploreOptions,
) -> Result<ExploreStats> {
    let provider = Arc::new(DefaultCostMatrixProvider::new(calculator));
    let mut explorer = Explorer::new(destination, Arc::new(discretizer), provider, options)?;
    explorer.add_markers(&mut *sink);
    explorer.explore(bbox, sink).await
}
