//! Adaptive isoline exploration
//!
//! The explorer walks a bounding box recursively. Each box is either too
//! coarse (subdivided), uniform (one band everywhere it was sampled, stop),
//! at the resolution floor (contoured with [`LineDrawer`], stop) or split in
//! three along its longer axis and explored again, middle child first.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, trace};

use crate::core::bbox::BoundingBox;
use crate::core::destination::Destination;
use crate::core::discretizer::Discretize;
use crate::core::error::{Error, Result};
use crate::core::lines::{CellSample, LineDrawer};
use crate::core::matrix::{CostMatrix, CostMatrixProvider};
use crate::core::options::{ExploreOptions, ExploreStats};
use crate::core::place::Place;
use crate::core::sink::RenderSink;

/// Perimeter grid divisions along the longer and the shorter side of a sampled box
const LONG_SIDE_SAMPLES: usize = 9;
const SHORT_SIDE_SAMPLES: usize = 6;

/// Samples a destination tree's cost field and draws its isolines
pub struct Explorer {
    destination: Destination,
    places: Vec<Place>,
    needs_legs: bool,
    legs_filled: bool,
    discretizer: Arc<dyn Discretize>,
    provider: Arc<dyn CostMatrixProvider>,
    options: ExploreOptions,
    matrix: CostMatrix,
    line_drawer: LineDrawer,
}

impl Explorer {
    pub fn new(
        destination: Destination,
        discretizer: Arc<dyn Discretize>,
        provider: Arc<dyn CostMatrixProvider>,
        options: ExploreOptions,
    ) -> Result<Self> {
        options.validate()?;

        let mut places: Vec<Place> = Vec::new();
        for place in destination.places() {
            if !places.contains(&place) {
                places.push(place);
            }
        }
        if places.is_empty() {
            return Err(Error::EmptyDestinationSet(destination.name().to_string()));
        }

        let needs_legs = destination.has_traveling_salesman();
        Ok(Self {
            destination,
            places,
            needs_legs,
            legs_filled: false,
            discretizer,
            provider,
            options,
            matrix: CostMatrix::new(),
            line_drawer: LineDrawer::new(),
        })
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn options(&self) -> &ExploreOptions {
        &self.options
    }

    /// Replace the options, typically after the view changed
    pub fn set_options(&mut self, options: ExploreOptions) -> Result<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    pub fn matrix(&self) -> &CostMatrix {
        &self.matrix
    }

    /// Forget every memoized cost
    pub fn clear_cache(&mut self) {
        self.matrix.clear();
        self.legs_filled = false;
    }

    /// Show every destination leaf on the sink
    pub fn add_markers<S: RenderSink + ?Sized>(&self, sink: &mut S) {
        for leaf in self.destination.leaves() {
            sink.add_marker(leaf);
        }
    }

    /// Aggregated cost at every origin, filling the matrix as needed
    pub async fn costs(&mut self, origins: &[Place]) -> Result<Vec<f64>> {
        let provider = Arc::clone(&self.provider);
        provider.fill_missing(origins, &self.places, &mut self.matrix).await?;

        if !self.needs_legs {
            return self.destination.costs(origins, &self.matrix);
        }
        if !self.legs_filled {
            provider.fill_missing(&self.places, &self.places, &mut self.matrix).await?;
            self.legs_filled = true;
        }
        origins
            .iter()
            .map(|origin| self.destination.cost_from(origin, &self.matrix, None))
            .collect()
    }

    /// Aggregated cost at a single place
    pub async fn cost_at(&mut self, place: &Place) -> Result<f64> {
        let costs = self.costs(std::slice::from_ref(place)).await?;
        costs
            .first()
            .copied()
            .ok_or_else(|| Error::Unsupported("no cost computed for a single origin".to_string()))
    }

    /// Explore one box, sending lines (and cells when enabled) to the sink
    pub async fn explore<S: RenderSink + ?Sized>(&mut self, bbox: BoundingBox, sink: &mut S) -> Result<ExploreStats> {
        info!(
            "Exploring {bbox} with cells between {} and {} degrees",
            self.options.min_size, self.options.max_size
        );
        let mut stats = ExploreStats::default();
        self.explore_box(bbox, sink, &mut stats).await?;
        stats.matrix_entries = self.matrix.len();
        info!("Exploration done: {stats}");
        Ok(stats)
    }

    /// Explore every box the sink reports as visible
    pub async fn explore_view<S: RenderSink + ?Sized>(&mut self, sink: &mut S) -> Result<ExploreStats> {
        let mut total = ExploreStats::default();
        for bbox in sink.view_boxes() {
            let stats = self.explore(bbox, &mut *sink).await?;
            total.absorb(&stats);
        }
        Ok(total)
    }

    /// Clear previous lines, then explore the visible view again
    pub async fn redraw<S: RenderSink + ?Sized>(&mut self, sink: &mut S) -> Result<ExploreStats> {
        sink.clear_lines();
        self.explore_view(sink).await
    }

    fn explore_box<'a, S: RenderSink + ?Sized>(
        &'a mut self,
        bbox: BoundingBox,
        sink: &'a mut S,
        stats: &'a mut ExploreStats,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            stats.boxes_visited += 1;

            let max_size = self.options.max_size;
            if bbox.size_lat() > max_size || bbox.size_long() > max_size {
                return self.divide(bbox, sink, stats).await;
            }

            let mut samples = if bbox.size_lat() > bbox.size_long() {
                bbox.edges(LONG_SIDE_SAMPLES, SHORT_SIDE_SAMPLES)?
            } else {
                bbox.edges(SHORT_SIDE_SAMPLES, LONG_SIDE_SAMPLES)?
            };
            samples.push(bbox.center());

            let costs = self.costs(&samples).await?;
            let bands: Vec<f64> = costs.iter().map(|&cost| self.discretizer.discretize(cost)).collect();
            let center_cost = costs[costs.len() - 1];

            if bands.iter().all(|&band| band == bands[0]) {
                trace!("Flat cell {bbox} in band {}", bands[0]);
                stats.flat_cells += 1;
                if self.options.draw_cells {
                    sink.draw_flat_cell(&bbox, center_cost);
                }
                self.report(stats);
                return Ok(());
            }

            let min_size = self.options.min_size;
            if bbox.size_lat() < min_size && bbox.size_long() < min_size {
                let cell = CellSample {
                    corners: bbox.corners(),
                    costs: [costs[0], costs[1], costs[2], costs[3]],
                    bands: [bands[0], bands[1], bands[2], bands[3]],
                    center_cost: Some(center_cost),
                };
                let contours = self.line_drawer.find_lines(&cell)?;
                trace!("Fine cell {bbox} yields {} segments", contours.segments.len());

                stats.fine_cells += 1;
                stats.segments += contours.segments.len();
                stats.saddles += contours.saddles;
                if self.options.draw_cells {
                    sink.draw_fine_cell(&bbox);
                }
                for segment in &contours.segments {
                    sink.add_line(&segment.from, &segment.to, segment.band);
                }
                self.report(stats);
                return Ok(());
            }

            self.divide(bbox, sink, stats).await
        }
        .boxed()
    }

    /// Split in three along the longer axis and explore the middle child first
    async fn divide<S: RenderSink + ?Sized>(
        &mut self,
        bbox: BoundingBox,
        sink: &mut S,
        stats: &mut ExploreStats,
    ) -> Result<()> {
        let mut children = if bbox.size_lat() > bbox.size_long() {
            bbox.box_grid(3, 1)?
        } else {
            bbox.box_grid(1, 3)?
        };
        children.swap(0, 1);
        debug!("Dividing {bbox}");

        for child in children {
            self.explore_box(child, &mut *sink, &mut *stats).await?;
        }
        Ok(())
    }

    fn report(&self, stats: &mut ExploreStats) {
        stats.matrix_entries = self.matrix.len();
        if let Some(progress) = &self.options.progress {
            progress(stats);
        }
    }
}
