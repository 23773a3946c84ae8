//! Render sinks
//!
//! The explorer never draws anything itself: every marker, contour segment
//! and diagnostic cell goes through a [`RenderSink`].

use log::{debug, info, trace};
use serde::Serialize;

use crate::core::bbox::BoundingBox;
use crate::core::destination::WeightedPlace;
use crate::core::lines::Segment;
use crate::core::place::Place;

/// Consumer of exploration output
pub trait RenderSink: Send {
    /// Show a labelled destination
    fn add_marker(&mut self, place: &WeightedPlace);

    /// Draw one contour segment following the given band boundary
    fn add_line(&mut self, from: &Place, to: &Place, band: f64);

    /// Remove every previously drawn line and cell
    fn clear_lines(&mut self);

    /// Diagnostic: a cell found uniform, with its representative cost
    fn draw_flat_cell(&mut self, bbox: &BoundingBox, cost: f64);

    /// Diagnostic: a cell at the resolution floor that was contoured
    fn draw_fine_cell(&mut self, bbox: &BoundingBox);

    /// Currently visible extent; two boxes when the view wraps the antimeridian
    fn view_boxes(&self) -> Vec<BoundingBox>;
}

/// Logs every render call
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    view: Vec<BoundingBox>,
}

impl LogSink {
    pub fn new(view: Vec<BoundingBox>) -> Self {
        Self { view }
    }
}

impl RenderSink for LogSink {
    fn add_marker(&mut self, place: &WeightedPlace) {
        info!("Marker '{}' at {} (weight {})", place.name(), place.place(), place.weight());
    }

    fn add_line(&mut self, from: &Place, to: &Place, band: f64) {
        debug!("Line {from} -> {to} at band {band}");
    }

    fn clear_lines(&mut self) {
        debug!("Clear lines");
    }

    fn draw_flat_cell(&mut self, bbox: &BoundingBox, cost: f64) {
        trace!("Flat cell {bbox} with cost {cost}");
    }

    fn draw_fine_cell(&mut self, bbox: &BoundingBox) {
        trace!("Fine cell {bbox}");
    }

    fn view_boxes(&self) -> Vec<BoundingBox> {
        self.view.clone()
    }
}

/// A flat cell as recorded by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatCell {
    pub bbox: BoundingBox,
    pub cost: f64,
}

/// Keeps every render call in memory
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingSink {
    pub markers: Vec<WeightedPlace>,
    pub segments: Vec<Segment>,
    pub flat_cells: Vec<FlatCell>,
    pub fine_cells: Vec<BoundingBox>,
    #[serde(skip)]
    view: Vec<BoundingBox>,
}

impl RecordingSink {
    pub fn new(view: Vec<BoundingBox>) -> Self {
        Self { view, ..Default::default() }
    }

    /// Distinct band values among the recorded segments, ascending
    pub fn bands(&self) -> Vec<f64> {
        let mut bands: Vec<f64> = self.segments.iter().map(|s| s.band).collect();
        bands.sort_by(f64::total_cmp);
        bands.dedup();
        bands
    }
}

impl RenderSink for RecordingSink {
    fn add_marker(&mut self, place: &WeightedPlace) {
        self.markers.push(place.clone());
    }

    fn add_line(&mut self, from: &Place, to: &Place, band: f64) {
        self.segments.push(Segment { from: *from, to: *to, band });
    }

    fn clear_lines(&mut self) {
        self.segments.clear();
        self.flat_cells.clear();
        self.fine_cells.clear();
    }

    fn draw_flat_cell(&mut self, bbox: &BoundingBox, cost: f64) {
        self.flat_cells.push(FlatCell { bbox: bbox.clone(), cost });
    }

    fn draw_fine_cell(&mut self, bbox: &BoundingBox) {
        self.fine_cells.push(bbox.clone());
    }

    fn view_boxes(&self) -> Vec<BoundingBox> {
        self.view.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> BoundingBox {
        BoundingBox::new(Place::new(0.0, 0.0).unwrap(), Place::new(1.0, 1.0).unwrap()).unwrap()
    }

    #[test]
    fn test_recording_sink_clear_keeps_markers() {
        let mut sink = RecordingSink::new(vec![view()]);
        let p = Place::new(0.5, 0.5).unwrap();
        sink.add_marker(&WeightedPlace::new(p, 1.0, "home").unwrap());
        sink.add_line(&p, &Place::new(0.6, 0.6).unwrap(), 2.0);
        sink.draw_flat_cell(&view(), 1.0);
        sink.draw_fine_cell(&view());

        sink.clear_lines();
        assert_eq!(sink.markers.len(), 1);
        assert!(sink.segments.is_empty());
        assert!(sink.flat_cells.is_empty());
        assert!(sink.fine_cells.is_empty());
        assert_eq!(sink.view_boxes(), vec![view()]);
    }

    #[test]
    fn test_recording_sink_bands() {
        let mut sink = RecordingSink::default();
        let p = Place::new(0.5, 0.5).unwrap();
        for band in [2.0, 1.0, 2.0, 3.0] {
            sink.add_line(&p, &p, band);
        }
        assert_eq!(sink.bands(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_recording_sink_serializes() {
        let mut sink = RecordingSink::default();
        let p = Place::new(0.5, 0.25).unwrap();
        sink.add_line(&p, &p, 1.0);
        let json = serde_json::to_value(&sink).unwrap();
        assert_eq!(json["segments"][0]["from"]["long"], 0.25);
        assert!(json.get("view").is_none());
    }

    #[test]
    fn test_log_sink_view() {
        let sink = LogSink::new(vec![view(), view()]);
        assert_eq!(sink.view_boxes().len(), 2);
    }
}
