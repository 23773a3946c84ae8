//! Marching-squares contour extraction for a single cell
//!
//! Corners are indexed `[SW, SE, NE, NW]`, so the cell edges are 0-1 (south),
//! 1-2 (east), 2-3 (north) and 3-0 (west). For a band boundary `b` the
//! case index has bit `i` set iff `cost[i] - b > 0`.

use log::{debug, trace};
use serde::Serialize;

use crate::core::error::Result;
use crate::core::place::Place;

/// One straight piece of an isoline, tagged with the band boundary it follows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub from: Place,
    pub to: Place,
    pub band: f64,
}

/// The four corner samples of a cell, plus its centre cost when known
#[derive(Debug, Clone, PartialEq)]
pub struct CellSample {
    pub corners: [Place; 4],
    pub costs: [f64; 4],
    pub bands: [f64; 4],
    /// Raw cost at the cell centre, used to resolve saddles
    pub center_cost: Option<f64>,
}

/// Segments found in one cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellContours {
    pub segments: Vec<Segment>,
    /// Number of saddle configurations resolved
    pub saddles: usize,
}

/// Extracts contour segments from cell samples
#[derive(Debug, Clone, Copy, Default)]
pub struct LineDrawer;

impl LineDrawer {
    pub fn new() -> Self {
        LineDrawer
    }

    /// Segments for every distinct band among the corners except the highest
    pub fn find_lines(&self, cell: &CellSample) -> Result<CellContours> {
        let max = cell.bands.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut boundaries: Vec<f64> = Vec::with_capacity(3);
        for &band in &cell.bands {
            if band != max && !boundaries.contains(&band) {
                boundaries.push(band);
            }
        }

        let mut contours = CellContours::default();
        for band in boundaries {
            self.draw_boundary(cell, band, &mut contours)?;
        }
        Ok(contours)
    }

    /// Segments where the cost crosses `band` inside the cell
    pub fn draw_boundary(&self, cell: &CellSample, band: f64, out: &mut CellContours) -> Result<()> {
        let v = cell.costs.map(|c| c - band);
        let index = case_index(&v);

        let edges: &[[(usize, usize); 2]] = match index {
            0 | 15 => {
                trace!("Cell has no crossing at band {band}");
                &[]
            }
            // One corner on its own side
            1 | 14 => &[[(0, 1), (0, 3)]],
            2 | 13 => &[[(1, 0), (1, 2)]],
            4 | 11 => &[[(2, 1), (2, 3)]],
            7 | 8 => &[[(3, 0), (3, 2)]],
            // Straight through
            6 | 9 => &[[(0, 1), (2, 3)]],
            3 | 12 => &[[(0, 3), (1, 2)]],
            _ => {
                return self.draw_saddle(cell, band, &v, out);
            }
        };

        for [(a1, b1), (a2, b2)] in edges {
            let from = crossing(&cell.corners, &v, *a1, *b1)?;
            let to = crossing(&cell.corners, &v, *a2, *b2)?;
            out.segments.push(Segment { from, to, band });
        }
        Ok(())
    }

    /// Cases 5 and 10: diagonal corners share a side
    ///
    /// The side of the centre sample (or of the mean corner cost when there
    /// is none) is taken as connected through the middle; each corner on the
    /// other side is cut off by its own segment.
    fn draw_saddle(&self, cell: &CellSample, band: f64, v: &[f64; 4], out: &mut CellContours) -> Result<()> {
        let reference = match cell.center_cost {
            Some(center) => center - band,
            None => v.iter().sum::<f64>() / 4.0,
        };
        let center_above = reference > 0.0;
        debug!(
            "Resolving saddle at band {band} with centre {}",
            if center_above { "above" } else { "below" }
        );

        for corner in 0..4 {
            if (v[corner] > 0.0) != center_above {
                let previous = (corner + 3) % 4;
                let next = (corner + 1) % 4;
                let from = crossing(&cell.corners, v, corner, previous)?;
                let to = crossing(&cell.corners, v, corner, next)?;
                out.segments.push(Segment { from, to, band });
            }
        }
        out.saddles += 1;
        Ok(())
    }
}

fn case_index(v: &[f64; 4]) -> u8 {
    let mut index = 0;
    for (i, value) in v.iter().enumerate() {
        if *value > 0.0 {
            index |= 1 << i;
        }
    }
    index
}

/// Zero crossing of the signed values along the edge between corners `i` and `j`
///
/// The edge is always walked from its lower-indexed corner, so the same edge
/// yields the same point whichever side is "inside".
fn crossing(corners: &[Place; 4], v: &[f64; 4], i: usize, j: usize) -> Result<Place> {
    let (a, b) = if i < j { (i, j) } else { (j, i) };
    let t = v[a] / (v[a] - v[b]);
    corners[a].lerp(t, &corners[b])
}
