//! Axis-aligned lat/long rectangles
//!
//! Boxes are the unit of work of the explorer: every subdivision step gets
//! its own copy, so no box is ever shared between branches.

use std::fmt;

use serde::Serialize;

use crate::core::error::{Error, Result};
use crate::core::place::{Place, MAX_LAT, MAX_LONG};

/// An axis-aligned rectangle with `min.lat <= max.lat` and `min.long <= max.long`
///
/// In globe-clamped mode both corners are clipped to the legal lat/long range
/// after every mutation. Otherwise a mutation that would leave the legal
/// range fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    min: Place,
    max: Place,
    globe: bool,
}

impl BoundingBox {
    /// Create a box from its south-west and north-east corners
    pub fn new(min: Place, max: Place) -> Result<Self> {
        if min.lat() > max.lat() || min.long() > max.long() {
            return Err(Error::InvalidGeometry(format!(
                "bounding box corners out of order: min {min}, max {max}"
            )));
        }
        Ok(Self { min, max, globe: false })
    }

    /// Create a degenerate box covering a single place
    pub fn from_place(place: Place) -> Self {
        Self { min: place, max: place, globe: false }
    }

    /// Smallest box containing every given place
    pub fn from_places<'a, I>(places: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Place>,
    {
        let mut iter = places.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| Error::InvalidGeometry("cannot bound an empty set of places".to_string()))?;
        let mut bbox = Self::from_place(*first);
        for place in iter {
            bbox.expand(place)?;
        }
        Ok(bbox)
    }

    /// Switch globe clamping on or off for subsequent mutations
    pub fn with_globe(mut self, globe: bool) -> Self {
        self.globe = globe;
        self
    }

    pub fn is_globe(&self) -> bool {
        self.globe
    }

    pub fn min(&self) -> Place {
        self.min
    }

    pub fn max(&self) -> Place {
        self.max
    }

    pub fn sw(&self) -> Place {
        self.min
    }

    pub fn nw(&self) -> Place {
        self.corner(self.max.lat(), self.min.long())
    }

    pub fn ne(&self) -> Place {
        self.max
    }

    pub fn se(&self) -> Place {
        self.corner(self.min.lat(), self.max.long())
    }

    /// Midpoint of the west edge
    pub fn west_mid(&self) -> Place {
        self.corner(self.mid_lat(), self.min.long())
    }

    /// Midpoint of the north edge
    pub fn north_mid(&self) -> Place {
        self.corner(self.max.lat(), self.mid_long())
    }

    /// Midpoint of the east edge
    pub fn east_mid(&self) -> Place {
        self.corner(self.mid_lat(), self.max.long())
    }

    /// Midpoint of the south edge
    pub fn south_mid(&self) -> Place {
        self.corner(self.min.lat(), self.mid_long())
    }

    pub fn center(&self) -> Place {
        self.corner(self.mid_lat(), self.mid_long())
    }

    /// The four corners in cyclic order: SW, SE, NE, NW
    pub fn corners(&self) -> [Place; 4] {
        [self.sw(), self.se(), self.ne(), self.nw()]
    }

    /// Height in degrees of latitude
    pub fn size_lat(&self) -> f64 {
        self.max.lat() - self.min.lat()
    }

    /// Width in degrees of longitude
    pub fn size_long(&self) -> f64 {
        self.max.long() - self.min.long()
    }

    pub fn contains(&self, place: &Place) -> bool {
        place.lat() >= self.min.lat()
            && place.lat() <= self.max.lat()
            && place.long() >= self.min.long()
            && place.long() <= self.max.long()
    }

    /// Grow the box to include `place`
    pub fn expand(&mut self, place: &Place) -> Result<()> {
        let (min_lat, min_long, max_lat, max_long) = self.raw();
        self.set_raw(
            min_lat.min(place.lat()),
            min_long.min(place.long()),
            max_lat.max(place.lat()),
            max_long.max(place.long()),
        )
    }

    /// Grow both axes by `percent` of their current size, split evenly on both sides
    pub fn expand_by_percent(&mut self, percent: f64) -> Result<()> {
        let lat_inc = self.size_lat() * percent / 100.0;
        let long_inc = self.size_long() * percent / 100.0;
        self.grow(lat_inc / 2.0, long_inc / 2.0)
    }

    /// Grow every side by `degrees`
    pub fn expand_by_degrees(&mut self, degrees: f64) -> Result<()> {
        self.grow(degrees, degrees)
    }

    /// Grow the latitude axis by `percent` of its current size
    pub fn expand_lat_by_percent(&mut self, percent: f64) -> Result<()> {
        let lat_inc = self.size_lat() * percent / 100.0;
        self.grow(lat_inc / 2.0, 0.0)
    }

    /// Grow the longitude axis by `percent` of its current size
    pub fn expand_long_by_percent(&mut self, percent: f64) -> Result<()> {
        let long_inc = self.size_long() * percent / 100.0;
        self.grow(0.0, long_inc / 2.0)
    }

    /// Perimeter sample points of a `rows` x `cols` grid laid over the box
    ///
    /// Every perimeter grid point appears exactly once: `2 * (rows + cols)`
    /// points in total. The four corners come first, in the order of
    /// [`corners`](Self::corners), followed by the west/east edge points
    /// from south to north and the south/north edge points from west to east.
    pub fn edges(&self, rows: usize, cols: usize) -> Result<Vec<Place>> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidGeometry(format!("edge grid must be at least 1x1, got {rows}x{cols}")));
        }
        let lats = self.lat_steps(rows);
        let longs = self.long_steps(cols);
        let (min_long, max_long) = (self.min.long(), self.max.long());
        let (min_lat, max_lat) = (self.min.lat(), self.max.lat());

        let mut result = Vec::with_capacity(2 * (rows + cols));
        result.extend_from_slice(&self.corners());
        for &lat in &lats[1..rows] {
            result.push(Place::new(lat, min_long)?);
            result.push(Place::new(lat, max_long)?);
        }
        for &long in &longs[1..cols] {
            result.push(Place::new(min_lat, long)?);
            result.push(Place::new(max_lat, long)?);
        }
        Ok(result)
    }

    /// Partition the box into `rows` x `cols` sub-boxes, row-major from the south-west
    ///
    /// Adjacent children share bit-identical boundary coordinates and the
    /// outer children reuse this box's exact min/max. Children inherit the
    /// clamp mode.
    pub fn box_grid(&self, rows: usize, cols: usize) -> Result<Vec<BoundingBox>> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidGeometry(format!("box grid must be at least 1x1, got {rows}x{cols}")));
        }
        let lats = self.lat_steps(rows);
        let longs = self.long_steps(cols);

        let mut grid = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                grid.push(BoundingBox {
                    min: Place::new(lats[i], longs[j])?,
                    max: Place::new(lats[i + 1], longs[j + 1])?,
                    globe: self.globe,
                });
            }
        }
        Ok(grid)
    }

    fn lat_steps(&self, n: usize) -> Vec<f64> {
        steps(self.min.lat(), self.max.lat(), n)
    }

    fn long_steps(&self, n: usize) -> Vec<f64> {
        steps(self.min.long(), self.max.long(), n)
    }

    fn mid_lat(&self) -> f64 {
        (self.min.lat() + self.max.lat()) / 2.0
    }

    fn mid_long(&self) -> f64 {
        (self.min.long() + self.max.long()) / 2.0
    }

    /// Build a place from coordinates lying between the box's corners
    fn corner(&self, lat: f64, long: f64) -> Place {
        Place::new_unchecked(lat, long)
    }

    fn raw(&self) -> (f64, f64, f64, f64) {
        (self.min.lat(), self.min.long(), self.max.lat(), self.max.long())
    }

    fn grow(&mut self, lat_by: f64, long_by: f64) -> Result<()> {
        let (min_lat, min_long, max_lat, max_long) = self.raw();
        self.set_raw(min_lat - lat_by, min_long - long_by, max_lat + lat_by, max_long + long_by)
    }

    /// Replace the corners, clamping in globe mode
    ///
    /// The box is left untouched when the new corners are invalid.
    fn set_raw(&mut self, mut min_lat: f64, mut min_long: f64, mut max_lat: f64, mut max_long: f64) -> Result<()> {
        if self.globe {
            min_lat = min_lat.max(-MAX_LAT);
            min_long = min_long.max(-MAX_LONG);
            max_lat = max_lat.min(MAX_LAT);
            max_long = max_long.min(MAX_LONG);
        }
        if min_lat > max_lat || min_long > max_long {
            return Err(Error::InvalidGeometry(format!(
                "box mutation would invert the corners: ({min_lat}, {min_long}) .. ({max_lat}, {max_long})"
            )));
        }
        let min = Place::new(min_lat, min_long)?;
        let max = Place::new(max_lat, max_long)?;
        self.min = min;
        self.max = max;
        Ok(())
    }
}

/// `n + 1` monotonic boundaries from `lo` to `hi`, ending exactly on `hi`
fn steps(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let delta = (hi - lo) / n as f64;
    (0..=n)
        .map(|i| if i == n { hi } else { (lo + delta * i as f64).min(hi) })
        .collect()
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.min, self.max)
    }
}
