//! Geographic point values
//!
//! A `Place` is an immutable, validated (lat, long) pair in degrees. Every
//! derived computation returns a new value.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Legal latitude range in degrees
pub const MAX_LAT: f64 = 90.0;
/// Legal longitude range in degrees
pub const MAX_LONG: f64 = 180.0;

/// Linear interpolation between two scalars
pub fn lerp(v1: f64, v2: f64, t: f64) -> f64 {
    v1 * (1.0 - t) + v2 * t
}

/// A validated point on the globe
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawPlace")]
pub struct Place {
    lat: f64,
    long: f64,
}

#[derive(Deserialize)]
struct RawPlace {
    lat: f64,
    long: f64,
}

impl TryFrom<RawPlace> for Place {
    type Error = Error;

    fn try_from(raw: RawPlace) -> Result<Self> {
        Place::new(raw.lat, raw.long)
    }
}

impl Place {
    /// Create a place, failing on non-finite or out-of-range coordinates
    pub fn new(lat: f64, long: f64) -> Result<Self> {
        if !lat.is_finite() || !long.is_finite() || lat.abs() > MAX_LAT || long.abs() > MAX_LONG {
            return Err(Error::InvalidPlace { lat, long });
        }
        Ok(Self { lat, long })
    }

    /// Build a place from coordinates already known to be in range
    pub(crate) fn new_unchecked(lat: f64, long: f64) -> Self {
        debug_assert!(lat.is_finite() && long.is_finite() && lat.abs() <= MAX_LAT && long.abs() <= MAX_LONG);
        Self { lat, long }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn long(&self) -> f64 {
        self.long
    }

    /// Multiply both coordinates by `t`
    pub fn scale(&self, t: f64) -> Result<Place> {
        Place::new(self.lat * t, self.long * t)
    }

    /// Component-wise sum of two places
    pub fn add(&self, other: &Place) -> Result<Place> {
        Place::new(self.lat + other.lat, self.long + other.long)
    }

    /// Interpolate from `self` (t = 0) towards `other` (t = 1)
    ///
    /// For `t` in [0, 1] the result is a convex combination of the two
    /// endpoints and is kept inside their coordinate span, so rounding can
    /// never push it past a pole or the antimeridian.
    pub fn lerp(&self, t: f64, other: &Place) -> Result<Place> {
        let mut lat = lerp(self.lat, other.lat, t);
        let mut long = lerp(self.long, other.long, t);
        if (0.0..=1.0).contains(&t) {
            lat = lat.clamp(self.lat.min(other.lat), self.lat.max(other.lat));
            long = long.clamp(self.long.min(other.long), self.long.max(other.long));
        }
        Place::new(lat, long)
    }

    fn canonical_bits(v: f64) -> u64 {
        // 0.0 == -0.0, so both must hash alike
        if v == 0.0 {
            0.0f64.to_bits()
        } else {
            v.to_bits()
        }
    }
}

impl PartialEq for Place {
    fn eq(&self, other: &Self) -> bool {
        self.lat == other.lat && self.long == other.long
    }
}

// Coordinates are always finite, so float equality is reflexive here.
impl Eq for Place {}

impl Hash for Place {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Self::canonical_bits(self.lat).hash(state);
        Self::canonical_bits(self.long).hash(state);
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.long)
    }
}
