//! Pairwise cost calculators
//!
//! Closed-form geometric approximations of travel cost between two places.
//! None of them routes over a real network.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::place::Place;

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn finite(what: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidConfig(format!("{what} must be finite, got {value}")))
    }
}

fn positive(what: &str, value: f64) -> Result<f64> {
    if finite(what, value)? > 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidConfig(format!("{what} must be positive, got {value}")))
    }
}

/// A pure pairwise cost function
///
/// Implementations must return a finite, non-negative cost, exactly `0.0`
/// when both places are equal.
pub trait CostCalculator: Send + Sync {
    /// Cost of travelling from `from` to `to`
    fn cost(&self, from: &Place, to: &Place) -> f64;

    /// Unit of the returned cost, empty for plain degrees
    fn units(&self) -> &'static str {
        ""
    }
}

/// Taxicab (L1) distance, optionally measured along axes rotated by an angle
#[derive(Debug, Clone)]
pub struct Taxicab {
    cos_angle: f64,
    sin_angle: f64,
}

impl Taxicab {
    pub fn new() -> Self {
        Self { cos_angle: 1.0, sin_angle: 0.0 }
    }

    /// Measure along axes rotated by `degrees`
    pub fn rotated(degrees: f64) -> Result<Self> {
        let rads = finite("taxicab rotation", degrees)?.to_radians();
        Ok(Self { cos_angle: rads.cos(), sin_angle: rads.sin() })
    }

    fn rotate(&self, place: &Place) -> (f64, f64) {
        let x = place.long() * self.cos_angle - place.lat() * self.sin_angle;
        let y = place.long() * self.sin_angle + place.lat() * self.cos_angle;
        (x, y)
    }
}

impl Default for Taxicab {
    fn default() -> Self {
        Self::new()
    }
}

impl CostCalculator for Taxicab {
    fn cost(&self, from: &Place, to: &Place) -> f64 {
        let (x1, y1) = self.rotate(from);
        let (x2, y2) = self.rotate(to);
        (x1 - x2).abs() + (y1 - y2).abs()
    }
}

/// Grid movement in eight directions: diagonal steps cost `diagonal_cost`
#[derive(Debug, Clone)]
pub struct EightDirections {
    diagonal_cost: f64,
}

impl EightDirections {
    pub fn new() -> Self {
        Self { diagonal_cost: std::f64::consts::SQRT_2 }
    }

    /// Fails unless `diagonal_cost` is finite and positive
    pub fn with_diagonal_cost(diagonal_cost: f64) -> Result<Self> {
        Ok(Self { diagonal_cost: positive("diagonal cost", diagonal_cost)? })
    }
}

impl Default for EightDirections {
    fn default() -> Self {
        Self::new()
    }
}

impl CostCalculator for EightDirections {
    fn cost(&self, from: &Place, to: &Place) -> f64 {
        let d_lat = (from.lat() - to.lat()).abs();
        let d_long = (from.long() - to.long()).abs();
        let min = d_lat.min(d_long);
        let max = d_lat.max(d_long);
        min * self.diagonal_cost + (max - min)
    }
}

/// Planar Pythagorean distance in degrees
#[derive(Debug, Clone, Default)]
pub struct Euclidean;

impl CostCalculator for Euclidean {
    fn cost(&self, from: &Place, to: &Place) -> f64 {
        let d_lat = from.lat() - to.lat();
        let d_long = from.long() - to.long();
        d_lat.hypot(d_long)
    }
}

/// Euclidean distance in kilometres with longitude scaled by `cos(reference latitude)`
///
/// A good approximation of great-circle distance near the reference latitude.
#[derive(Debug, Clone)]
pub struct LatCorrectedEuclidean {
    lat_scale: f64,
    long_scale: f64,
}

impl LatCorrectedEuclidean {
    pub fn new(reference_lat: f64) -> Result<Self> {
        Self::with_radius(reference_lat, EARTH_RADIUS_KM)
    }

    /// Fails on a non-finite latitude or a radius that is not finite and positive
    pub fn with_radius(reference_lat: f64, planet_radius: f64) -> Result<Self> {
        let reference_lat = finite("reference latitude", reference_lat)?;
        let km_per_degree = positive("planet radius", planet_radius)? * 1f64.to_radians();
        Ok(Self {
            lat_scale: km_per_degree,
            long_scale: km_per_degree * reference_lat.to_radians().cos(),
        })
    }
}

impl CostCalculator for LatCorrectedEuclidean {
    fn cost(&self, from: &Place, to: &Place) -> f64 {
        let d_lat = self.lat_scale * (from.lat() - to.lat());
        let d_long = self.long_scale * (from.long() - to.long());
        d_lat.hypot(d_long)
    }

    fn units(&self) -> &'static str {
        "km"
    }
}

/// Great-circle distance on a sphere
#[derive(Debug, Clone)]
pub struct Haversine {
    planet_radius: f64,
}

impl Haversine {
    pub fn new() -> Self {
        Self { planet_radius: EARTH_RADIUS_KM }
    }

    /// Fails unless `planet_radius` is finite and positive
    pub fn with_radius(planet_radius: f64) -> Result<Self> {
        Ok(Self { planet_radius: positive("planet radius", planet_radius)? })
    }
}

impl Default for Haversine {
    fn default() -> Self {
        Self::new()
    }
}

impl CostCalculator for Haversine {
    fn cost(&self, from: &Place, to: &Place) -> f64 {
        let d_lat = (to.lat() - from.lat()).to_radians();
        let d_long = (to.long() - from.long()).to_radians();
        let lat1 = from.lat().to_radians();
        let lat2 = to.lat().to_radians();

        let sd_lat = (d_lat / 2.0).sin();
        let sd_long = (d_long / 2.0).sin();

        // Rounding can push `a` a hair past 1 for antipodal points
        let a = (sd_lat * sd_lat + sd_long * sd_long * lat1.cos() * lat2.cos()).clamp(0.0, 1.0);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        self.planet_radius * c
    }

    fn units(&self) -> &'static str {
        "km"
    }
}

/// Name-addressable calculator variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalculatorKind {
    Taxicab,
    EightDirections,
    Euclidean,
    LatCorrected,
    Haversine,
}

impl CalculatorKind {
    pub const NAMES: &'static [&'static str] =
        &["taxicab", "eight-directions", "euclidean", "lat-corrected", "haversine"];

    pub fn name(&self) -> &'static str {
        match self {
            CalculatorKind::Taxicab => "taxicab",
            CalculatorKind::EightDirections => "eight-directions",
            CalculatorKind::Euclidean => "euclidean",
            CalculatorKind::LatCorrected => "lat-corrected",
            CalculatorKind::Haversine => "haversine",
        }
    }

    /// Instantiate the calculator
    ///
    /// `parameter` is the variant's optional knob: rotation angle for
    /// taxicab, diagonal cost for eight-directions, reference latitude for
    /// lat-corrected (required) and planet radius for haversine.
    pub fn build(&self, parameter: Option<f64>) -> Result<Arc<dyn CostCalculator>> {
        if let Some(p) = parameter {
            finite(&format!("{} parameter", self.name()), p)?;
        }
        let calculator: Arc<dyn CostCalculator> = match (self, parameter) {
            (CalculatorKind::Taxicab, Some(angle)) => Arc::new(Taxicab::rotated(angle)?),
            (CalculatorKind::Taxicab, None) => Arc::new(Taxicab::new()),
            (CalculatorKind::EightDirections, Some(d)) => Arc::new(EightDirections::with_diagonal_cost(d)?),
            (CalculatorKind::EightDirections, None) => Arc::new(EightDirections::new()),
            (CalculatorKind::Euclidean, _) => Arc::new(Euclidean),
            (CalculatorKind::LatCorrected, Some(lat)) => Arc::new(LatCorrectedEuclidean::new(lat)?),
            (CalculatorKind::LatCorrected, None) => {
                return Err(Error::InvalidConfig("lat-corrected needs a reference latitude".to_string()))
            }
            (CalculatorKind::Haversine, Some(r)) => Arc::new(Haversine::with_radius(r)?),
            (CalculatorKind::Haversine, None) => Arc::new(Haversine::new()),
        };
        Ok(calculator)
    }
}

impl FromStr for CalculatorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "taxicab" => Ok(CalculatorKind::Taxicab),
            "eight-directions" => Ok(CalculatorKind::EightDirections),
            "euclidean" => Ok(CalculatorKind::Euclidean),
            "lat-corrected" => Ok(CalculatorKind::LatCorrected),
            "haversine" => Ok(CalculatorKind::Haversine),
            _ => Err(Error::unknown_variant("calculator", s, Self::NAMES)),
        }
    }
}

impl fmt::Display for CalculatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
