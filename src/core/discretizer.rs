//! Banding functions
//!
//! A discretizer maps a continuous cost onto a finite, ordered set of band
//! values. Two costs are in the same band iff their discretized values
//! compare equal.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::core::error::{Error, Result};

/// Rounding noise, in ulps of the operands, under which a band index snaps to the nearest integer
const SNAP_ULPS: f64 = 64.0;

/// Map a cost onto its band value
///
/// Implementations must be idempotent and monotonic non-decreasing for
/// values at or above their offset.
pub trait Discretize: Send + Sync {
    fn discretize(&self, v: f64) -> f64;
}

/// Transform applied before linear banding and inverted afterwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Scale {
    Linear,
    Ln,
    Log2,
    Log10,
    /// Logarithm in an arbitrary base (> 0, != 1)
    Log(f64),
    Sqrt,
}

impl Scale {
    pub const NAMES: &'static [&'static str] = &["linear", "ln", "log2", "log10", "log", "sqrt"];

    /// Resolve a scale by name; `log` needs an explicit base
    pub fn from_name(name: &str, base: Option<f64>) -> Result<Self> {
        let scale = match name.to_lowercase().as_str() {
            "linear" => Scale::Linear,
            "ln" => Scale::Ln,
            "log2" => Scale::Log2,
            "log10" => Scale::Log10,
            "sqrt" => Scale::Sqrt,
            "log" => {
                let base = base.ok_or_else(|| Error::InvalidConfig("log discretizer needs a base".to_string()))?;
                Scale::Log(base)
            }
            _ => return Err(Error::unknown_variant("discretizer", name, Self::NAMES)),
        };
        scale.validate()?;
        Ok(scale)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scale::Linear => "linear",
            Scale::Ln => "ln",
            Scale::Log2 => "log2",
            Scale::Log10 => "log10",
            Scale::Log(_) => "log",
            Scale::Sqrt => "sqrt",
        }
    }

    fn validate(&self) -> Result<()> {
        if let Scale::Log(base) = *self {
            if !base.is_finite() || base <= 0.0 || base == 1.0 {
                return Err(Error::InvalidConfig(format!("log base must be positive and not 1, got {base}")));
            }
        }
        Ok(())
    }

    fn forward(&self, x: f64) -> f64 {
        match *self {
            Scale::Linear => x,
            Scale::Ln => x.ln(),
            Scale::Log2 => x.log2(),
            Scale::Log10 => x.log10(),
            Scale::Log(base) => x.ln() / base.ln(),
            Scale::Sqrt => x.sqrt(),
        }
    }

    fn inverse(&self, y: f64) -> f64 {
        match *self {
            Scale::Linear => y,
            Scale::Ln => y.exp(),
            Scale::Log2 => y.exp2(),
            Scale::Log10 => 10f64.powf(y),
            Scale::Log(base) => base.powf(y),
            Scale::Sqrt => y * y,
        }
    }
}

impl FromStr for Scale {
    type Err = Error;

    /// Accepts the plain names plus `log:<base>`
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((name, base)) if name.eq_ignore_ascii_case("log") => {
                let base = base
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| Error::InvalidConfig(format!("invalid log base '{base}'")))?;
                Scale::from_name("log", Some(base))
            }
            _ => Scale::from_name(s, None),
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::Log(base) => write!(f, "log:{base}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Step/offset banding with an optional non-linear transform
///
/// Linear: `step * ceil((v - offset) / step) + offset`.
/// Others: `g(linear_step(f(|v - offset|))) + offset` where `f` is the
/// transform and `g` its inverse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discretizer {
    scale: Scale,
    step: f64,
    offset: f64,
}

impl Discretizer {
    pub fn new(scale: Scale, step: f64, offset: f64) -> Result<Self> {
        if !step.is_finite() || step <= 0.0 {
            return Err(Error::InvalidConfig(format!("discretizer step must be positive, got {step}")));
        }
        if !offset.is_finite() {
            return Err(Error::InvalidConfig(format!("discretizer offset must be finite, got {offset}")));
        }
        scale.validate()?;
        Ok(Self { scale, step, offset })
    }

    pub fn linear(step: f64, offset: f64) -> Result<Self> {
        Self::new(Scale::Linear, step, offset)
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Band index of `x` on a `step` grid shifted by `origin`
    ///
    /// Values already sitting on a band boundary, up to rounding noise, stay
    /// on it; this is what makes re-discretization exact.
    fn band_index(&self, x: f64, origin: f64) -> f64 {
        let q = (x - origin) / self.step;
        if !q.is_finite() {
            return q;
        }
        let nearest = q.round();
        // Error of (x - origin) / step is bounded by a few ulps of the operands
        let tolerance = SNAP_ULPS * f64::EPSILON * ((x.abs() + origin.abs()) / self.step).max(1.0);
        if (q - nearest).abs() <= tolerance {
            nearest
        } else {
            q.ceil()
        }
    }
}

impl Discretize for Discretizer {
    fn discretize(&self, v: f64) -> f64 {
        match self.scale {
            Scale::Linear => self.step * self.band_index(v, self.offset) + self.offset,
            scale => {
                let transformed = scale.forward((v - self.offset).abs());
                scale.inverse(self.step * self.band_index(transformed, 0.0)) + self.offset
            }
        }
    }
}

impl fmt::Display for Discretizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (step {}, offset {})", self.scale, self.step, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_bands() {
        let d = Discretizer::linear(0.5, 0.0).unwrap();
        assert_eq!(d.discretize(0.1), 0.5);
        assert_eq!(d.discretize(0.5), 0.5);
        assert_eq!(d.discretize(0.51), 1.0);
        assert_eq!(d.discretize(-0.1), 0.0);
    }

    #[test]
    fn test_linear_offset() {
        let d = Discretizer::linear(2.0, 1.0).unwrap();
        assert_eq!(d.discretize(1.5), 3.0);
        assert_eq!(d.discretize(3.0), 3.0);
        assert_eq!(d.discretize(3.1), 5.0);
    }

    #[test]
    fn test_linear_snaps_rounding_noise() {
        let d = Discretizer::linear(0.1, 0.0).unwrap();
        // 0.1 * 3 is 0.30000000000000004
        let once = d.discretize(0.3);
        assert_eq!(d.discretize(once), once);
        assert!((once - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_ln_bands() {
        let d = Discretizer::new(Scale::Ln, 1.0, 0.0).unwrap();
        let e = std::f64::consts::E;
        assert!((d.discretize(2.0) - e).abs() < 1e-12);
        assert!((d.discretize(3.0) - e * e).abs() < 1e-12);
        assert_eq!(d.discretize(d.discretize(3.0)), d.discretize(3.0));
    }

    #[test]
    fn test_log_base_and_magnitude() {
        let d = Discretizer::new(Scale::Log(3.0), 1.0, 10.0).unwrap();
        // |v - offset| = 5 lands in the 3^2 band either side of the offset
        assert!((d.discretize(15.0) - 19.0).abs() < 1e-9);
        assert!((d.discretize(5.0) - 19.0).abs() < 1e-9);
    }

    #[test]
    fn test_sqrt_bands() {
        let d = Discretizer::new(Scale::Sqrt, 1.0, 0.0).unwrap();
        assert_eq!(d.discretize(2.0), 4.0);
        assert_eq!(d.discretize(4.0), 4.0);
        assert_eq!(d.discretize(0.0), 0.0);
    }

    #[test]
    fn test_fine_steps_on_large_values_take_the_ceiling() {
        let d = Discretizer::linear(1e-6, 0.0).unwrap();
        let once = d.discretize(10000.0000004);
        assert!((once - 10000.000001).abs() < 1e-9, "got {once}");
        assert_eq!(d.discretize(once), once);

        let d = Discretizer::linear(1e-3, 1e7).unwrap();
        let once = d.discretize(1e7 + 0.0004);
        assert!((once - (1e7 + 0.001)).abs() < 1e-7, "got {once}");
        assert_eq!(d.discretize(once), once);
    }

    #[test]
    fn test_value_at_offset_is_finite() {
        let d = Discretizer::new(Scale::Log10, 1.0, 2.0).unwrap();
        assert_eq!(d.discretize(2.0), 2.0);
    }

    #[test]
    fn test_monotonic_above_offset() {
        for scale in [Scale::Linear, Scale::Ln, Scale::Log2, Scale::Log10, Scale::Log(5.0), Scale::Sqrt] {
            let d = Discretizer::new(scale, 0.25, 1.0).unwrap();
            let mut previous = d.discretize(1.0);
            for i in 1..2000 {
                let current = d.discretize(1.0 + i as f64 * 0.01);
                assert!(current >= previous, "{scale} not monotonic at step {i}");
                previous = current;
            }
        }
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(Discretizer::linear(0.0, 0.0).is_err());
        assert!(Discretizer::linear(-1.0, 0.0).is_err());
        assert!(Discretizer::linear(1.0, f64::NAN).is_err());
        assert!(Discretizer::new(Scale::Log(1.0), 1.0, 0.0).is_err());
        assert!(Discretizer::new(Scale::Log(-2.0), 1.0, 0.0).is_err());
    }

    #[test]
    fn test_scale_from_str() {
        assert_eq!("log10".parse::<Scale>().unwrap(), Scale::Log10);
        assert_eq!("log:3".parse::<Scale>().unwrap(), Scale::Log(3.0));
        assert!("log".parse::<Scale>().is_err());
        match "sqr".parse::<Scale>() {
            Err(Error::UnknownVariant { suggestion, .. }) => assert_eq!(suggestion.as_deref(), Some("sqrt")),
            other => panic!("expected UnknownVariant, got {other:?}"),
        }
    }
}
