//! Kernel density estimation on a binned domain.
//!
//! Densities of two samples are compared on a shared grid of equally spaced
//! points spanning the union of both samples' ranges. The kernel shape and the
//! bandwidth rule are fixed per analysis through [`DensityConfig`].

use crate::errors::{SnrError, SnrResult};
use crate::stats::{self, iqr_sorted, sorted, std_dev};
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Kernel shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    #[default]
    Gaussian,
    /// Epanechnikov kernel scaled so that the bandwidth is its standard deviation
    Epanechnikov,
}

impl Kernel {
    /// Kernel value at offset `u` for bandwidth `h`, integrating to one over `u`.
    pub fn evaluate(&self, u: FloatValue, h: FloatValue) -> FloatValue {
        match self {
            Kernel::Gaussian => {
                let z = u / h;
                (-0.5 * z * z).exp() / (h * (2.0 * PI).sqrt())
            }
            Kernel::Epanechnikov => {
                let a = h * 5f64.sqrt();
                let z = u / a;
                if z.abs() < 1.0 {
                    0.75 * (1.0 - z * z) / a
                } else {
                    0.0
                }
            }
        }
    }
}

/// Bandwidth selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bandwidth {
    /// Silverman's rule of thumb, `0.9 * min(sd, IQR / 1.34) * n^(-1/5)`
    #[default]
    Silverman,
    /// Scott's variant, `1.06 * min(sd, IQR / 1.34) * n^(-1/5)`
    Scott,
    /// A fixed bandwidth in the units of the sample
    Fixed(FloatValue),
}

impl Bandwidth {
    /// Bandwidth for `sample`. NaN for samples with fewer than two values.
    pub fn select(&self, sample: &[FloatValue]) -> FloatValue {
        match *self {
            Bandwidth::Fixed(h) => h,
            Bandwidth::Silverman => rule_of_thumb(sample, 0.9),
            Bandwidth::Scott => rule_of_thumb(sample, 1.06),
        }
    }
}

fn rule_of_thumb(sample: &[FloatValue], factor: FloatValue) -> FloatValue {
    let n = sample.len();
    if n < 2 {
        return FloatValue::NAN;
    }
    let sd = std_dev(sample);
    let mut spread = sd.min(iqr_sorted(&sorted(sample)) / 1.34);
    // Fallbacks for a collapsed IQR
    if spread <= 0.0 {
        spread = sd;
    }
    if spread <= 0.0 {
        spread = sample[0].abs();
    }
    if spread <= 0.0 {
        spread = 1.0;
    }
    factor * spread * (n as FloatValue).powf(-0.2)
}

/// Density estimation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    /// Default: Gaussian
    pub kernel: Kernel,
    /// Default: Silverman
    pub bandwidth: Bandwidth,
    /// Number of evaluation points on the shared domain.
    ///
    /// Default: 1024
    pub n_bins: usize,
}

impl DensityConfig {
    /// Reject settings that cannot produce a density.
    ///
    /// # Errors
    ///
    /// [`SnrError::Error`] if `n_bins < 2` or a fixed bandwidth is not a
    /// positive finite number.
    pub fn validate(&self) -> SnrResult<()> {
        if self.n_bins < 2 {
            return Err(SnrError::Error(format!(
                "density n_bins must be at least 2, got {}",
                self.n_bins
            )));
        }
        if let Bandwidth::Fixed(h) = self.bandwidth {
            if !(h.is_finite() && h > 0.0) {
                return Err(SnrError::Error(format!(
                    "fixed bandwidth must be positive and finite, got {}",
                    h
                )));
            }
        }
        Ok(())
    }
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            kernel: Kernel::default(),
            bandwidth: Bandwidth::default(),
            n_bins: 1024,
        }
    }
}

/// Density values evaluated at the points of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityEstimate {
    pub grid: Vec<FloatValue>,
    pub density: Vec<FloatValue>,
    pub bandwidth: FloatValue,
}

impl DensityEstimate {
    /// Density rescaled to sum to one over the grid points.
    ///
    /// `None` if the density has no positive finite mass on the grid.
    pub fn normalised(&self) -> Option<Vec<FloatValue>> {
        let total: FloatValue = self.density.iter().sum();
        if total.is_finite() && total > 0.0 {
            Some(self.density.iter().map(|d| d / total).collect())
        } else {
            None
        }
    }
}

/// `n` equally spaced points from `from` to `to` inclusive.
///
/// # Panics
///
/// Panics if `n < 2`.
pub fn linspace(from: FloatValue, to: FloatValue, n: usize) -> Vec<FloatValue> {
    assert!(n >= 2, "A grid needs at least two points");
    let step = (to - from) / (n - 1) as FloatValue;
    (0..n).map(|i| from + step * i as FloatValue).collect()
}

/// Grid over the union of the ranges of `a` and `b`.
///
/// `None` if both samples are empty, the union has no extent or `n_bins < 2`.
pub fn shared_grid(
    a: &[FloatValue],
    b: &[FloatValue],
    n_bins: usize,
) -> Option<Vec<FloatValue>> {
    let (lo, hi) = stats::finite_range(a.iter().chain(b.iter()))?;
    if hi <= lo || n_bins < 2 {
        return None;
    }
    Some(linspace(lo, hi, n_bins))
}

/// Kernel density estimate of `sample` at the points of `grid`.
pub fn estimate(
    sample: &[FloatValue],
    grid: &[FloatValue],
    config: &DensityConfig,
) -> DensityEstimate {
    let h = config.bandwidth.select(sample);
    let n = sample.len() as FloatValue;
    let density = grid
        .iter()
        .map(|&x| {
            if !(h.is_finite() && h > 0.0) {
                return FloatValue::NAN;
            }
            sample
                .iter()
                .map(|&xi| config.kernel.evaluate(x - xi, h))
                .sum::<FloatValue>()
                / n
        })
        .collect();
    DensityEstimate {
        grid: grid.to_vec(),
        density,
        bandwidth: h,
    }
}
