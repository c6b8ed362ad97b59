//! Min-max rescaling of scenario stacks to [0, 1].
//!
//! Cross-scenario comparisons are only meaningful on a common scale, so the
//! minimum and maximum are always taken over the combined stack of every
//! scenario being compared, never per raster.

use crate::errors::{SnrError, SnrResult};
use crate::raster::Raster;
use crate::stats::finite_range;
use crate::FloatValue;
use tracing::warn;

/// Observed range used to rescale a stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRange {
    pub min: FloatValue,
    pub max: FloatValue,
}

impl ScaleRange {
    /// Map `v` into [0, 1]. NaN for missing values or a degenerate range.
    pub fn apply(&self, v: FloatValue) -> FloatValue {
        let span = self.max - self.min;
        if !v.is_finite() || span <= 0.0 {
            return FloatValue::NAN;
        }
        (v - self.min) / span
    }
}

/// Range of the finite cells across all `rasters`.
pub fn combined_range(rasters: &[Raster]) -> SnrResult<ScaleRange> {
    let (min, max) = finite_range(rasters.iter().flat_map(|r| r.values().into_iter()))
        .ok_or_else(|| SnrError::EmptySample("raster stack to rescale".to_string()))?;
    Ok(ScaleRange { min, max })
}

/// Rescale every raster with the min/max of the combined stack.
///
/// A degenerate stack (all finite cells equal) maps to NaN everywhere.
pub fn rescale_combined(rasters: &[Raster]) -> SnrResult<Vec<Raster>> {
    let range = combined_range(rasters)?;
    if range.max == range.min {
        warn!(
            value = range.min,
            "All cells share one value; rescaled stack is undefined"
        );
    }
    Ok(rasters.iter().map(|r| r.map(|v| range.apply(v))).collect())
}

/// Rescale plain samples with the min/max of all samples combined.
pub fn rescale_samples(samples: &[Vec<FloatValue>]) -> SnrResult<Vec<Vec<FloatValue>>> {
    let (min, max) = finite_range(samples.iter().flatten())
        .ok_or_else(|| SnrError::EmptySample("samples to rescale".to_string()))?;
    let range = ScaleRange { min, max };
    Ok(samples
        .iter()
        .map(|s| s.iter().map(|&v| range.apply(v)).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridGeometry;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn combined_min_max_maps_to_unit_interval() {
        let g = GridGeometry::new(2, 1, 0.0, 0.0, 1.0);
        let a = Raster::new(g.clone(), array![[1.0, 3.0]]).unwrap();
        let b = Raster::new(g, array![[5.0, f64::NAN]]).unwrap();
        let out = rescale_combined(&[a, b]).unwrap();
        assert_relative_eq!(out[0].get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(out[0].get(0, 1).unwrap(), 0.5);
        assert_relative_eq!(out[1].get(0, 0).unwrap(), 1.0);
        assert!(out[1].get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn rescaling_uses_the_whole_stack() {
        // Scaling each raster on its own would map both to [0, 1].
        let g = GridGeometry::new(2, 1, 0.0, 0.0, 1.0);
        let low = Raster::new(g.clone(), array![[0.0, 1.0]]).unwrap();
        let high = Raster::new(g, array![[9.0, 10.0]]).unwrap();
        let out = rescale_combined(&[low, high]).unwrap();
        assert_relative_eq!(out[0].get(0, 1).unwrap(), 0.1);
        assert_relative_eq!(out[1].get(0, 0).unwrap(), 0.9);
    }

    #[test]
    fn degenerate_range_is_nan() {
        let g = GridGeometry::new(2, 1, 0.0, 0.0, 1.0);
        let a = Raster::filled(g, 2.0);
        let out = rescale_combined(&[a]).unwrap();
        assert_eq!(out[0].n_finite(), 0);
    }

    #[test]
    fn all_missing_is_error() {
        let g = GridGeometry::new(2, 1, 0.0, 0.0, 1.0);
        assert!(matches!(
            rescale_combined(&[Raster::empty(g)]),
            Err(SnrError::EmptySample(_))
        ));
    }

    #[test]
    fn samples_rescale() {
        let out = rescale_samples(&[vec![2.0, 4.0], vec![6.0]]).unwrap();
        assert_eq!(out, vec![vec![0.0, 0.5], vec![1.0]]);
    }
}
