//! Spatiotemporal aggregation to trend, variability and SNR rasters.
//!
//! The signal-to-noise ratio of a warming trend is
//!
//! $$SNR = \frac{|\overline{trend}|}{\overline{variability}}$$
//!
//! per grid cell, where the bars denote averages over the selected periods
//! (paleo) or the fitted trend and residual variability of a layer stack
//! (future scenarios).

use crate::errors::{SnrError, SnrResult};
use crate::raster::{Raster, RasterStack};
use crate::trend::{detrended_variability, linear_trend};
use crate::FloatValue;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Trend and variability fields for one reference period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodLayer {
    pub label: String,
    pub trend: Raster,
    pub variability: Raster,
}

impl PeriodLayer {
    pub fn new(label: &str, trend: Raster, variability: Raster) -> SnrResult<Self> {
        trend.geometry().ensure_matches(variability.geometry())?;
        Ok(Self {
            label: label.to_string(),
            trend,
            variability,
        })
    }
}

/// Per-cell trend, variability and SNR for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnrRasters {
    pub trend: Raster,
    pub variability: Raster,
    pub snr: Raster,
}

/// Signal-to-noise ratio of a single cell. NaN if the noise is zero or missing.
pub fn signal_to_noise(trend: FloatValue, variability: FloatValue) -> FloatValue {
    if !trend.is_finite() || !variability.is_finite() || variability == 0.0 {
        return FloatValue::NAN;
    }
    trend.abs() / variability
}

impl SnrRasters {
    /// Derive the SNR raster from a trend and variability raster.
    pub fn from_components(trend: Raster, variability: Raster) -> SnrResult<Self> {
        let snr = trend.zip_with(&variability, signal_to_noise)?;
        Ok(Self {
            trend,
            variability,
            snr,
        })
    }
}

/// Cell-wise mean of rasters; a cell is NaN if it is missing in any raster.
pub fn mean_rasters(rasters: &[&Raster]) -> SnrResult<Raster> {
    let first = rasters.first().ok_or(SnrError::EmptySelection)?;
    let geometry = first.geometry().clone();
    let mut sum = Array2::<FloatValue>::zeros(geometry.shape());
    for raster in rasters {
        geometry.ensure_matches(raster.geometry())?;
        Zip::from(&mut sum)
            .and(raster.values())
            .for_each(|acc, &v| *acc += v);
    }
    let n = rasters.len() as FloatValue;
    Raster::new(geometry, sum.mapv(|v| v / n))
}

/// Average the trend and variability layers of the `selected` periods and
/// derive the SNR raster.
///
/// # Errors
///
/// * [`SnrError::EmptySelection`] if `selected` is empty
/// * [`SnrError::UnknownPeriod`] if a label has no layer
/// * [`SnrError::GeometryMismatch`] if layers are on different grids
pub fn aggregate_periods(layers: &[PeriodLayer], selected: &[String]) -> SnrResult<SnrRasters> {
    if selected.is_empty() {
        return Err(SnrError::EmptySelection);
    }
    let chosen = selected
        .iter()
        .map(|label| {
            layers
                .iter()
                .find(|layer| &layer.label == label)
                .ok_or_else(|| SnrError::UnknownPeriod(label.clone()))
        })
        .collect::<SnrResult<Vec<_>>>()?;

    debug!(periods = ?selected, "Aggregating period layers");

    let trends: Vec<&Raster> = chosen.iter().map(|l| &l.trend).collect();
    let variabilities: Vec<&Raster> = chosen.iter().map(|l| &l.variability).collect();
    SnrRasters::from_components(mean_rasters(&trends)?, mean_rasters(&variabilities)?)
}

/// Fit the per-cell trend and residual variability of a layer stack and
/// derive the SNR raster.
pub fn snr_from_stack(stack: &RasterStack, times: &[FloatValue]) -> SnrResult<SnrRasters> {
    let trend = linear_trend(stack, times)?;
    let variability = detrended_variability(stack, times)?;
    SnrRasters::from_components(trend, variability)
}
