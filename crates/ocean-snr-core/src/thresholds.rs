//! Warming-rate threshold extraction and period selection.
//!
//! A reference record of warming segments (time windows with an associated
//! warming rate) is filtered against a threshold derived from a control
//! distribution, typically its 95th percentile.

use crate::errors::{SnrError, SnrResult};
use crate::stats;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A time window of the reference record with its warming rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmingSegment {
    pub label: String,
    /// Start of the window (age or calendar time, in the record's units)
    pub start: FloatValue,
    pub end: FloatValue,
    /// Warming rate over the window (e.g. °C per kyr)
    pub rate: FloatValue,
}

impl WarmingSegment {
    pub fn new(label: &str, start: FloatValue, end: FloatValue, rate: FloatValue) -> Self {
        Self {
            label: label.to_string(),
            start,
            end,
            rate,
        }
    }

    pub fn duration(&self) -> FloatValue {
        (self.end - self.start).abs()
    }
}

/// Threshold parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParameters {
    /// Quantile of the control distribution used as the threshold.
    ///
    /// Default: 0.95
    pub quantile: FloatValue,

    /// Compare `|rate|` instead of `rate`, so strong cooling also qualifies.
    ///
    /// Default: false
    pub use_absolute_rate: bool,
}

impl Default for ThresholdParameters {
    fn default() -> Self {
        Self {
            quantile: 0.95,
            use_absolute_rate: false,
        }
    }
}

/// Result of a threshold-based selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSelection {
    pub threshold: FloatValue,
    pub selected: Vec<WarmingSegment>,
}

impl PeriodSelection {
    pub fn labels(&self) -> Vec<String> {
        self.selected.iter().map(|s| s.label.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Derive the warming-rate threshold as the `quantile` of a control distribution.
///
/// Non-finite control values are ignored.
pub fn warming_threshold(control: &[FloatValue], quantile: FloatValue) -> SnrResult<FloatValue> {
    if control.iter().all(|v| !v.is_finite()) {
        return Err(SnrError::EmptySample("control distribution".to_string()));
    }
    stats::quantile(control, quantile)
}

/// Keep the segments whose rate meets or exceeds `threshold`, in input order.
pub fn select_periods(segments: &[WarmingSegment], threshold: FloatValue) -> Vec<WarmingSegment> {
    filter_segments(segments, threshold, |s| s.rate)
}

/// Like [`select_periods`] but compares the magnitude of the rate.
pub fn select_periods_by_magnitude(
    segments: &[WarmingSegment],
    threshold: FloatValue,
) -> Vec<WarmingSegment> {
    filter_segments(segments, threshold, |s| s.rate.abs())
}

fn filter_segments<F>(
    segments: &[WarmingSegment],
    threshold: FloatValue,
    key: F,
) -> Vec<WarmingSegment>
where
    F: Fn(&WarmingSegment) -> FloatValue,
{
    let selected: Vec<WarmingSegment> = segments
        .iter()
        .filter(|s| key(s) >= threshold)
        .cloned()
        .collect();
    if selected.is_empty() {
        warn!(
            threshold,
            n_segments = segments.len(),
            "No warming segment reaches the threshold"
        );
    }
    selected
}

/// Compute the threshold from `control` and select matching segments.
pub fn select_extreme_periods(
    segments: &[WarmingSegment],
    control: &[FloatValue],
    parameters: &ThresholdParameters,
) -> SnrResult<PeriodSelection> {
    let threshold = warming_threshold(control, parameters.quantile)?;
    let selected = if parameters.use_absolute_rate {
        select_periods_by_magnitude(segments, threshold)
    } else {
        select_periods(segments, threshold)
    };
    info!(
        threshold,
        quantile = parameters.quantile,
        selected = selected.len(),
        total = segments.len(),
        "Selected warming periods"
    );
    Ok(PeriodSelection {
        threshold,
        selected,
    })
}
