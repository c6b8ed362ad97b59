//! Counting future conditions beyond the range of past conditions.
//!
//! For a band of reference quantiles (by default the 90th to the 100th
//! percentile in steps of one) the number of comparison values at or above
//! the reference threshold is reported. Using a band rather than a single
//! cutoff shows how sensitive the result is to the choice of threshold.

use crate::errors::{SnrError, SnrResult};
use crate::sample::{group_by_region, RegionLabel, SampleCollection};
use crate::stats::{finite_values, quantile_sorted, sorted};
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Extreme-condition parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtremeParameters {
    /// Quantile levels of the reference sample used as thresholds.
    ///
    /// Default: 0.90, 0.91, ..., 1.00
    pub quantiles: Vec<FloatValue>,

    /// Regions with fewer valid cells than this in any scenario are skipped.
    ///
    /// Default: 10
    pub min_cells: usize,
}

impl Default for ExtremeParameters {
    fn default() -> Self {
        Self {
            quantiles: quantile_band(0.90, 1.00, 0.01),
            min_cells: 10,
        }
    }
}

/// Evenly spaced quantile levels from `from` to `to` inclusive.
///
/// Empty if `step` is not a positive finite number or `to < from`.
pub fn quantile_band(from: FloatValue, to: FloatValue, step: FloatValue) -> Vec<FloatValue> {
    if !(step.is_finite() && step > 0.0 && from.is_finite() && to.is_finite()) || to < from {
        return Vec::new();
    }
    let n = ((to - from) / step).round() as usize;
    (0..=n)
        .map(|i| {
            // Snap levels onto a 1e-9 lattice
            ((from + step * i as FloatValue) * 1e9).round() / 1e9
        })
        .collect()
}

/// Exceedance count at one quantile level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeCount {
    pub quantile: FloatValue,
    /// Reference value at this quantile
    pub threshold: FloatValue,
    pub count: usize,
    /// Percentage of the comparison sample at or above the threshold
    pub pct_of_comparison: FloatValue,
    /// Percentage of all regional cells at or above the threshold
    pub pct_of_region: FloatValue,
}

/// Exceedance counts of one scenario in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeRecord {
    pub region: RegionLabel,
    pub reference: String,
    pub scenario: String,
    pub counts: Vec<ExtremeCount>,
}

fn percentage(count: usize, total: usize) -> FloatValue {
    if total == 0 {
        FloatValue::NAN
    } else {
        100.0 * count as FloatValue / total as FloatValue
    }
}

/// Count comparison values at or above each reference quantile.
///
/// # Errors
///
/// * [`SnrError::EmptySample`] if the reference has no finite values
/// * [`SnrError::InvalidQuantile`] if a level lies outside [0, 1]
pub fn count_extremes(
    reference: &[FloatValue],
    comparison: &[FloatValue],
    quantiles: &[FloatValue],
    region_cells: usize,
) -> SnrResult<Vec<ExtremeCount>> {
    let reference = sorted(&finite_values(reference));
    if reference.is_empty() {
        return Err(SnrError::EmptySample("reference sample".to_string()));
    }
    let comparison = finite_values(comparison);

    quantiles
        .iter()
        .map(|&q| {
            if !(0.0..=1.0).contains(&q) {
                return Err(SnrError::InvalidQuantile(q));
            }
            let threshold = quantile_sorted(&reference, q);
            let count = comparison.iter().filter(|&&v| v >= threshold).count();
            Ok(ExtremeCount {
                quantile: q,
                threshold,
                count,
                pct_of_comparison: percentage(count, comparison.len()),
                pct_of_region: percentage(count, region_cells),
            })
        })
        .collect()
}

/// Count extremes of every non-reference scenario against the reference in
/// each region with enough cells.
pub fn count_regional_extremes(
    collections: &[SampleCollection],
    reference: &str,
    parameters: &ExtremeParameters,
) -> SnrResult<Vec<ExtremeRecord>> {
    let grouped = group_by_region(collections, parameters.min_cells);
    let mut records = Vec::new();
    for (region, members) in &grouped {
        let Some(base) = members.iter().find(|c| c.scenario == reference) else {
            warn!(region = %region.name, reference, "Reference scenario missing in region");
            continue;
        };
        for other in members.iter().filter(|c| c.scenario != reference) {
            let counts = count_extremes(
                &base.values,
                &other.values,
                &parameters.quantiles,
                other.region_cells,
            )?;
            records.push(ExtremeRecord {
                region: region.clone(),
                reference: reference.to_string(),
                scenario: other.scenario.clone(),
                counts,
            });
        }
    }
    info!(records = records.len(), "Extreme-condition counts complete");
    Ok(records)
}
