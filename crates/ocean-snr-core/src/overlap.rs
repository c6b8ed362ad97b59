//! Distributional overlap between paleo and future SNR samples.
//!
//! For each region the paleo SNR sample is compared with the SNR sample of
//! every future scenario:
//!
//! 1. Kernel densities of both samples are evaluated on a shared grid spanning
//!    the union of their ranges and normalised to sum to one.
//! 2. The overlap coefficient is $\sum_k \min(p_A(x_k), p_B(x_k))$, which lies in
//!    [0, 1]: one for identical distributions, zero for disjoint ones.
//! 3. A two-sample Kolmogorov-Smirnov test is run on the raw samples.
//!
//! After all regions are processed the KS p-values are adjusted jointly for
//! multiple comparisons.

use crate::adjust::{adjust_p_values, significance_marker, AdjustMethod};
use crate::density::{estimate, shared_grid, DensityConfig};
use crate::ks::ks_two_sample;
use crate::sample::{group_by_region, RegionLabel, SampleCollection};
use crate::stats::{finite_values, has_zero_variance};
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Parameters of the overlap analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapParameters {
    pub density: DensityConfig,

    /// Regions with fewer valid cells than this in any scenario are skipped.
    ///
    /// Default: 10
    pub min_cells: usize,

    /// Default: Benjamini-Yekutieli
    pub adjust_method: AdjustMethod,

    /// Significance level applied to adjusted p-values.
    ///
    /// Default: 0.05
    pub alpha: FloatValue,
}

impl Default for OverlapParameters {
    fn default() -> Self {
        Self {
            density: DensityConfig::default(),
            min_cells: 10,
            adjust_method: AdjustMethod::default(),
            alpha: DEFAULT_ALPHA,
        }
    }
}

/// Overlap and KS test between two scenarios in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapRecord {
    pub region: RegionLabel,
    pub scenario_a: String,
    pub scenario_b: String,
    pub n_a: usize,
    pub n_b: usize,
    /// `None` when either sample is empty or has no variance
    pub overlap: Option<FloatValue>,
    pub ks_statistic: FloatValue,
    pub p_value: FloatValue,
    pub p_adjusted: FloatValue,
    pub significant: bool,
    pub marker: String,
}

/// Overlap coefficient of the kernel densities of the finite values of `a`
/// and `b`.
///
/// `None` if either sample is empty or has zero variance, or if a density
/// has no positive mass on the shared grid.
pub fn overlap_coefficient(
    a: &[FloatValue],
    b: &[FloatValue],
    config: &DensityConfig,
) -> Option<FloatValue> {
    let a = finite_values(a);
    let b = finite_values(b);
    if a.is_empty() || b.is_empty() || has_zero_variance(&a) || has_zero_variance(&b) {
        return None;
    }
    let grid = shared_grid(&a, &b, config.n_bins)?;
    let pa = estimate(&a, &grid, config).normalised()?;
    let pb = estimate(&b, &grid, config).normalised()?;
    let ov: FloatValue = pa.iter().zip(&pb).map(|(x, y)| x.min(*y)).sum();
    Some(ov.clamp(0.0, 1.0))
}

/// Significance level used until p-values are adjusted.
pub const DEFAULT_ALPHA: FloatValue = 0.05;

/// Compare two samples. The p-value is not yet adjusted and the marker uses
/// [`DEFAULT_ALPHA`].
pub fn compare_samples(
    a: &SampleCollection,
    b: &SampleCollection,
    config: &DensityConfig,
) -> OverlapRecord {
    let overlap = overlap_coefficient(&a.values, &b.values, config);
    let ks = ks_two_sample(&a.values, &b.values);
    debug!(
        region = %a.region.name,
        scenario_a = %a.scenario,
        scenario_b = %b.scenario,
        overlap = ?overlap,
        d = ks.statistic,
        p = ks.p_value,
        "Compared samples"
    );
    OverlapRecord {
        region: a.region.clone(),
        scenario_a: a.scenario.clone(),
        scenario_b: b.scenario.clone(),
        n_a: a.len(),
        n_b: b.len(),
        overlap,
        ks_statistic: ks.statistic,
        p_value: ks.p_value,
        p_adjusted: ks.p_value,
        significant: false,
        marker: significance_marker(ks.p_value, DEFAULT_ALPHA).to_string(),
    }
}

/// Apply the multiple-comparison correction across all `records`.
pub fn apply_adjustment(records: &mut [OverlapRecord], method: AdjustMethod, alpha: FloatValue) {
    let raw: Vec<FloatValue> = records.iter().map(|r| r.p_value).collect();
    let adjusted = adjust_p_values(&raw, method);
    for (record, p) in records.iter_mut().zip(adjusted) {
        record.p_adjusted = p;
        record.significant = p < alpha;
        record.marker = significance_marker(p, alpha).to_string();
    }
}

/// Compare the `reference` scenario with every other scenario in each region.
///
/// Regions below `min_cells` are skipped. p-values are adjusted jointly across
/// all region x scenario results.
pub fn compare_regions(
    collections: &[SampleCollection],
    reference: &str,
    parameters: &OverlapParameters,
) -> Vec<OverlapRecord> {
    let grouped = group_by_region(collections, parameters.min_cells);
    let mut records = Vec::new();
    for (region, members) in &grouped {
        let Some(base) = members.iter().find(|c| c.scenario == reference) else {
            info!(region = %region.name, reference, "Reference scenario missing in region");
            continue;
        };
        for other in members.iter().filter(|c| c.scenario != reference) {
            records.push(compare_samples(base, other, &parameters.density));
        }
    }
    apply_adjustment(&mut records, parameters.adjust_method, parameters.alpha);
    info!(
        regions = grouped.len(),
        comparisons = records.len(),
        significant = records.iter().filter(|r| r.significant).count(),
        "Overlap analysis complete"
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::Bandwidth;
    use approx::assert_relative_eq;

    fn spread(centre: f64, width: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| centre - width / 2.0 + width * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn identical_samples_overlap_fully() {
        let a = spread(0.4, 0.2, 30);
        let ov = overlap_coefficient(&a, &a, &DensityConfig::default()).unwrap();
        assert_relative_eq!(ov, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn disjoint_samples_do_not_overlap() {
        let a = spread(0.2, 0.1, 40);
        let b = spread(0.6, 0.1, 40);
        let ov = overlap_coefficient(&a, &b, &DensityConfig::default()).unwrap();
        assert!(ov < 0.01, "overlap was {}", ov);
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = vec![0.1, 0.3, 0.35, 0.5, 0.52, 0.7];
        let b = vec![0.4, 0.45, 0.6, 0.8, 0.9];
        let config = DensityConfig::default();
        let ab = overlap_coefficient(&a, &b, &config).unwrap();
        let ba = overlap_coefficient(&b, &a, &config).unwrap();
        assert_relative_eq!(ab, ba, epsilon = 1e-12);
        assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn degenerate_samples_are_na() {
        let config = DensityConfig::default();
        assert!(overlap_coefficient(&[], &[1.0, 2.0], &config).is_none());
        assert!(overlap_coefficient(&[1.0, 1.0, 1.0], &[1.0, 2.0], &config).is_none());
        assert!(overlap_coefficient(&[0.5], &[1.0, 2.0], &config).is_none());
    }

    #[test]
    fn unusable_density_settings_are_na() {
        let a = spread(0.4, 0.2, 30);
        let one_bin = DensityConfig {
            n_bins: 1,
            ..Default::default()
        };
        assert!(overlap_coefficient(&a, &a, &one_bin).is_none());
        let zero_bandwidth = DensityConfig {
            bandwidth: Bandwidth::Fixed(0.0),
            ..Default::default()
        };
        assert!(overlap_coefficient(&a, &a, &zero_bandwidth).is_none());
    }

    #[test]
    fn missing_values_are_ignored() {
        let a = spread(0.4, 0.2, 30);
        let mut with_gaps = a.clone();
        with_gaps.push(f64::NAN);
        with_gaps.insert(0, f64::NAN);
        let config = DensityConfig::default();
        let ov = overlap_coefficient(&with_gaps, &a, &config).unwrap();
        assert_relative_eq!(ov, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn markers_follow_configured_alpha() {
        let region = RegionLabel::new(1, "Tropical Atlantic");
        let a = SampleCollection::new("paleo", region.clone(), spread(0.2, 0.1, 20), 20);
        let b = SampleCollection::new("rcp85", region, spread(0.7, 0.1, 20), 20);
        let mut records = vec![compare_samples(&a, &b, &DensityConfig::default())];
        let p = records[0].p_value;
        // Exact p for disjoint 20 vs 20 samples is far below 0.001
        apply_adjustment(&mut records, AdjustMethod::None, p / 2.0);
        assert!(!records[0].significant);
        assert_eq!(records[0].marker, "ns");
        apply_adjustment(&mut records, AdjustMethod::None, 0.05);
        assert!(records[0].significant);
        assert_eq!(records[0].marker, "***");
    }

    #[test]
    fn regions_are_compared_against_reference() {
        let region = RegionLabel::new(1, "Tropical Atlantic");
        let small = RegionLabel::new(2, "Tiny");
        let collections = vec![
            SampleCollection::new("paleo", region.clone(), spread(0.2, 0.1, 20), 25),
            SampleCollection::new("rcp26", region.clone(), spread(0.25, 0.1, 20), 25),
            SampleCollection::new("rcp85", region.clone(), spread(0.7, 0.1, 20), 25),
            SampleCollection::new("paleo", small.clone(), spread(0.2, 0.1, 3), 3),
            SampleCollection::new("rcp85", small, spread(0.7, 0.1, 3), 3),
        ];
        let records = compare_regions(&collections, "paleo", &OverlapParameters::default());
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.region == region));
        assert!(records.iter().all(|r| r.scenario_a == "paleo"));

        let rcp85 = records.iter().find(|r| r.scenario_b == "rcp85").unwrap();
        let rcp26 = records.iter().find(|r| r.scenario_b == "rcp26").unwrap();
        assert!(rcp85.overlap.unwrap() < rcp26.overlap.unwrap());
        assert_eq!(rcp85.ks_statistic, 1.0);
        assert!(rcp85.significant);
        assert!(rcp85.p_adjusted >= rcp85.p_value);
    }
}
