//! Invariants of the statistical building blocks.
//!
//! Samples are generated with a small linear congruential generator so the
//! tests are deterministic.

use approx::assert_relative_eq;
use is_close::is_close;
use ndarray::array;
use ocean_snr_core::adjust::{adjust_p_values, AdjustMethod};
use ocean_snr_core::density::{Bandwidth, DensityConfig, Kernel};
use ocean_snr_core::extremes::{count_extremes, quantile_band};
use ocean_snr_core::ks::ks_two_sample;
use ocean_snr_core::normalise::rescale_combined;
use ocean_snr_core::overlap::overlap_coefficient;
use ocean_snr_core::{GridGeometry, Raster};

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn sample(&mut self, n: usize, offset: f64, scale: f64) -> Vec<f64> {
        (0..n).map(|_| offset + scale * self.next()).collect()
    }
}

fn configs() -> Vec<DensityConfig> {
    vec![
        DensityConfig::default(),
        DensityConfig {
            kernel: Kernel::Epanechnikov,
            bandwidth: Bandwidth::Scott,
            n_bins: 512,
        },
    ]
}

mod overlap_properties {
    use super::*;

    #[test]
    fn test_overlap_bounded_and_symmetric() {
        let mut rng = Lcg(7);
        for config in configs() {
            for shift in [0.0, 0.1, 0.3, 0.8] {
                let a = rng.sample(40, 0.0, 0.5);
                let b = rng.sample(35, shift, 0.5);
                let ab = overlap_coefficient(&a, &b, &config).unwrap();
                let ba = overlap_coefficient(&b, &a, &config).unwrap();
                assert!((0.0..=1.0).contains(&ab), "overlap {} out of range", ab);
                assert_relative_eq!(ab, ba, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_self_overlap_is_one() {
        let mut rng = Lcg(11);
        let a = rng.sample(50, 0.2, 0.3);
        for config in configs() {
            let ov = overlap_coefficient(&a, &a, &config).unwrap();
            assert!(is_close!(ov, 1.0), "Expected 1.0, got {}", ov);
        }
    }

    #[test]
    fn test_separated_samples_barely_overlap() {
        let mut rng = Lcg(3);
        let a = rng.sample(60, 0.0, 0.2);
        let config = DensityConfig::default();
        let shifted = |s: f64| -> Vec<f64> { a.iter().map(|v| v + s).collect() };
        let near = overlap_coefficient(&a, &shifted(0.02), &config).unwrap();
        let far = overlap_coefficient(&a, &shifted(0.4), &config).unwrap();
        assert!(near > far);
        assert!(far < 0.05, "overlap was {}", far);
    }
}

mod ks_properties {
    use super::*;

    #[test]
    fn test_statistic_and_p_value_in_unit_interval() {
        let mut rng = Lcg(42);
        for (m, n) in [(5, 7), (30, 40), (120, 150)] {
            let a = rng.sample(m, 0.0, 1.0);
            let b = rng.sample(n, 0.2, 1.0);
            let ab = ks_two_sample(&a, &b);
            let ba = ks_two_sample(&b, &a);
            assert!((0.0..=1.0).contains(&ab.statistic));
            assert!((0.0..=1.0).contains(&ab.p_value));
            assert_relative_eq!(ab.statistic, ba.statistic, epsilon = 1e-12);
            assert_relative_eq!(ab.p_value, ba.p_value, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_identical_samples_not_rejected() {
        let mut rng = Lcg(5);
        let a = rng.sample(25, 0.0, 1.0);
        let res = ks_two_sample(&a, &a);
        assert_eq!(res.statistic, 0.0);
        assert!(is_close!(res.p_value, 1.0));
    }
}

mod adjustment_properties {
    use super::*;

    #[test]
    fn test_adjusted_never_below_raw() {
        let mut rng = Lcg(99);
        let raw = rng.sample(25, 0.0, 0.2);
        for method in [
            AdjustMethod::BenjaminiYekutieli,
            AdjustMethod::BenjaminiHochberg,
            AdjustMethod::Holm,
            AdjustMethod::Bonferroni,
            AdjustMethod::None,
        ] {
            let adjusted = adjust_p_values(&raw, method);
            assert_eq!(adjusted.len(), raw.len());
            for (p, q) in raw.iter().zip(&adjusted) {
                assert!(q >= p, "{:?}: {} < {}", method, q, p);
                assert!(*q <= 1.0);
            }
        }
    }

    #[test]
    fn test_yekutieli_most_conservative_of_fdr_methods() {
        let raw = [0.001, 0.01, 0.02, 0.03, 0.2];
        let by = adjust_p_values(&raw, AdjustMethod::BenjaminiYekutieli);
        let bh = adjust_p_values(&raw, AdjustMethod::BenjaminiHochberg);
        for (y, h) in by.iter().zip(&bh) {
            assert!(y >= h);
        }
    }
}

mod extremes_properties {
    use super::*;

    #[test]
    fn test_count_never_exceeds_comparison() {
        let mut rng = Lcg(17);
        let reference = rng.sample(40, 0.0, 0.5);
        let comparison = rng.sample(30, 0.3, 0.7);
        let levels = quantile_band(0.90, 1.00, 0.01);
        let counts = count_extremes(&reference, &comparison, &levels, 50).unwrap();
        let mut previous = usize::MAX;
        for c in &counts {
            assert!(c.count <= comparison.len());
            assert!(c.pct_of_region <= c.pct_of_comparison);
            // Thresholds rise with the level, so counts cannot grow
            assert!(c.count <= previous);
            previous = c.count;
        }
    }
}

mod rescale_properties {
    use super::*;

    #[test]
    fn test_combined_stack_spans_unit_interval() {
        let geometry = GridGeometry::new(3, 1, 0.0, 0.0, 1.0);
        let a = Raster::new(geometry.clone(), array![[2.0, 4.0, f64::NAN]]).unwrap();
        let b = Raster::new(geometry, array![[6.0, 3.0, 10.0]]).unwrap();
        let rescaled = rescale_combined(&[a, b]).unwrap();

        let all: Vec<f64> = rescaled
            .iter()
            .flat_map(|r| r.iter_finite().map(|(_, _, v)| v).collect::<Vec<_>>())
            .collect();
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_relative_eq!(rescaled[0].get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(rescaled[1].get(0, 2).unwrap(), 1.0);
        assert_relative_eq!(rescaled[0].get(0, 1).unwrap(), 0.25);
        assert!(rescaled[0].get(0, 2).unwrap().is_nan());
    }
}
