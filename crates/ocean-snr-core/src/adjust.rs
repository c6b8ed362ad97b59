//! Multiple-comparison correction of p-values.
//!
//! The default, Benjamini-Yekutieli, controls the false discovery rate under
//! arbitrary dependence between tests. Overlapping regions and shared paleo
//! baselines make the tests in this analysis strongly dependent.

use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// p-value adjustment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustMethod {
    /// Benjamini & Yekutieli (2001)
    #[default]
    BenjaminiYekutieli,
    /// Benjamini & Hochberg (1995)
    BenjaminiHochberg,
    Holm,
    Bonferroni,
    None,
}

/// Adjust `p_values` for multiple comparisons.
///
/// NaN entries stay NaN and do not count toward the number of tests. Every
/// adjusted value is at least the raw value and at most one.
pub fn adjust_p_values(p_values: &[FloatValue], method: AdjustMethod) -> Vec<FloatValue> {
    let mut out = vec![FloatValue::NAN; p_values.len()];
    let valid: Vec<(usize, FloatValue)> = p_values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, p)| !p.is_nan())
        .collect();
    let n = valid.len();
    if n == 0 {
        return out;
    }
    let nf = n as FloatValue;

    match method {
        AdjustMethod::None => {
            for (idx, p) in valid {
                out[idx] = p;
            }
        }
        AdjustMethod::Bonferroni => {
            for (idx, p) in valid {
                out[idx] = (nf * p).min(1.0);
            }
        }
        AdjustMethod::Holm => {
            // Ascending order, running maximum of (n - i + 1) * p
            let mut order = valid;
            order.sort_by(|a, b| a.1.total_cmp(&b.1));
            let mut running: FloatValue = 0.0;
            for (i, (idx, p)) in order.into_iter().enumerate() {
                running = running.max((nf - i as FloatValue) * p);
                out[idx] = running.min(1.0);
            }
        }
        AdjustMethod::BenjaminiHochberg | AdjustMethod::BenjaminiYekutieli => {
            let harmonic = if method == AdjustMethod::BenjaminiYekutieli {
                (1..=n).map(|i| 1.0 / i as FloatValue).sum()
            } else {
                1.0
            };
            // Descending order, running minimum of c(n) * n / rank * p
            let mut order = valid;
            order.sort_by(|a, b| b.1.total_cmp(&a.1));
            let mut running = FloatValue::INFINITY;
            for (i, (idx, p)) in order.into_iter().enumerate() {
                let rank = (n - i) as FloatValue;
                running = running.min(harmonic * nf / rank * p);
                out[idx] = running.min(1.0);
            }
        }
    }
    out
}

/// Significance marker for an (adjusted) p-value.
///
/// Values at or above `alpha` are `ns`. Below it the stars follow the
/// usual 0.001 / 0.01 cuts, so with the default `alpha = 0.05` the markers
/// are `***`, `**`, `*` and `ns`.
pub fn significance_marker(p: FloatValue, alpha: FloatValue) -> &'static str {
    if p.is_nan() {
        "NA"
    } else if p >= alpha {
        "ns"
    } else if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else {
        "*"
    }
}
