//! Two-sample Kolmogorov-Smirnov test.
//!
//! The statistic is the largest absolute difference between the two empirical
//! distribution functions. The two-sided p-value is exact for small samples
//! without ties (Smirnov's recursion) and asymptotic otherwise.

use crate::stats::{finite_values, sorted};
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Product of sample sizes below which the exact distribution is used.
pub const EXACT_LIMIT: usize = 10_000;

/// How the p-value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KsMethod {
    Exact,
    Asymptotic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsResult {
    pub statistic: FloatValue,
    pub p_value: FloatValue,
    pub method: KsMethod,
}

impl KsResult {
    fn undefined() -> Self {
        Self {
            statistic: FloatValue::NAN,
            p_value: FloatValue::NAN,
            method: KsMethod::Asymptotic,
        }
    }
}

/// Two-sided two-sample KS test on the finite values of `a` and `b`.
///
/// Statistic and p-value are NaN if either sample is empty.
pub fn ks_two_sample(a: &[FloatValue], b: &[FloatValue]) -> KsResult {
    let x = sorted(&finite_values(a));
    let y = sorted(&finite_values(b));
    let (m, n) = (x.len(), y.len());
    if m == 0 || n == 0 {
        return KsResult::undefined();
    }

    let statistic = ks_statistic(&x, &y);
    let exact = m * n < EXACT_LIMIT && !has_ties(&x, &y);
    let p_value = if exact {
        1.0 - psmirnov_exact(statistic, m, n)
    } else {
        let en = ((m * n) as FloatValue / (m + n) as FloatValue).sqrt();
        1.0 - kolmogorov_cdf(en * statistic)
    };

    KsResult {
        statistic,
        p_value: p_value.clamp(0.0, 1.0),
        method: if exact {
            KsMethod::Exact
        } else {
            KsMethod::Asymptotic
        },
    }
}

/// `sup |F_x - F_y|` for sorted samples.
fn ks_statistic(x: &[FloatValue], y: &[FloatValue]) -> FloatValue {
    let (m, n) = (x.len() as FloatValue, y.len() as FloatValue);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: FloatValue = 0.0;
    while i < x.len() && j < y.len() {
        let v = x[i].min(y[j]);
        while i < x.len() && x[i] <= v {
            i += 1;
        }
        while j < y.len() && y[j] <= v {
            j += 1;
        }
        d = d.max((i as FloatValue / m - j as FloatValue / n).abs());
    }
    d
}

/// Whether any value occurs more than once in the pooled sample.
fn has_ties(x: &[FloatValue], y: &[FloatValue]) -> bool {
    let pooled = sorted(&[x, y].concat());
    pooled.windows(2).any(|w| w[0] == w[1])
}

/// `P(D < d)` under the null hypothesis for sample sizes `m` and `n`.
fn psmirnov_exact(d: FloatValue, m: usize, n: usize) -> FloatValue {
    let (m, n) = if m > n { (n, m) } else { (m, n) };
    let md = m as FloatValue;
    let nd = n as FloatValue;
    // Snap onto the lattice of attainable values
    let q = (0.5 + (d * md * nd - 1e-7).floor()) / (md * nd);
    let mut u: Vec<FloatValue> = (0..=n)
        .map(|j| if j as FloatValue / nd > q { 0.0 } else { 1.0 })
        .collect();
    for i in 1..=m {
        let w = i as FloatValue / (i + n) as FloatValue;
        u[0] = if i as FloatValue / md > q { 0.0 } else { w * u[0] };
        for j in 1..=n {
            u[j] = if (i as FloatValue / md - j as FloatValue / nd).abs() > q {
                0.0
            } else {
                w * u[j] + u[j - 1]
            };
        }
    }
    u[n]
}

/// Limiting distribution of `sqrt(mn / (m + n)) * D`.
pub fn kolmogorov_cdf(x: FloatValue) -> FloatValue {
    const TOL: FloatValue = 1e-10;
    if x <= 0.0 {
        return 0.0;
    }
    if x < 1.0 {
        let z = -(PI_SQ / 8.0) / (x * x);
        let w = x.ln();
        let mut s = 0.0;
        let mut k = 1;
        while k < 2000 {
            let term = ((k * k) as FloatValue * z - w).exp();
            s += term;
            if term < TOL {
                break;
            }
            k += 2;
        }
        s * (2.0 * std::f64::consts::PI).sqrt()
    } else {
        let z = -2.0 * x * x;
        let mut s: FloatValue = -1.0;
        let mut k: i32 = 1;
        let mut old: FloatValue = 0.0;
        let mut new: FloatValue = 1.0;
        while (old - new).abs() > TOL && k < 1000 {
            old = new;
            new += 2.0 * s * ((k * k) as FloatValue * z).exp();
            s = -s;
            k += 1;
        }
        new
    }
}

const PI_SQ: FloatValue = std::f64::consts::PI * std::f64::consts::PI;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identical_samples() {
        let a = [0.1, 0.4, 0.2, 0.9];
        let res = ks_two_sample(&a, &a);
        assert_eq!(res.statistic, 0.0);
        assert_relative_eq!(res.p_value, 1.0);
        // Pooling a sample with itself creates ties
        assert_eq!(res.method, KsMethod::Asymptotic);
    }

    #[test]
    fn disjoint_small_samples_exact() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        let res = ks_two_sample(&a, &b);
        assert_eq!(res.statistic, 1.0);
        assert_eq!(res.method, KsMethod::Exact);
        // Two of the C(6, 3) = 20 orderings reach D = 1
        assert_relative_eq!(res.p_value, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn statistic_of_shifted_samples() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [3.5, 4.5, 5.5, 6.5];
        let res = ks_two_sample(&a, &b);
        // F_a(3) = 0.75, F_b(3) = 0 -> D = 0.75
        assert_relative_eq!(res.statistic, 0.75);
        assert!(res.p_value > 0.0 && res.p_value < 1.0);
    }

    #[test]
    fn symmetric_in_inputs() {
        let a = [0.3, 0.1, 0.7, 0.5, 0.45];
        let b = [0.6, 0.8, 0.65, 0.9];
        let ab = ks_two_sample(&a, &b);
        let ba = ks_two_sample(&b, &a);
        assert_relative_eq!(ab.statistic, ba.statistic);
        assert_relative_eq!(ab.p_value, ba.p_value, epsilon = 1e-12);
    }

    #[test]
    fn empty_sample_is_undefined() {
        let res = ks_two_sample(&[], &[1.0]);
        assert!(res.statistic.is_nan());
        assert!(res.p_value.is_nan());
    }

    #[test]
    fn kolmogorov_reference_values() {
        // Critical value of the limiting distribution at the 5% level
        assert_relative_eq!(kolmogorov_cdf(1.3581), 0.95, epsilon = 1e-4);
        assert_relative_eq!(kolmogorov_cdf(0.5), 0.036055, epsilon = 1e-5);
        assert_eq!(kolmogorov_cdf(0.0), 0.0);
        assert!(kolmogorov_cdf(5.0) > 0.999_999);
    }

    #[test]
    fn large_samples_use_asymptotic() {
        let a: Vec<f64> = (0..200).map(|i| i as f64 / 200.0).collect();
        let b: Vec<f64> = (0..200).map(|i| 0.5 + i as f64 / 200.0 + 1e-6).collect();
        let res = ks_two_sample(&a, &b);
        assert_eq!(res.method, KsMethod::Asymptotic);
        assert_relative_eq!(res.statistic, 0.5, epsilon = 0.01);
        assert!(res.p_value < 1e-10);
    }
}
