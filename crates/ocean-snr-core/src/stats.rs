//! Descriptive statistics over plain sample slices.
//!
//! All functions operate on finite values only; callers are expected to strip
//! missing cells with [`finite_values`] first where that matters.

use crate::errors::{SnrError, SnrResult};
use crate::FloatValue;

/// Copy the finite values of `values` into a new vector.
pub fn finite_values(values: &[FloatValue]) -> Vec<FloatValue> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean. NaN for an empty sample.
pub fn mean(values: &[FloatValue]) -> FloatValue {
    if values.is_empty() {
        return FloatValue::NAN;
    }
    values.iter().sum::<FloatValue>() / values.len() as FloatValue
}

/// Sample variance with `n - 1` degrees of freedom. NaN for fewer than two values.
pub fn variance(values: &[FloatValue]) -> FloatValue {
    let n = values.len();
    if n < 2 {
        return FloatValue::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<FloatValue>() / (n - 1) as FloatValue
}

/// Sample standard deviation.
pub fn std_dev(values: &[FloatValue]) -> FloatValue {
    variance(values).sqrt()
}

/// Whether the sample carries no spread at all (or too few values to have one).
pub fn has_zero_variance(values: &[FloatValue]) -> bool {
    let v = variance(values);
    !(v.is_finite() && v > 0.0)
}

/// Sort a copy of `values` in ascending order.
///
/// NaN values must have been removed beforehand.
pub fn sorted(values: &[FloatValue]) -> Vec<FloatValue> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Quantile of an already sorted sample using linear interpolation between
/// order statistics (Hyndman & Fan type 7).
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn quantile_sorted(sorted: &[FloatValue], q: FloatValue) -> FloatValue {
    assert!(!sorted.is_empty(), "Cannot take quantile of an empty sample");
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as FloatValue * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as FloatValue;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Quantile of the finite values of `values` (type 7).
///
/// # Errors
///
/// * [`SnrError::InvalidQuantile`] if `q` is outside `[0, 1]`
/// * [`SnrError::EmptySample`] if there are no finite values
pub fn quantile(values: &[FloatValue], q: FloatValue) -> SnrResult<FloatValue> {
    if !(0.0..=1.0).contains(&q) {
        return Err(SnrError::InvalidQuantile(q));
    }
    let finite = finite_values(values);
    if finite.is_empty() {
        return Err(SnrError::EmptySample("quantile".to_string()));
    }
    Ok(quantile_sorted(&sorted(&finite), q))
}

/// Interquartile range of a sorted sample.
pub fn iqr_sorted(sorted: &[FloatValue]) -> FloatValue {
    quantile_sorted(sorted, 0.75) - quantile_sorted(sorted, 0.25)
}

/// Minimum and maximum of the finite values, or `None` if there are none.
pub fn finite_range<'a, I>(values: I) -> Option<(FloatValue, FloatValue)>
where
    I: IntoIterator<Item = &'a FloatValue>,
{
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
