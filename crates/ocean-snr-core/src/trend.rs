//! Per-cell linear trends and detrended variability of layer stacks.

use crate::errors::{SnrError, SnrResult};
use crate::raster::{Raster, RasterStack};
use crate::FloatValue;
use ndarray::{Array2, Axis, Zip};

/// Least-squares fit of `y = intercept + slope * t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: FloatValue,
    pub intercept: FloatValue,
    /// Sample standard deviation of the residuals (n - 2 degrees of freedom)
    pub residual_sd: FloatValue,
}

/// Fit a line through `(times[i], values[i])`.
///
/// Returns NaN coefficients if any value is missing or the times have no spread.
/// `residual_sd` is NaN with fewer than three points.
///
/// # Panics
///
/// Panics if `times` and `values` differ in length.
pub fn fit_line(times: &[FloatValue], values: &[FloatValue]) -> LinearFit {
    assert_eq!(
        times.len(),
        values.len(),
        "times and values must have the same length"
    );
    let nan = LinearFit {
        slope: FloatValue::NAN,
        intercept: FloatValue::NAN,
        residual_sd: FloatValue::NAN,
    };
    let n = times.len();
    if n < 2 || values.iter().any(|v| !v.is_finite()) {
        return nan;
    }

    let t_mean = times.iter().sum::<FloatValue>() / n as FloatValue;
    let y_mean = values.iter().sum::<FloatValue>() / n as FloatValue;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (t, y) in times.iter().zip(values) {
        sxx += (t - t_mean).powi(2);
        sxy += (t - t_mean) * (y - y_mean);
    }
    if sxx == 0.0 {
        return nan;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * t_mean;
    let residual_sd = if n > 2 {
        let rss: FloatValue = times
            .iter()
            .zip(values)
            .map(|(t, y)| (y - intercept - slope * t).powi(2))
            .sum();
        (rss / (n - 2) as FloatValue).sqrt()
    } else {
        FloatValue::NAN
    };

    LinearFit {
        slope,
        intercept,
        residual_sd,
    }
}

fn fit_stack<F>(stack: &RasterStack, times: &[FloatValue], pick: F) -> SnrResult<Raster>
where
    F: Fn(&LinearFit) -> FloatValue,
{
    if times.len() != stack.n_layers() {
        return Err(SnrError::DimensionMismatch {
            expected: stack.n_layers(),
            actual: times.len(),
        });
    }
    if stack.n_layers() < 2 {
        return Err(SnrError::Error(
            "At least two layers are needed to fit a trend".to_string(),
        ));
    }

    let mut out = Array2::from_elem(stack.geometry().shape(), FloatValue::NAN);
    let mut series = vec![0.0; times.len()];
    Zip::from(&mut out)
        .and(stack.values().lanes(Axis(0)))
        .for_each(|cell, lane| {
            for (dst, v) in series.iter_mut().zip(lane.iter()) {
                *dst = *v;
            }
            *cell = pick(&fit_line(times, &series));
        });
    Raster::new(stack.geometry().clone(), out)
}

/// Per-cell least-squares slope of the stack against `times`.
pub fn linear_trend(stack: &RasterStack, times: &[FloatValue]) -> SnrResult<Raster> {
    fit_stack(stack, times, |fit| fit.slope)
}

/// Per-cell standard deviation of the residuals around the linear trend.
pub fn detrended_variability(stack: &RasterStack, times: &[FloatValue]) -> SnrResult<Raster> {
    fit_stack(stack, times, |fit| fit.residual_sd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GridGeometry;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn exact_line() {
        let t = [2000.0, 2001.0, 2002.0, 2003.0];
        let y = [1.0, 1.5, 2.0, 2.5];
        let fit = fit_line(&t, &y);
        assert_relative_eq!(fit.slope, 0.5, epsilon = 1e-12);
        assert_relative_eq!(fit.residual_sd, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn residual_sd_of_known_series() {
        let t = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 0.0, 3.0, 2.0];
        let fit = fit_line(&t, &y);
        assert_relative_eq!(fit.slope, 0.6, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 0.6, epsilon = 1e-12);
        // Residuals: 0.4, -1.2, 1.2, -0.4 -> rss = 3.2, sd = sqrt(3.2 / 2)
        assert_relative_eq!(fit.residual_sd, (1.6f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn missing_value_gives_nan() {
        let fit = fit_line(&[0.0, 1.0, 2.0], &[1.0, f64::NAN, 2.0]);
        assert!(fit.slope.is_nan());
    }

    #[test]
    fn stack_trend_per_cell() {
        let g = GridGeometry::new(2, 1, 0.0, 0.0, 1.0);
        let layers = vec![
            Raster::new(g.clone(), array![[0.0, 5.0]]).unwrap(),
            Raster::new(g.clone(), array![[1.0, 5.0]]).unwrap(),
            Raster::new(g, array![[2.0, f64::NAN]]).unwrap(),
        ];
        let labels = vec!["2000".into(), "2001".into(), "2002".into()];
        let stack = RasterStack::from_layers(labels, &layers).unwrap();
        let trend = linear_trend(&stack, &[2000.0, 2001.0, 2002.0]).unwrap();
        assert_relative_eq!(trend.get(0, 0).unwrap(), 1.0, epsilon = 1e-12);
        assert!(trend.get(0, 1).unwrap().is_nan());

        let var = detrended_variability(&stack, &[2000.0, 2001.0, 2002.0]).unwrap();
        assert_relative_eq!(var.get(0, 0).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn times_must_match_layers() {
        let g = GridGeometry::new(1, 1, 0.0, 0.0, 1.0);
        let layers = vec![Raster::filled(g.clone(), 1.0), Raster::filled(g, 2.0)];
        let stack = RasterStack::from_layers(vec!["a".into(), "b".into()], &layers).unwrap();
        assert!(matches!(
            linear_trend(&stack, &[1.0]),
            Err(SnrError::DimensionMismatch { .. })
        ));
    }
}
