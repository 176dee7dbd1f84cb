// =============================================================================
// Sample Moments & Least Squares
// =============================================================================
//
// Small numeric kernels shared by the regime, statistics and volume modules.
// Callers filter non-finite inputs first.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (divisor `n - 1`). `None` below two points.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss = values
        .iter()
        .map(|x| {
            let d = x - m;
            d * d
        })
        .sum::<f64>();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Population standard deviation (divisor `n`). `None` for an empty slice.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let ss = values
        .iter()
        .map(|x| {
            let d = x - m;
            d * d
        })
        .sum::<f64>();
    Some((ss / values.len() as f64).sqrt())
}

/// Ordinary least squares fit `y = slope * x + intercept`.
///
/// Returns `None` when fewer than two points are supplied, the slices differ
/// in length, or every `x` is identical.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let x_mean = mean(xs)?;
    let y_mean = mean(ys)?;

    let mut numerator = 0.0_f64;
    let mut denominator = 0.0_f64;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - x_mean;
        numerator += dx * (y - y_mean);
        denominator += dx * dx;
    }

    if denominator.abs() < f64::EPSILON {
        return None;
    }

    let slope = numerator / denominator;
    Some((slope, y_mean - slope * x_mean))
}

/// Pearson correlation of two equal-length slices.
///
/// `None` below two points, on a length mismatch, or when either side has no
/// variance.
pub fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let x_mean = mean(xs)?;
    let y_mean = mean(ys)?;

    let (mut sxy, mut sxx, mut syy) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - x_mean;
        let dy = y - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Trailing mean over `window` values; `None` until the window is full or
/// when it holds a non-finite value.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().all(|v| v.is_finite()) {
            out[i] = mean(slice);
        }
    }
    out
}
