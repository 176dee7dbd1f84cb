// =============================================================================
// Hurst Exponent — Detrended Fluctuation Analysis (DFA)
// =============================================================================
//
// DFA is less sensitive than R/S to slow non-stationary drift because every
// window is linearly detrended before its fluctuation is measured.
//
//   1. r_t = ln(p_t + 1e-10) - ln(p_{t-1} + 1e-10)
//   2. Y   = cumsum(r - mean(r))           (the "profile")
//   3. For each log-spaced integer scale s in [min_scale, max_scale]
//      with s <= len(Y) / 4:
//        split Y into floor(len(Y) / s) non-overlapping windows,
//        fit a line to each window and take the mean squared residual,
//        F(s) = sqrt(mean of those residuals).
//   4. H = OLS slope of ln F(s) on ln s, clamped to [0, 1].
//
// Fewer than `max_scale` prices, or fewer than 5 usable scales, gives 0.5.

use tracing::trace;

use crate::indicators::moments::linear_regression;
use crate::regime::hurst::NEUTRAL_HURST;

/// Number of log-spaced candidate scales before de-duplication.
const SCALE_COUNT: usize = 20;

/// Minimum number of usable scales for the log-log fit.
const MIN_SCALES: usize = 5;

/// Fluctuations at or below this floor cannot be logged meaningfully.
const FLUCTUATION_FLOOR: f64 = 1e-10;

/// Offset added before taking logs so a zero price stays finite.
const LOG_OFFSET: f64 = 1e-10;

/// Estimate H by detrended fluctuation analysis.
pub fn hurst_dfa(closes: &[f64], min_scale: usize, max_scale: usize) -> f64 {
    if closes.len() < max_scale || closes.len() < 2 || min_scale < 2 {
        trace!(len = closes.len(), max_scale, "DFA: insufficient data");
        return NEUTRAL_HURST;
    }

    let profile = cumulative_profile(closes);
    let limit = profile.len() / 4;

    let mut log_scales: Vec<f64> = Vec::new();
    let mut log_fluct: Vec<f64> = Vec::new();

    for scale in log_spaced_scales(min_scale, max_scale) {
        if scale > limit {
            continue;
        }
        let Some(f) = fluctuation(&profile, scale) else {
            continue;
        };
        if f > FLUCTUATION_FLOOR {
            log_scales.push((scale as f64).ln());
            log_fluct.push(f.ln());
        }
    }

    if log_scales.len() < MIN_SCALES {
        trace!(scales = log_scales.len(), "DFA: too few usable scales");
        return NEUTRAL_HURST;
    }

    match linear_regression(&log_scales, &log_fluct) {
        Some((slope, _)) if slope.is_finite() => {
            let hurst = slope.clamp(0.0, 1.0);
            trace!(
                hurst = format!("{:.4}", hurst),
                scales = log_scales.len(),
                "DFA Hurst computed"
            );
            hurst
        }
        _ => NEUTRAL_HURST,
    }
}

/// Cumulative sum of mean-centred log returns.
fn cumulative_profile(closes: &[f64]) -> Vec<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .map(|w| (w[1] + LOG_OFFSET).ln() - (w[0] + LOG_OFFSET).ln())
        .collect();
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;

    returns
        .iter()
        .scan(0.0_f64, |acc, r| {
            *acc += r - mean;
            Some(*acc)
        })
        .collect()
}

/// `SCALE_COUNT` log-spaced integer scales in `[min, max]`, truncated and
/// de-duplicated in ascending order.
fn log_spaced_scales(min: usize, max: usize) -> Vec<usize> {
    let lo = (min as f64).log10();
    let hi = (max as f64).log10();
    let step = (hi - lo) / (SCALE_COUNT - 1) as f64;

    let mut scales: Vec<usize> = (0..SCALE_COUNT)
        .map(|k| {
            let v = 10f64.powf(lo + step * k as f64);
            // Nudge so exact powers such as 10^2 do not truncate to 99.
            (v + 1e-9).floor() as usize
        })
        .filter(|&s| s >= min)
        .collect();
    scales.dedup();
    scales
}

/// Root-mean-square residual across all full windows of width `scale`.
fn fluctuation(profile: &[f64], scale: usize) -> Option<f64> {
    let segments = profile.len() / scale;
    if segments == 0 {
        return None;
    }

    let xs: Vec<f64> = (0..scale).map(|i| i as f64).collect();
    let mut total = 0.0_f64;

    for seg in profile.chunks_exact(scale).take(segments) {
        let (slope, intercept) = linear_regression(&xs, seg)?;
        let mse = xs
            .iter()
            .zip(seg)
            .map(|(x, y)| {
                let resid = y - (slope * x + intercept);
                resid * resid
            })
            .sum::<f64>()
            / scale as f64;
        total += mse;
    }

    Some((total / segments as f64).sqrt())
}
