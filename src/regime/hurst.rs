// =============================================================================
// Hurst Exponent — Rescaled Range (R/S) Analysis
// =============================================================================
//
// The Hurst exponent H characterises the long-term memory of a time series:
//
//   H > 0.5  =>  trending / persistent (momentum regime)
//   H ~ 0.5  =>  random walk
//   H < 0.5  =>  mean-reverting / anti-persistent
//
// Algorithm:
//   1. For each lag L in [10, min(max_lag, n - 10)):
//      a. Take the first L + 1 prices and their L first differences.
//      b. Mean-centre the differences and take the cumulative sum.
//      c. R = max(cumsum) - min(cumsum).
//      d. S = sample standard deviation (n - 1) of the differences.
//      e. Keep (L, R/S) only when both R and S exceed 1e-10.
//   2. With at least 10 valid pairs, regress log(R/S) on log(L) by OLS.
//      The slope is H.
//   3. Clamp H to [0, 1].
//
// Insufficient data is not an error here: the neutral value 0.5 is returned.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::indicators::ema::smooth_ema;
use crate::indicators::moments::{linear_regression, sample_std};
use crate::regime::dfa::hurst_dfa;

/// Neutral Hurst value returned whenever an estimate cannot be formed.
pub const NEUTRAL_HURST: f64 = 0.5;

/// Minimum number of prices for the R/S estimator.
pub const MIN_POINTS: usize = 20;

/// Smallest lag considered by the R/S estimator.
const MIN_LAG: usize = 10;

/// Minimum number of valid (lag, R/S) pairs needed for the regression.
const MIN_VALID_LAGS: usize = 10;

/// R and S at or below this floor are treated as degenerate.
const RS_FLOOR: f64 = 1e-10;

/// Default upper lag for the R/S estimator.
pub const DEFAULT_MAX_LAG: usize = 100;

/// Hurst estimation method.
///
/// Both variants are pure functions sharing one signature; the engine picks
/// one from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HurstMethod {
    /// Rescaled range over growing prefixes.
    #[default]
    RescaledRange,
    /// Detrended fluctuation analysis on log returns.
    DetrendedFluctuation,
}

impl HurstMethod {
    /// Estimate H for `closes`.
    ///
    /// `max_lag` is the largest R/S lag, or the largest DFA scale.
    pub fn estimate(self, closes: &[f64], max_lag: usize) -> f64 {
        match self {
            Self::RescaledRange => hurst_rs(closes, max_lag),
            Self::DetrendedFluctuation => hurst_dfa(closes, MIN_LAG, max_lag),
        }
    }
}

impl std::fmt::Display for HurstMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RescaledRange => write!(f, "R/S"),
            Self::DetrendedFluctuation => write!(f, "DFA"),
        }
    }
}

/// Calculate the Hurst exponent of a price series via Rescaled Range analysis.
///
/// Returns [`NEUTRAL_HURST`] when fewer than [`MIN_POINTS`] prices are
/// supplied or fewer than 10 lags yield a usable R/S value.
pub fn hurst_rs(closes: &[f64], max_lag: usize) -> f64 {
    let n = closes.len();
    if n < MIN_POINTS {
        trace!(len = n, min = MIN_POINTS, "Hurst: insufficient data");
        return NEUTRAL_HURST;
    }

    let upper = max_lag.min(n - MIN_LAG);

    let mut log_lags: Vec<f64> = Vec::new();
    let mut log_rs: Vec<f64> = Vec::new();

    for lag in MIN_LAG..upper {
        let diffs: Vec<f64> = closes[..=lag].windows(2).map(|w| w[1] - w[0]).collect();

        let Some(s) = sample_std(&diffs) else {
            continue;
        };
        let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;

        let mut running = 0.0_f64;
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for d in &diffs {
            running += d - mean;
            lo = lo.min(running);
            hi = hi.max(running);
        }
        let r = hi - lo;

        // NaN fails both comparisons and is skipped as well.
        if s > RS_FLOOR && r > RS_FLOOR {
            log_lags.push((lag as f64).ln());
            log_rs.push((r / s).ln());
        }
    }

    if log_lags.len() < MIN_VALID_LAGS {
        trace!(valid = log_lags.len(), "Hurst: too few valid lags");
        return NEUTRAL_HURST;
    }

    let Some((slope, _)) = linear_regression(&log_lags, &log_rs) else {
        trace!("Hurst: degenerate regression");
        return NEUTRAL_HURST;
    };

    if !slope.is_finite() {
        return NEUTRAL_HURST;
    }

    let hurst = slope.clamp(0.0, 1.0);
    trace!(
        hurst = format!("{:.4}", hurst),
        points = log_lags.len(),
        "Hurst exponent computed"
    );
    hurst
}

/// Rolling Hurst estimate with EMA smoothing.
///
/// Bar `i >= window` is estimated from `closes[i - window..i]`; the first
/// `window` bars are undefined. The raw series is then smoothed with
/// [`smooth_ema`] using `smooth_period`.
pub fn rolling_hurst(
    closes: &[f64],
    window: usize,
    smooth_period: usize,
    method: HurstMethod,
    max_lag: usize,
) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut raw: Vec<Option<f64>> = vec![None; n];

    if window > 0 {
        for i in window..n {
            raw[i] = Some(method.estimate(&closes[i - window..i], max_lag));
        }
    }

    smooth_ema(&raw, smooth_period)
}
