// =============================================================================
// Trend Filter Derived Signals
// =============================================================================
//
// Lag is measured as the shift that best correlates a smoothed series with
// the raw closes: corr(closes[t], smoothed[t + lag]) for lag in 0..20.

use serde::Serialize;

use crate::indicators::ema::smooth_ema;
use crate::indicators::moments::correlation;
use crate::trend::kalman::{filter, TrendSeries};
use crate::types::TrendDirection;

/// Largest lag tried when measuring smoothing delay.
const MAX_LAG: usize = 20;

/// Filtered price with symmetric uncertainty bands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendBands {
    pub filtered_price: Vec<f64>,
    pub upper_band: Vec<f64>,
    pub lower_band: Vec<f64>,
    pub velocity: Vec<f64>,
    pub uncertainty: Vec<f64>,
}

/// Per-bar direction signal from filter velocity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSignal {
    /// +1 up, -1 down, 0 inside the dead band.
    pub direction: Vec<i8>,
    /// `|velocity|`.
    pub strength: Vec<f64>,
    pub velocity: Vec<f64>,
    pub filtered_price: Vec<f64>,
}

/// `filtered ± multiplier * uncertainty` (2.0 gives roughly a 95% band).
pub fn bands(
    closes: &[f64],
    multiplier: f64,
    process_noise: f64,
    observation_noise: f64,
) -> TrendBands {
    let TrendSeries {
        filtered_price,
        velocity,
        uncertainty,
        ..
    } = filter(closes, process_noise, observation_noise);

    let upper_band = filtered_price
        .iter()
        .zip(&uncertainty)
        .map(|(p, u)| p + multiplier * u)
        .collect();
    let lower_band = filtered_price
        .iter()
        .zip(&uncertainty)
        .map(|(p, u)| p - multiplier * u)
        .collect();

    TrendBands {
        filtered_price,
        upper_band,
        lower_band,
        velocity,
        uncertainty,
    }
}

/// Classify every bar's velocity against `threshold`.
pub fn trend_signal(
    closes: &[f64],
    threshold: f64,
    process_noise: f64,
    observation_noise: f64,
) -> TrendSignal {
    let series = filter(closes, process_noise, observation_noise);
    let direction = series
        .velocity
        .iter()
        .map(|&v| TrendDirection::from_velocity(v, threshold).as_signal())
        .collect();
    let strength = series.velocity.iter().map(|v| v.abs()).collect();

    TrendSignal {
        direction,
        strength,
        velocity: series.velocity,
        filtered_price: series.filtered_price,
    }
}

/// Kalman filter versus an EMA of `ema_period` on the same closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LagComparison {
    pub kalman: Vec<f64>,
    pub ema: Vec<f64>,
    pub kalman_velocity: Vec<f64>,
    /// Bars of delay, `0..20`.
    pub kalman_lag: usize,
    pub ema_lag: usize,
    /// `(ema_lag - kalman_lag) / max(ema_lag, 1) * 100`; negative when the
    /// filter lags more.
    pub lag_reduction_pct: f64,
}

/// Compare the filter's delay against an EMA's.
pub fn compare_kalman_ema(
    closes: &[f64],
    ema_period: usize,
    process_noise: f64,
    observation_noise: f64,
) -> LagComparison {
    let series = filter(closes, process_noise, observation_noise);

    let seeded: Vec<Option<f64>> = closes.iter().map(|c| Some(*c)).collect();
    let ema: Vec<f64> = smooth_ema(&seeded, ema_period)
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    let kalman_lag = estimate_lag(closes, &series.filtered_price);
    let ema_lag = estimate_lag(closes, &ema);
    let lag_reduction_pct =
        (ema_lag as f64 - kalman_lag as f64) / ema_lag.max(1) as f64 * 100.0;

    LagComparison {
        kalman: series.filtered_price,
        ema,
        kalman_velocity: series.velocity,
        kalman_lag,
        ema_lag,
        lag_reduction_pct,
    }
}

/// Shift in `0..20` maximizing the correlation of `original` with the
/// later `smoothed` values. Ties keep the smaller lag; 0 when nothing
/// correlates.
fn estimate_lag(original: &[f64], smoothed: &[f64]) -> usize {
    let n = original.len().min(smoothed.len());
    let mut best_lag = 0;
    let mut best_corr = f64::NEG_INFINITY;

    for lag in 0..MAX_LAG.min(n) {
        let Some(corr) = correlation(&original[..n - lag], &smoothed[lag..n]) else {
            continue;
        };
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    best_lag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_bracket_filtered_price() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + (i as f64 * 0.5).sin()).collect();
        let b = bands(&closes, 2.0, 0.01, 1.0);
        for i in 0..closes.len() {
            assert!(b.lower_band[i] <= b.filtered_price[i]);
            assert!(b.filtered_price[i] <= b.upper_band[i]);
            let width = b.upper_band[i] - b.lower_band[i];
            assert!((width - 4.0 * b.uncertainty[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn signal_follows_ramp() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let s = trend_signal(&closes, 0.1, 0.01, 1.0);
        assert_eq!(*s.direction.last().unwrap(), 1);
        assert_eq!(s.direction[0], 0);
        assert!((s.strength[99] - s.velocity[99].abs()).abs() < 1e-15);
    }

    #[test]
    fn flat_series_signal_is_neutral() {
        let s = trend_signal(&[10.0; 20], 0.0, 0.01, 1.0);
        assert!(s.direction.iter().all(|&d| d == 0));
    }

    fn sine(n: usize, period: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 10.0 * (2.0 * std::f64::consts::PI * i as f64 / period).sin())
            .collect()
    }

    #[test]
    fn lag_of_shifted_copy() {
        let original = sine(200, 40.0);
        let shifted: Vec<f64> = (0..200).map(|i: usize| original[i.saturating_sub(3)]).collect();
        assert_eq!(estimate_lag(&original, &shifted), 3);
        assert_eq!(estimate_lag(&original, &original), 0);
    }

    #[test]
    fn lag_of_flat_series_is_zero() {
        assert_eq!(estimate_lag(&[5.0; 30], &[5.0; 30]), 0);
        assert_eq!(estimate_lag(&[], &[]), 0);
    }

    #[test]
    fn ema_lag_on_sine() {
        let closes = sine(400, 40.0);
        let c = compare_kalman_ema(&closes, 20, 0.01, 1.0);

        assert_eq!(c.kalman.len(), 400);
        assert_eq!(c.ema.len(), 400);
        assert_eq!(c.ema[0], closes[0]);
        // EMA(20) delays a 40-bar cycle by about six bars.
        assert!((4..=8).contains(&c.ema_lag), "ema lag {}", c.ema_lag);
        assert!(c.kalman_lag < 20);
        let expected =
            (c.ema_lag as f64 - c.kalman_lag as f64) / c.ema_lag.max(1) as f64 * 100.0;
        assert_eq!(c.lag_reduction_pct, expected);
    }
}
