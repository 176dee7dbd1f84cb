// =============================================================================
// Z-Score Trading Signals
// =============================================================================
//
// Signals built on the rolling Z-score:
//
//   mean reversion   flat -> long when Z < -entry, flat -> short when
//                    Z > entry, back to flat once |Z| < exit
//   dynamic bands    threshold = base * (0.5 + vol_percentile), so the
//                    entry level widens in volatile stretches
//   divergence       a new price low/high over the lookback that the
//                    indicator does not confirm
//
// Position state carries across bars with an undefined Z.

use serde::Serialize;
use tracing::trace;

use crate::error::EngineError;
use crate::indicators::moments::sample_std;
use crate::zscore::rolling::rolling_zscore;

/// Default |Z| that opens a position.
pub const DEFAULT_ENTRY_THRESHOLD: f64 = 2.0;

/// Default |Z| under which an open position closes.
pub const DEFAULT_EXIT_THRESHOLD: f64 = 0.5;

/// Default window for the return volatility behind the dynamic threshold.
pub const DEFAULT_VOL_WINDOW: usize = 50;

const MULTIPLIER_FLOOR: f64 = 0.5;
const PERCENTILE_EPS: f64 = 1e-10;

// =============================================================================
// Types
// =============================================================================

/// Position path of the mean-reversion rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeanReversionSignal {
    /// Position held after each bar: +1 long, -1 short, 0 flat.
    pub signal: Vec<i8>,
    pub zscore: Vec<Option<f64>>,
    pub entry_long: Vec<bool>,
    pub entry_short: Vec<bool>,
    pub exit: Vec<bool>,
    pub mean: Vec<Option<f64>>,
    pub std: Vec<Option<f64>>,
}

/// Volatility-scaled Z thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DynamicThreshold {
    pub zscore: Vec<Option<f64>>,
    /// Sample std of simple returns over the volatility window.
    pub volatility: Vec<Option<f64>>,
    /// Where volatility sits between its rolling min and max, `[0, 1)`.
    pub vol_regime: Vec<Option<f64>>,
    pub upper_threshold: Vec<Option<f64>>,
    pub lower_threshold: Vec<Option<f64>>,
    pub extreme_high: Vec<bool>,
    pub extreme_low: Vec<bool>,
}

/// Price/indicator divergences on rolling Z-scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ZScoreDivergence {
    pub price_zscore: Vec<Option<f64>>,
    pub indicator_zscore: Vec<Option<f64>>,
    /// Lower price low with a higher indicator reading.
    pub bullish: Vec<bool>,
    /// Higher price high with a lower indicator reading.
    pub bearish: Vec<bool>,
}

// =============================================================================
// Mean Reversion
// =============================================================================

/// Fade Z extremes and close near the mean.
///
/// Bars before `window` stay flat.
pub fn mean_reversion_signal(
    prices: &[f64],
    window: usize,
    entry_threshold: f64,
    exit_threshold: f64,
) -> MeanReversionSignal {
    let series = rolling_zscore(prices, window, None);
    let zscore = series.zscores();

    let mut out = run_positions(&zscore, window, entry_threshold, exit_threshold);
    out.mean = series.points.iter().map(|p| p.mean).collect();
    out.std = series.points.iter().map(|p| p.std).collect();
    out.zscore = zscore;

    trace!(
        bars = prices.len(),
        position = out.signal.last().copied().unwrap_or(0),
        "Mean-reversion signal computed"
    );

    out
}

fn run_positions(
    zscores: &[Option<f64>],
    start: usize,
    entry_threshold: f64,
    exit_threshold: f64,
) -> MeanReversionSignal {
    let n = zscores.len();
    let mut out = MeanReversionSignal {
        signal: vec![0; n],
        entry_long: vec![false; n],
        entry_short: vec![false; n],
        exit: vec![false; n],
        ..MeanReversionSignal::default()
    };

    let mut position: i8 = 0;
    for i in start.min(n)..n {
        if let Some(z) = zscores[i] {
            if position == 0 {
                if z < -entry_threshold {
                    position = 1;
                    out.entry_long[i] = true;
                } else if z > entry_threshold {
                    position = -1;
                    out.entry_short[i] = true;
                }
            } else if z.abs() < exit_threshold {
                out.exit[i] = true;
                position = 0;
            }
        }
        out.signal[i] = position;
    }

    out
}

// =============================================================================
// Dynamic Threshold
// =============================================================================

/// Z thresholds scaled by where return volatility sits in its recent range.
///
/// The multiplier runs from 0.5 (volatility at its rolling minimum) to 1.5
/// (at its maximum). Thresholds are undefined until both the volatility
/// window and its min/max window are full, i.e. before bar `2 * vol_window - 1`.
pub fn dynamic_zscore_threshold(
    prices: &[f64],
    window: usize,
    vol_window: usize,
    base_threshold: f64,
) -> DynamicThreshold {
    let n = prices.len();
    let zscore = rolling_zscore(prices, window, None).zscores();

    let returns: Vec<Option<f64>> = (0..n)
        .map(|i| {
            if i == 0 || prices[i - 1] == 0.0 {
                None
            } else {
                Some(prices[i] / prices[i - 1] - 1.0)
            }
        })
        .collect();

    let volatility: Vec<Option<f64>> = (0..n)
        .map(|i| {
            if vol_window == 0 || i + 1 < vol_window {
                return None;
            }
            let slice: Option<Vec<f64>> =
                returns[i + 1 - vol_window..=i].iter().copied().collect();
            sample_std(&slice?)
        })
        .collect();

    let vol_regime: Vec<Option<f64>> = (0..n)
        .map(|i| {
            if vol_window == 0 || i + 1 < vol_window {
                return None;
            }
            let slice: Option<Vec<f64>> =
                volatility[i + 1 - vol_window..=i].iter().copied().collect();
            let slice = slice?;
            let lo = slice.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = slice.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let v = volatility[i]?;
            Some((v - lo) / (hi - lo + PERCENTILE_EPS))
        })
        .collect();

    let upper_threshold: Vec<Option<f64>> = vol_regime
        .iter()
        .map(|p| p.map(|p| base_threshold * (MULTIPLIER_FLOOR + p)))
        .collect();
    let lower_threshold: Vec<Option<f64>> =
        upper_threshold.iter().map(|u| u.map(|u| -u)).collect();

    let extreme_high = zscore
        .iter()
        .zip(&upper_threshold)
        .map(|(z, u)| matches!((z, u), (Some(z), Some(u)) if z > u))
        .collect();
    let extreme_low = zscore
        .iter()
        .zip(&lower_threshold)
        .map(|(z, l)| matches!((z, l), (Some(z), Some(l)) if z < l))
        .collect();

    DynamicThreshold {
        zscore,
        volatility,
        vol_regime,
        upper_threshold,
        lower_threshold,
        extreme_high,
        extreme_low,
    }
}

// =============================================================================
// Divergence
// =============================================================================

/// Flag price extremes over `lookback` bars that `indicator` fails to confirm.
///
/// A bar is checked only when it is the lowest (or highest) price of the
/// last `lookback + 1` bars. It is compared against the first lowest (or
/// highest) of the `lookback` bars before it.
pub fn zscore_divergence(
    prices: &[f64],
    indicator: &[f64],
    window: usize,
    lookback: usize,
) -> Result<ZScoreDivergence, EngineError> {
    if indicator.len() != prices.len() {
        return Err(EngineError::LengthMismatch {
            expected: prices.len(),
            actual: indicator.len(),
        });
    }

    let n = prices.len();
    let mut out = ZScoreDivergence {
        price_zscore: rolling_zscore(prices, window, None).zscores(),
        indicator_zscore: rolling_zscore(indicator, window, None).zscores(),
        bullish: vec![false; n],
        bearish: vec![false; n],
    };

    if lookback == 0 {
        return Ok(out);
    }

    for i in (lookback + window)..n {
        let price_window = &prices[i - lookback..=i];
        let indicator_window = &indicator[i - lookback..=i];
        let history = &price_window[..lookback];
        let current = prices[i];

        let prev_low = history.iter().copied().fold(f64::INFINITY, f64::min);
        let prev_high = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if current <= prev_low {
            let prev = first_index_of(history, prev_low);
            out.bullish[i] = current < history[prev] && indicator[i] > indicator_window[prev];
        }
        if current >= prev_high {
            let prev = first_index_of(history, prev_high);
            out.bearish[i] = current > history[prev] && indicator[i] < indicator_window[prev];
        }
    }

    Ok(out)
}

fn first_index_of(values: &[f64], target: f64) -> usize {
    values.iter().position(|v| *v == target).unwrap_or(0)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pseudorandom_walk;
    use crate::zscore::rolling::DEFAULT_WINDOW;

    #[test]
    fn test_position_state_machine() {
        let z = [
            Some(-2.5),
            Some(-1.0),
            Some(0.3),
            Some(2.1),
            None,
            Some(1.0),
            Some(-0.2),
        ];
        let s = run_positions(&z, 0, 2.0, 0.5);
        assert_eq!(s.signal, vec![1, 1, 0, -1, -1, -1, 0]);
        assert_eq!(s.entry_long, vec![true, false, false, false, false, false, false]);
        assert_eq!(s.entry_short, vec![false, false, false, true, false, false, false]);
        assert_eq!(s.exit, vec![false, false, true, false, false, false, true]);
    }

    #[test]
    fn test_no_exit_on_entry_bar() {
        // Entering never checks the exit band on the same bar.
        let s = run_positions(&[Some(-3.0), Some(-0.1)], 0, 2.0, 0.5);
        assert_eq!(s.signal, vec![1, 0]);
        assert!(!s.exit[0] && s.exit[1]);
    }

    #[test]
    fn test_mean_reversion_on_price_spike() {
        let mut prices: Vec<f64> = (0..40).map(|i| 100.0 + (i % 2) as f64 * 0.5).collect();
        prices[30] = 90.0;
        let s = mean_reversion_signal(
            &prices,
            DEFAULT_WINDOW,
            DEFAULT_ENTRY_THRESHOLD,
            DEFAULT_EXIT_THRESHOLD,
        );

        assert_eq!(s.signal.len(), 40);
        assert!(s.signal[..30].iter().all(|p| *p == 0));
        assert!(s.entry_long[30]);
        assert_eq!(s.signal[30], 1);
        assert!(s.mean[30].is_some() && s.std[30].is_some());
        // Back inside the band once the spike fades.
        assert!(s.exit[31]);
        assert_eq!(s.signal[39], 0);
    }

    #[test]
    fn test_dynamic_threshold_definedness_and_range() {
        let prices = pseudorandom_walk(300, 7);
        let d = dynamic_zscore_threshold(&prices, 20, DEFAULT_VOL_WINDOW, 2.0);

        assert!(d.volatility[49].is_none());
        assert!(d.volatility[50].is_some());
        assert!(d.upper_threshold[98].is_none());
        assert!(d.upper_threshold[99].is_some());
        for u in d.upper_threshold.iter().flatten() {
            assert!((1.0..=3.0).contains(u));
        }
        for (u, l) in d.upper_threshold.iter().zip(&d.lower_threshold) {
            assert_eq!(u.map(|u| -u), *l);
        }
    }

    fn alternating_returns(n: usize, switch_at: usize, before: f64, after: f64) -> Vec<f64> {
        let mut price = 100.0_f64;
        (0..n)
            .map(|i| {
                if i > 0 {
                    let size = if i < switch_at { before } else { after };
                    let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                    price *= 1.0 + sign * size;
                }
                price
            })
            .collect()
    }

    #[test]
    fn test_threshold_widens_with_volatility() {
        let calm_then_wild = alternating_returns(200, 100, 0.001, 0.02);
        let d = dynamic_zscore_threshold(&calm_then_wild, 20, 50, 2.0);
        assert!(d.upper_threshold[120].unwrap() > 2.99);

        let wild_then_calm = alternating_returns(200, 100, 0.02, 0.001);
        let d = dynamic_zscore_threshold(&wild_then_calm, 20, 50, 2.0);
        assert!((d.upper_threshold[199].unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_divergence_flags() {
        let prices = [
            100.0, 101.0, 102.0, 101.0, 100.0, 101.0, 102.0, 101.0, 99.0, 105.0, 104.0, 103.0,
        ];
        let mut indicator = [50.0; 12];
        indicator[8] = 60.0;
        indicator[9] = 40.0;

        let d = zscore_divergence(&prices, &indicator, 5, 3).unwrap();
        let bullish: Vec<usize> = (0..12).filter(|i| d.bullish[*i]).collect();
        let bearish: Vec<usize> = (0..12).filter(|i| d.bearish[*i]).collect();
        assert_eq!(bullish, vec![8]);
        assert_eq!(bearish, vec![9]);
        assert!(d.price_zscore[3].is_none());
        assert!(d.price_zscore[4].is_some());
    }

    #[test]
    fn test_divergence_length_mismatch() {
        let err = zscore_divergence(&[1.0, 2.0, 3.0], &[1.0, 2.0], 2, 1).unwrap_err();
        assert_eq!(
            err,
            EngineError::LengthMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_divergence_zero_lookback() {
        let d = zscore_divergence(&[3.0, 2.0, 1.0], &[1.0, 2.0, 3.0], 2, 0).unwrap();
        assert!(d.bullish.iter().chain(&d.bearish).all(|f| !f));
    }
}
