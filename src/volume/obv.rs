// =============================================================================
// On-Balance Volume & Volume Momentum
// =============================================================================
//
// OBV adds a bar's volume when the close rises, subtracts it when the close
// falls and ignores unchanged closes:
//
//   obv_t      = obv_{t-1} + sign(close_t - close_{t-1}) * volume_t
//   momentum   = obv - ewm(obv, 20)
//   trend      = sign(sma20(obv) - sma50(obv))
//
// Volume momentum compares a short and a long volume average and tracks the
// force index (price change times volume).

use serde::Serialize;

use crate::indicators::ema::ewm_mean;
use crate::indicators::moments::{correlation, rolling_mean};
use crate::types::PriceBar;

const OBV_EMA_SPAN: usize = 20;
const OBV_FAST_SMA: usize = 20;
const OBV_SLOW_SMA: usize = 50;

/// Default short volume window for [`volume_momentum`].
pub const DEFAULT_SHORT_WINDOW: usize = 5;

/// Default long volume window for [`volume_momentum`].
pub const DEFAULT_LONG_WINDOW: usize = 20;

const EXPANDING_RATIO: f64 = 1.2;
const CONTRACTING_RATIO: f64 = 0.8;

/// On-balance volume per bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObvSeries {
    pub obv: Vec<f64>,
    pub obv_ema: Vec<f64>,
    /// `obv - obv_ema`.
    pub momentum: Vec<f64>,
    /// Sign of SMA20 minus SMA50 of OBV; `None` before 50 bars.
    pub trend: Vec<Option<i8>>,
    /// The close moved but OBV did not move with it (zero-volume bar).
    pub divergence: Vec<bool>,
}

/// Short-versus-long volume activity per bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeMomentumSeries {
    /// Short average volume over long average volume.
    pub volume_ratio: Vec<Option<f64>>,
    pub volume_trend: Vec<Option<i8>>,
    /// Rolling close/volume correlation over the long window.
    pub price_volume_correlation: Vec<Option<f64>>,
    pub force_index: Vec<f64>,
    pub force_ema: Vec<f64>,
    /// Ratio above 1.2.
    pub expanding: Vec<bool>,
    /// Ratio below 0.8.
    pub contracting: Vec<bool>,
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

fn price_changes(bars: &[PriceBar]) -> Vec<f64> {
    let mut prev = bars.first().map(|b| b.close).unwrap_or(0.0);
    bars.iter()
        .map(|b| {
            let change = b.close - prev;
            prev = b.close;
            change
        })
        .collect()
}

/// On-balance volume with its EMA, momentum, trend and divergence flags.
pub fn on_balance_volume(bars: &[PriceBar]) -> ObvSeries {
    let changes = price_changes(bars);

    let mut running = 0.0_f64;
    let obv: Vec<f64> = bars
        .iter()
        .zip(&changes)
        .map(|(bar, change)| {
            running += bar.volume * f64::from(sign(*change));
            running
        })
        .collect();

    let obv_ema = ewm_mean(&obv, OBV_EMA_SPAN);
    let momentum = obv.iter().zip(&obv_ema).map(|(o, e)| o - e).collect();

    let fast = rolling_mean(&obv, OBV_FAST_SMA);
    let slow = rolling_mean(&obv, OBV_SLOW_SMA);
    let trend = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(sign(f - s)),
            _ => None,
        })
        .collect();

    let divergence = changes
        .iter()
        .enumerate()
        .map(|(i, change)| {
            let obv_step = if i == 0 { 0.0 } else { obv[i] - obv[i - 1] };
            sign(*change) != sign(obv_step)
        })
        .collect();

    ObvSeries {
        obv,
        obv_ema,
        momentum,
        trend,
        divergence,
    }
}

/// Volume ratio, force index and price-volume correlation.
pub fn volume_momentum(
    bars: &[PriceBar],
    short_window: usize,
    long_window: usize,
) -> VolumeMomentumSeries {
    let n = bars.len();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let short = rolling_mean(&volumes, short_window);
    let long = rolling_mean(&volumes, long_window);

    let mut out = VolumeMomentumSeries {
        volume_ratio: vec![None; n],
        volume_trend: vec![None; n],
        price_volume_correlation: vec![None; n],
        force_index: Vec::new(),
        force_ema: Vec::new(),
        expanding: vec![false; n],
        contracting: vec![false; n],
    };

    for i in 0..n {
        if let (Some(s), Some(l)) = (short[i], long[i]) {
            out.volume_trend[i] = Some(sign(s - l));
            if l > 0.0 {
                let ratio = s / l;
                out.volume_ratio[i] = Some(ratio);
                out.expanding[i] = ratio > EXPANDING_RATIO;
                out.contracting[i] = ratio < CONTRACTING_RATIO;
            }
        }

        if long_window >= 2 && i + 1 >= long_window {
            let range = i + 1 - long_window..=i;
            out.price_volume_correlation[i] =
                correlation(&closes[range.clone()], &volumes[range]);
        }
    }

    out.force_index = price_changes(bars)
        .iter()
        .zip(&volumes)
        .map(|(change, volume)| change * volume)
        .collect();
    out.force_ema = ewm_mean(&out.force_index, short_window);

    out
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64, volume: f64) -> PriceBar {
        PriceBar::new(ts, close, close + 1.0, close - 1.0, close, volume)
    }

    fn bars(closes: &[f64], volumes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (c, v))| bar(i as i64, *c, *v))
            .collect()
    }

    #[test]
    fn test_obv_accumulates_by_direction() {
        let b = bars(
            &[10.0, 11.0, 11.0, 10.0, 12.0],
            &[100.0, 200.0, 300.0, 400.0, 500.0],
        );
        let o = on_balance_volume(&b);
        assert_eq!(o.obv, vec![0.0, 200.0, 200.0, -200.0, 300.0]);
        assert_eq!(o.obv_ema[0], 0.0);
        assert!(o.divergence.iter().all(|d| !d));
        assert!(o.trend.iter().all(Option::is_none));
    }

    #[test]
    fn test_obv_zero_volume_move_diverges() {
        let o = on_balance_volume(&bars(&[10.0, 11.0], &[100.0, 0.0]));
        assert!(!o.divergence[0]);
        assert!(o.divergence[1]);
    }

    #[test]
    fn test_obv_trend_follows_rising_closes() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let o = on_balance_volume(&bars(&closes, &[10.0; 60]));
        assert!(o.trend[48].is_none());
        assert!(o.trend[49..].iter().all(|t| *t == Some(1)));
        assert!(o.momentum[59] > 0.0);
    }

    #[test]
    fn test_volume_momentum_spike() {
        let mut volumes = vec![100.0; 20];
        volumes.extend([300.0; 5]);
        let closes = vec![50.0; 25];
        let m = volume_momentum(&bars(&closes, &volumes), 5, 20);

        assert!(m.volume_ratio[18].is_none());
        assert_eq!(m.volume_ratio[19], Some(1.0));
        assert_eq!(m.volume_trend[19], Some(0));
        // long window = 15 * 100 + 5 * 300 over 20 = 150
        assert_eq!(m.volume_ratio[24], Some(2.0));
        assert_eq!(m.volume_trend[24], Some(1));
        assert!(m.expanding[24] && !m.contracting[24]);
        // Flat closes have no correlation.
        assert!(m.price_volume_correlation[24].is_none());
        assert!(m.force_index.iter().all(|f| *f == 0.0));
    }

    #[test]
    fn test_volume_momentum_force_and_correlation() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let volumes: Vec<f64> = (0..30).map(|i| 1_000.0 + 10.0 * i as f64).collect();
        let m = volume_momentum(&bars(&closes, &volumes), 5, 20);

        assert_eq!(m.force_index[0], 0.0);
        assert_eq!(m.force_index[3], volumes[3]);
        assert!((m.price_volume_correlation[29].unwrap() - 1.0).abs() < 1e-12);
        assert!(m.force_ema[29] > 0.0);

        let fading: Vec<f64> = (0..30).map(|i| if i < 25 { 100.0 } else { 10.0 }).collect();
        let m = volume_momentum(&bars(&closes, &fading), 5, 20);
        assert!(m.contracting[29]);
        assert_eq!(m.volume_trend[29], Some(-1));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(on_balance_volume(&[]), ObvSeries::default());
        let m = volume_momentum(&[], 5, 20);
        assert!(m.force_index.is_empty() && m.force_ema.is_empty());
    }
}
