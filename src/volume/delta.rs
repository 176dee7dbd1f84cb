// =============================================================================
// Volume Delta — Bar-Level Order-Flow Estimate
// =============================================================================
//
// Without tick data, each bar's volume is split by where the close sits in
// the bar's range:
//
//   buy_ratio = clamp((close - low) / (high - low), 0, 1)
//   buy       = volume * buy_ratio
//   sell      = volume - buy
//   delta     = buy - sell
//
// The larger share is computed first and the smaller one taken by
// subtraction, so `buy + sell == volume` holds exactly in floating point.
//
// A zero-range bar (high == low) carries no directional information and
// splits evenly (ratio 0.5, delta 0). The running sum of delta is the
// cumulative volume delta (CVD).

use serde::Serialize;
use tracing::trace;

use crate::types::{FlowTrend, PriceBar};

/// Ranges below this are treated as zero.
const RANGE_FLOOR: f64 = 1e-10;

/// Buy ratio above which a bar shows buying pressure.
const BUYING_PRESSURE: f64 = 0.6;

/// Buy ratio below which a bar shows selling pressure.
const SELLING_PRESSURE: f64 = 0.4;

/// Per-bar order-flow estimate as parallel sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeDeltaSeries {
    pub buy_volume: Vec<f64>,
    pub sell_volume: Vec<f64>,
    pub delta: Vec<f64>,
    /// Delta as a percentage of bar volume; 0 for zero-volume bars.
    pub delta_pct: Vec<f64>,
    pub cumulative_delta: Vec<f64>,
    pub buy_ratio: Vec<f64>,
    pub buying_pressure: Vec<bool>,
    pub selling_pressure: Vec<bool>,
}

impl VolumeDeltaSeries {
    pub fn len(&self) -> usize {
        self.delta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }

    /// Direction of CVD over the last `lookback` bars.
    ///
    /// Compares the latest CVD with its value `min(lookback, n - 1)` bars
    /// earlier: strictly greater is bullish, anything else bearish.
    pub fn flow_trend(&self, lookback: usize) -> Option<FlowTrend> {
        let last = self.cumulative_delta.len().checked_sub(1)?;
        let back = lookback.min(last);
        let now = self.cumulative_delta[last];
        let then = self.cumulative_delta[last - back];
        Some(if now > then {
            FlowTrend::Bullish
        } else {
            FlowTrend::Bearish
        })
    }
}

/// Estimate buy/sell volume for every bar.
pub fn volume_delta(bars: &[PriceBar]) -> VolumeDeltaSeries {
    let n = bars.len();
    let mut out = VolumeDeltaSeries {
        buy_volume: Vec::with_capacity(n),
        sell_volume: Vec::with_capacity(n),
        delta: Vec::with_capacity(n),
        delta_pct: Vec::with_capacity(n),
        cumulative_delta: Vec::with_capacity(n),
        buy_ratio: Vec::with_capacity(n),
        buying_pressure: Vec::with_capacity(n),
        selling_pressure: Vec::with_capacity(n),
    };

    let mut running = 0.0_f64;
    for bar in bars {
        let ratio = buy_ratio(bar);
        let (buy, sell) = split_volume(bar.volume, ratio);
        let delta = buy - sell;
        running += delta;

        out.buy_volume.push(buy);
        out.sell_volume.push(sell);
        out.delta.push(delta);
        out.delta_pct.push(if bar.volume > 0.0 {
            delta / bar.volume * 100.0
        } else {
            0.0
        });
        out.cumulative_delta.push(running);
        out.buy_ratio.push(ratio);
        out.buying_pressure.push(ratio > BUYING_PRESSURE);
        out.selling_pressure.push(ratio < SELLING_PRESSURE);
    }

    trace!(
        bars = n,
        cvd = format!("{:.2}", running),
        "Volume delta computed"
    );

    out
}

/// Split `volume` into (buy, sell) by `ratio`.
///
/// The smaller share is always `volume - larger` with the larger share in
/// `[volume / 2, volume]`, which is exact (Sterbenz), so the parts add back
/// to `volume` without rounding.
fn split_volume(volume: f64, ratio: f64) -> (f64, f64) {
    let buy = volume * ratio;
    if buy >= volume / 2.0 {
        (buy, volume - buy)
    } else {
        let sell = volume - buy;
        (volume - sell, sell)
    }
}

fn buy_ratio(bar: &PriceBar) -> f64 {
    let range = bar.high - bar.low;
    if range.is_nan() || range < RANGE_FLOOR {
        return 0.5;
    }
    ((bar.close - bar.low) / range).clamp(0.0, 1.0)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::XorShift;

    fn bar(high: f64, low: f64, close: f64, volume: f64) -> PriceBar {
        PriceBar::new(0, close, high, low, close, volume)
    }

    #[test]
    fn test_close_at_high_is_all_buying() {
        let d = volume_delta(&[bar(110.0, 100.0, 110.0, 50.0)]);
        assert_eq!(d.buy_volume[0], 50.0);
        assert_eq!(d.sell_volume[0], 0.0);
        assert_eq!(d.delta_pct[0], 100.0);
        assert!(d.buying_pressure[0]);
    }

    #[test]
    fn test_close_at_low_is_all_selling() {
        let d = volume_delta(&[bar(110.0, 100.0, 100.0, 50.0)]);
        assert_eq!(d.delta[0], -50.0);
        assert!(d.selling_pressure[0]);
    }

    #[test]
    fn test_zero_range_splits_evenly() {
        let d = volume_delta(&[bar(100.0, 100.0, 100.0, 80.0)]);
        assert_eq!(d.buy_ratio[0], 0.5);
        assert_eq!(d.delta[0], 0.0);
        assert!(!d.buying_pressure[0] && !d.selling_pressure[0]);
    }

    #[test]
    fn test_zero_volume_has_zero_pct() {
        let d = volume_delta(&[bar(110.0, 100.0, 108.0, 0.0)]);
        assert_eq!(d.delta_pct[0], 0.0);
        assert_eq!(d.delta[0], 0.0);
    }

    #[test]
    fn test_close_outside_range_is_clamped() {
        let d = volume_delta(&[bar(110.0, 100.0, 120.0, 10.0)]);
        assert_eq!(d.buy_ratio[0], 1.0);
        assert_eq!(d.sell_volume[0], 0.0);
    }

    #[test]
    fn test_buy_plus_sell_equals_volume() {
        let bars: Vec<PriceBar> = (0..100)
            .map(|i| {
                let low = 100.0 + (i % 9) as f64 * 0.37;
                let high = low + 1.0 + (i % 4) as f64 * 0.91;
                let close = low + (high - low) * ((i * 13) % 17) as f64 / 16.0;
                bar(high, low, close, 10.0 + i as f64 * 3.3)
            })
            .collect();
        let d = volume_delta(&bars);
        for (i, b) in bars.iter().enumerate() {
            assert_eq!(d.buy_volume[i] + d.sell_volume[i], b.volume, "bar {i}");
        }
        let total: f64 = d.delta.iter().sum();
        assert!((d.cumulative_delta[99] - total).abs() < 1e-6);
    }

    #[test]
    fn test_split_is_exact_for_arbitrary_bars() {
        let mut rng = XorShift::new(2024);
        let bars: Vec<PriceBar> = (0..50_000)
            .map(|_| {
                let low = 1.0 + rng.uniform() * 1000.0;
                let high = low + rng.uniform() * 20.0;
                let close = low + (high - low) * rng.uniform();
                let volume = rng.uniform() * 1e7;
                bar(high, low, close, volume)
            })
            .collect();
        let d = volume_delta(&bars);
        for (i, b) in bars.iter().enumerate() {
            assert_eq!(d.buy_volume[i] + d.sell_volume[i], b.volume, "bar {i}: {b:?}");
            assert!(d.buy_volume[i] >= 0.0 && d.sell_volume[i] >= 0.0);
        }
    }

    #[test]
    fn test_split_volume_small_buy_share() {
        // A volume where `buy + (volume - buy)` drifts for small buy shares.
        let volume = 4_188_835.495_744_538;
        for ratio in [0.0, 1e-9, 0.1, 0.3, 0.487_123, 0.5, 0.7, 0.999_999, 1.0] {
            let (buy, sell) = split_volume(volume, ratio);
            assert_eq!(buy + sell, volume, "ratio {ratio}");
            assert!((buy - volume * ratio).abs() <= volume * 1e-15);
        }
    }

    #[test]
    fn test_flow_trend() {
        let mut bars = vec![bar(110.0, 100.0, 100.0, 10.0); 5];
        bars.extend(vec![bar(110.0, 100.0, 110.0, 10.0); 5]);
        let d = volume_delta(&bars);
        assert_eq!(d.flow_trend(3), Some(FlowTrend::Bullish));
        // Lookback longer than history clamps to the first bar.
        assert_eq!(d.flow_trend(100), Some(FlowTrend::Bullish));
        assert_eq!(d.flow_trend(0), Some(FlowTrend::Bearish));
        assert_eq!(VolumeDeltaSeries::default().flow_trend(20), None);
    }
}
