// =============================================================================
// Accumulation / Distribution Line
// =============================================================================
//
// The close location value weights each bar's volume by where the close
// sits in the range, from -1 (at the low) to +1 (at the high):
//
//   clv      = ((close - low) - (high - close)) / (high - low)
//   ad_t     = ad_{t-1} + clv * volume
//   trend    = sign(ad - ewm(ad, 20))
//
// Ranges under 1e-10 are floored to 1e-10, which puts a zero-range bar's
// CLV at 0.

use serde::Serialize;

use crate::indicators::ema::ewm_mean;
use crate::types::PriceBar;

const RANGE_FLOOR: f64 = 1e-10;
const AD_EMA_SPAN: usize = 20;

/// CLV above which a bar counts as accumulation.
const ACCUMULATION_CLV: f64 = 0.3;

/// CLV below which a bar counts as distribution.
const DISTRIBUTION_CLV: f64 = -0.3;

/// A/D line and per-bar money flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccumulationSeries {
    pub ad_line: Vec<f64>,
    pub ad_ema: Vec<f64>,
    /// Close location value in `[-1, 1]` for closes inside the range.
    pub clv: Vec<f64>,
    /// `clv * volume`.
    pub money_flow_volume: Vec<f64>,
    pub trend: Vec<i8>,
    pub accumulation: Vec<bool>,
    pub distribution: Vec<bool>,
}

fn close_location(bar: &PriceBar) -> f64 {
    let range = bar.high - bar.low;
    let range = if range < RANGE_FLOOR { RANGE_FLOOR } else { range };
    ((bar.close - bar.low) - (bar.high - bar.close)) / range
}

/// Accumulation/distribution line with its EMA trend.
pub fn accumulation_distribution(bars: &[PriceBar]) -> AccumulationSeries {
    let clv: Vec<f64> = bars.iter().map(close_location).collect();
    let money_flow_volume: Vec<f64> = clv.iter().zip(bars).map(|(c, b)| c * b.volume).collect();

    let mut running = 0.0_f64;
    let ad_line: Vec<f64> = money_flow_volume
        .iter()
        .map(|mf| {
            running += mf;
            running
        })
        .collect();
    let ad_ema = ewm_mean(&ad_line, AD_EMA_SPAN);

    let trend = ad_line
        .iter()
        .zip(&ad_ema)
        .map(|(ad, ema)| {
            let diff = ad - ema;
            if diff > 0.0 {
                1
            } else if diff < 0.0 {
                -1
            } else {
                0
            }
        })
        .collect();

    AccumulationSeries {
        accumulation: clv.iter().map(|c| *c > ACCUMULATION_CLV).collect(),
        distribution: clv.iter().map(|c| *c < DISTRIBUTION_CLV).collect(),
        ad_line,
        ad_ema,
        clv,
        money_flow_volume,
        trend,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, high: f64, low: f64, close: f64, volume: f64) -> PriceBar {
        PriceBar::new(ts, close, high, low, close, volume)
    }

    #[test]
    fn test_close_location_values() {
        let bars = vec![
            bar(0, 110.0, 100.0, 110.0, 10.0),
            bar(1, 110.0, 100.0, 100.0, 10.0),
            bar(2, 110.0, 100.0, 105.0, 10.0),
            bar(3, 100.0, 100.0, 100.0, 10.0),
            bar(4, 110.0, 100.0, 108.0, 10.0),
        ];
        let a = accumulation_distribution(&bars);
        assert_eq!(a.clv, vec![1.0, -1.0, 0.0, 0.0, 0.6]);
        assert_eq!(a.money_flow_volume[0], 10.0);
        assert_eq!(a.ad_line, vec![10.0, 0.0, 0.0, 0.0, 6.0]);
        assert_eq!(a.accumulation, vec![true, false, false, false, true]);
        assert_eq!(a.distribution, vec![false, true, false, false, false]);
        assert_eq!(a.trend[0], 0);
        assert_eq!(a.trend[4], 1);
    }

    #[test]
    fn test_persistent_selling_trends_down() {
        let bars: Vec<PriceBar> = (0..30)
            .map(|i| {
                let low = 100.0 - i as f64;
                bar(i, low + 2.0, low, low + 0.2, 50.0)
            })
            .collect();
        let a = accumulation_distribution(&bars);
        assert!(a.ad_line.windows(2).all(|w| w[1] < w[0]));
        assert!(a.trend[1..].iter().all(|t| *t == -1));
        assert!(a.distribution.iter().all(|d| *d));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(accumulation_distribution(&[]), AccumulationSeries::default());
    }
}
