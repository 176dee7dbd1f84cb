// =============================================================================
// Volume Summary — Latest-bar readings and a four-vote volume bias
// =============================================================================
//
// Votes on the latest bar:
//
//   buy side   buying pressure | close above VWAP | OBV trend up   | accumulation
//   sell side  selling pressure | close at/below VWAP | OBV trend down | distribution
//
// Three or more buy votes => BULLISH, else three or more sell votes =>
// BEARISH, else NEUTRAL.

use serde::{Deserialize, Serialize};

use crate::types::PriceBar;
use crate::volume::accumulation::accumulation_distribution;
use crate::volume::delta::volume_delta;
use crate::volume::obv::{
    on_balance_volume, volume_momentum, DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW,
};
use crate::volume::profile::{volume_profile, DEFAULT_BINS, DEFAULT_VALUE_AREA_PCT};
use crate::volume::relative::{relative_volume, vwap, DEFAULT_WINDOW};

const BIAS_VOTES: u8 = 3;

/// Direction suggested by the volume votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeBias {
    Bullish,
    Bearish,
    Neutral,
}

impl std::fmt::Display for VolumeBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "BULLISH"),
            Self::Bearish => write!(f, "BEARISH"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Latest-bar volume readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeSummary {
    pub delta_pct: f64,
    pub cumulative_delta: f64,
    pub relative_volume: Option<f64>,
    pub price_vs_vwap: f64,
    pub obv_trend: Option<i8>,
    pub volume_trend: Option<i8>,
    pub ad_trend: i8,
    pub point_of_control: f64,
    pub value_area_high: f64,
    pub value_area_low: f64,
    pub bias: VolumeBias,
    pub buy_votes: u8,
    pub sell_votes: u8,
}

/// Summarize every volume analyzer at the latest bar. `None` for no bars.
pub fn volume_summary(bars: &[PriceBar]) -> Option<VolumeSummary> {
    let last = bars.len().checked_sub(1)?;

    let delta = volume_delta(bars);
    let profile = volume_profile(bars, DEFAULT_BINS, DEFAULT_VALUE_AREA_PCT)?;
    let rvol = relative_volume(bars, DEFAULT_WINDOW);
    let vw = vwap(bars, DEFAULT_WINDOW);
    let obv = on_balance_volume(bars);
    let momentum = volume_momentum(bars, DEFAULT_SHORT_WINDOW, DEFAULT_LONG_WINDOW);
    let ad = accumulation_distribution(bars);

    let obv_trend = obv.trend[last];
    let above_vwap = vw.above_vwap[last];

    let buy_votes = [
        delta.buying_pressure[last],
        above_vwap,
        obv_trend == Some(1),
        ad.accumulation[last],
    ]
    .iter()
    .filter(|v| **v)
    .count() as u8;

    let sell_votes = [
        delta.selling_pressure[last],
        !above_vwap,
        obv_trend == Some(-1),
        ad.distribution[last],
    ]
    .iter()
    .filter(|v| **v)
    .count() as u8;

    let bias = if buy_votes >= BIAS_VOTES {
        VolumeBias::Bullish
    } else if sell_votes >= BIAS_VOTES {
        VolumeBias::Bearish
    } else {
        VolumeBias::Neutral
    };

    Some(VolumeSummary {
        delta_pct: delta.delta_pct[last],
        cumulative_delta: delta.cumulative_delta[last],
        relative_volume: rvol.rvol[last],
        price_vs_vwap: vw.price_vs_vwap[last],
        obv_trend,
        volume_trend: momentum.volume_trend[last],
        ad_trend: ad.trend[last],
        point_of_control: profile.point_of_control,
        value_area_high: profile.value_area_high,
        value_area_low: profile.value_area_low,
        bias,
        buy_votes,
        sell_votes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_closes_at_highs_are_bullish() {
        let bars: Vec<PriceBar> = (0..60)
            .map(|i| {
                let close = 100.0 + i as f64;
                PriceBar::new(i, close - 1.0, close, close - 2.0, close, 100.0)
            })
            .collect();
        let s = volume_summary(&bars).unwrap();
        assert_eq!(s.buy_votes, 4);
        assert_eq!(s.sell_votes, 0);
        assert_eq!(s.bias, VolumeBias::Bullish);
        assert_eq!(s.obv_trend, Some(1));
        assert!(s.price_vs_vwap > 0.0);
    }

    #[test]
    fn test_falling_closes_at_lows_are_bearish() {
        let bars: Vec<PriceBar> = (0..60)
            .map(|i| {
                let close = 200.0 - i as f64;
                PriceBar::new(i, close + 1.0, close + 2.0, close, close, 100.0)
            })
            .collect();
        let s = volume_summary(&bars).unwrap();
        assert_eq!(s.sell_votes, 4);
        assert_eq!(s.bias, VolumeBias::Bearish);
        assert_eq!(s.ad_trend, -1);
    }

    #[test]
    fn test_balanced_bars_are_neutral() {
        let bars: Vec<PriceBar> = (0..30)
            .map(|i| PriceBar::new(i, 100.0, 101.0, 99.0, 100.0, 10.0))
            .collect();
        let s = volume_summary(&bars).unwrap();
        assert_eq!(s.buy_votes, 0);
        assert!(s.sell_votes <= 1);
        assert_eq!(s.bias, VolumeBias::Neutral);
        assert_eq!(s.obv_trend, None);
        assert_eq!(s.relative_volume, Some(1.0));
    }

    #[test]
    fn test_empty_input() {
        assert!(volume_summary(&[]).is_none());
    }
}
