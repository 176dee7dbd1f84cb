// =============================================================================
// Relative Volume & VWAP
// =============================================================================
//
// RVOL compares each bar's volume with its trailing `window`-bar average
// (the window includes the bar itself):
//
//   rvol     = volume / avg
//   vol_z    = (volume - avg) / sample_std
//
// VWAP is anchored at the first bar and weights typical price by volume;
// the rolling variant uses the trailing `window` bars only.

use serde::Serialize;

use crate::indicators::moments::{mean, sample_std};
use crate::types::PriceBar;

/// Default lookback for RVOL and rolling VWAP.
pub const DEFAULT_WINDOW: usize = 20;

const HIGH_RVOL: f64 = 1.5;
const LOW_RVOL: f64 = 0.5;
const EXTREME_RVOL: f64 = 2.0;

/// Relative volume per bar. Entries before the first full window are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelativeVolumeSeries {
    pub rvol: Vec<Option<f64>>,
    pub avg_volume: Vec<Option<f64>>,
    pub volume_zscore: Vec<Option<f64>>,
    /// RVOL above 1.5.
    pub high_volume: Vec<bool>,
    /// RVOL below 0.5.
    pub low_volume: Vec<bool>,
    /// RVOL above 2.0.
    pub extreme_volume: Vec<bool>,
}

/// Cumulative and rolling VWAP with one- and two-sigma bands.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VwapSeries {
    pub vwap: Vec<f64>,
    pub rolling_vwap: Vec<Option<f64>>,
    pub upper_band_1: Vec<f64>,
    pub lower_band_1: Vec<f64>,
    pub upper_band_2: Vec<f64>,
    pub lower_band_2: Vec<f64>,
    /// `close - vwap`.
    pub price_vs_vwap: Vec<f64>,
    pub above_vwap: Vec<bool>,
}

/// Trailing-window relative volume.
pub fn relative_volume(bars: &[PriceBar], window: usize) -> RelativeVolumeSeries {
    let n = bars.len();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let mut out = RelativeVolumeSeries {
        rvol: vec![None; n],
        avg_volume: vec![None; n],
        volume_zscore: vec![None; n],
        high_volume: vec![false; n],
        low_volume: vec![false; n],
        extreme_volume: vec![false; n],
    };

    if window == 0 {
        return out;
    }

    for i in (window - 1)..n {
        let slice = &volumes[i + 1 - window..=i];
        let Some(avg) = mean(slice) else {
            continue;
        };
        out.avg_volume[i] = Some(avg);

        if avg > 0.0 {
            let rvol = volumes[i] / avg;
            out.rvol[i] = Some(rvol);
            out.high_volume[i] = rvol > HIGH_RVOL;
            out.low_volume[i] = rvol < LOW_RVOL;
            out.extreme_volume[i] = rvol > EXTREME_RVOL;
        }

        out.volume_zscore[i] = sample_std(slice)
            .filter(|s| *s > f64::EPSILON)
            .map(|s| (volumes[i] - avg) / s);
    }

    out
}

/// Session (anchored) and rolling VWAP over typical price.
///
/// Before any volume has traded the VWAP falls back to the typical price.
pub fn vwap(bars: &[PriceBar], window: usize) -> VwapSeries {
    let n = bars.len();
    let mut out = VwapSeries {
        vwap: Vec::with_capacity(n),
        rolling_vwap: vec![None; n],
        upper_band_1: Vec::with_capacity(n),
        lower_band_1: Vec::with_capacity(n),
        upper_band_2: Vec::with_capacity(n),
        lower_band_2: Vec::with_capacity(n),
        price_vs_vwap: Vec::with_capacity(n),
        above_vwap: Vec::with_capacity(n),
    };

    let typical: Vec<f64> = bars.iter().map(PriceBar::typical_price).collect();

    let mut cum_vol = 0.0_f64;
    let mut cum_tp_vol = 0.0_f64;
    let mut cum_sq = 0.0_f64;

    for (i, bar) in bars.iter().enumerate() {
        cum_vol += bar.volume;
        cum_tp_vol += typical[i] * bar.volume;

        let v = if cum_vol > 0.0 {
            cum_tp_vol / cum_vol
        } else {
            typical[i]
        };

        cum_sq += (typical[i] - v).powi(2) * bar.volume;
        let sigma = if cum_vol > 0.0 {
            (cum_sq / cum_vol).sqrt()
        } else {
            0.0
        };

        out.vwap.push(v);
        out.upper_band_1.push(v + sigma);
        out.lower_band_1.push(v - sigma);
        out.upper_band_2.push(v + 2.0 * sigma);
        out.lower_band_2.push(v - 2.0 * sigma);
        out.price_vs_vwap.push(bar.close - v);
        out.above_vwap.push(bar.close > v);
    }

    if window > 0 {
        for i in (window - 1)..n {
            let range = i + 1 - window..=i;
            let vol: f64 = bars[range.clone()].iter().map(|b| b.volume).sum();
            if vol > 0.0 {
                let tp_vol: f64 = bars[range.clone()]
                    .iter()
                    .zip(&typical[range])
                    .map(|(b, tp)| tp * b.volume)
                    .sum();
                out.rolling_vwap[i] = Some(tp_vol / vol);
            }
        }
    }

    out
}
