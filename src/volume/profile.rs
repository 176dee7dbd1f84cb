// =============================================================================
// Volume Profile — Point of Control & Value Area
// =============================================================================
//
// Volume is histogrammed by typical price (H + L + C) / 3 into `num_bins`
// equal-width bins spanning [min(low), max(high)]. A price on an inner edge
// belongs to the lower bin; prices at or beyond the top edge land in the
// last bin.
//
//   POC         centre of the first bin with the most volume
//   Value area  starting at the POC bin, repeatedly add the neighbour with
//               more volume (ties go to the lower bin) until the included
//               volume reaches `value_area_pct` of the total. The bounds
//               are the outer edges of the included bins.
//   HVN / LVN   bins above mean + 1 std / below mean - 0.5 std of the bin
//               volumes (population std). With no HVN the POC stands in.

use serde::Serialize;
use tracing::debug;

use crate::indicators::moments::{mean, population_std};
use crate::types::PriceBar;

/// Default number of price bins.
pub const DEFAULT_BINS: usize = 20;

/// Default fraction of volume enclosed by the value area.
pub const DEFAULT_VALUE_AREA_PCT: f64 = 0.70;

/// Volume-at-price histogram and the levels derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeProfile {
    /// `num_bins + 1` ascending bin edges.
    pub bin_edges: Vec<f64>,
    pub bin_centers: Vec<f64>,
    pub volume_at_bin: Vec<f64>,
    pub point_of_control: f64,
    pub value_area_low: f64,
    pub value_area_high: f64,
    pub high_volume_nodes: Vec<f64>,
    pub low_volume_nodes: Vec<f64>,
    pub total_volume: f64,
}

/// Build the profile. `None` for an empty series or zero bins.
pub fn volume_profile(
    bars: &[PriceBar],
    num_bins: usize,
    value_area_pct: f64,
) -> Option<VolumeProfile> {
    if bars.is_empty() || num_bins == 0 {
        return None;
    }

    let lo = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let hi = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }

    let bin_edges = linspace(lo, hi, num_bins + 1);
    let bin_centers: Vec<f64> = bin_edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();

    let mut volume_at_bin = vec![0.0_f64; num_bins];
    for bar in bars {
        let idx = bin_index(&bin_edges[1..], bar.typical_price()).min(num_bins - 1);
        volume_at_bin[idx] += bar.volume;
    }

    let poc_idx = argmax_first(&volume_at_bin);
    let total_volume: f64 = volume_at_bin.iter().sum();
    let target = total_volume * value_area_pct;
    let (va_lo_idx, va_hi_idx) = value_area(&volume_at_bin, poc_idx, target);

    let vol_mean = mean(&volume_at_bin).unwrap_or(0.0);
    let vol_std = population_std(&volume_at_bin).unwrap_or(0.0);

    let hvn_threshold = vol_mean + vol_std;
    let mut high_volume_nodes =
        select_centers(&bin_centers, &volume_at_bin, |v| v > hvn_threshold);
    if high_volume_nodes.is_empty() {
        high_volume_nodes.push(bin_centers[poc_idx]);
    }

    let lvn_threshold = vol_mean - 0.5 * vol_std;
    let low_volume_nodes = select_centers(&bin_centers, &volume_at_bin, |v| v < lvn_threshold);

    let profile = VolumeProfile {
        point_of_control: bin_centers[poc_idx],
        value_area_low: bin_edges[va_lo_idx],
        value_area_high: bin_edges[va_hi_idx + 1],
        bin_edges,
        bin_centers,
        volume_at_bin,
        high_volume_nodes,
        low_volume_nodes,
        total_volume,
    };

    debug!(
        poc = format!("{:.4}", profile.point_of_control),
        va_low = format!("{:.4}", profile.value_area_low),
        va_high = format!("{:.4}", profile.value_area_high),
        "Volume profile built"
    );

    Some(profile)
}

/// `count` evenly spaced points from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }
    let step = (end - start) / (count - 1) as f64;
    let mut out: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
    // Pin the last edge so floating error never drops the maximum.
    if let Some(last) = out.last_mut() {
        *last = end;
    }
    out
}

/// Number of upper edges strictly below `price`.
fn bin_index(upper_edges: &[f64], price: f64) -> usize {
    upper_edges.partition_point(|edge| *edge < price)
}

fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Inclusive bin range of the value area.
fn value_area(volume: &[f64], poc: usize, target: f64) -> (usize, usize) {
    let n = volume.len();
    let (mut lo, mut hi) = (poc, poc);
    let mut current = volume[poc];

    while current < target && (lo > 0 || hi + 1 < n) {
        let left = if lo > 0 { volume[lo - 1] } else { 0.0 };
        let right = if hi + 1 < n { volume[hi + 1] } else { 0.0 };

        if lo > 0 && left >= right {
            lo -= 1;
            current += left;
        } else if hi + 1 < n {
            hi += 1;
            current += right;
        } else {
            break;
        }
    }

    (lo, hi)
}

fn select_centers(centers: &[f64], volume: &[f64], keep: impl Fn(f64) -> bool) -> Vec<f64> {
    centers
        .iter()
        .zip(volume)
        .filter(|(_, v)| keep(**v))
        .map(|(c, _)| *c)
        .collect()
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

    fn sample_bars() -> Vec<PriceBar> {
        (0..120)
            .map(|i| {
                let mid = 100.0 + ((i * 17) % 31) as f64 * 0.5;
                let vol = 10.0 + ((i * 7) % 13) as f64 * 5.0;
                bar(i, mid + 1.0, mid - 1.0, mid + 0.2, vol)
            })
            .collect()
    }

    #[test]
    fn test_empty_and_zero_bins() {
        assert!(volume_profile(&[], 20, 0.7).is_none());
        assert!(volume_profile(&sample_bars(), 0, 0.7).is_none());
    }

    #[test]
    fn test_volume_is_conserved() {
        let bars = sample_bars();
        let p = volume_profile(&bars, 20, 0.7).unwrap();
        let total: f64 = bars.iter().map(|b| b.volume).sum();
        let binned: f64 = p.volume_at_bin.iter().sum();
        assert!((total - binned).abs() < 1e-6);
        assert!((p.total_volume - total).abs() < 1e-6);
        assert_eq!(p.bin_edges.len(), 21);
        assert_eq!(p.bin_centers.len(), 20);
    }

    #[test]
    fn test_value_area_brackets_poc() {
        let p = volume_profile(&sample_bars(), 20, 0.7).unwrap();
        assert!(p.value_area_low <= p.point_of_control);
        assert!(p.point_of_control <= p.value_area_high);
        let lo = p.bin_edges[0];
        let hi = p.bin_edges[20];
        assert!(p.value_area_low >= lo && p.value_area_high <= hi);
    }

    #[test]
    fn test_value_area_reaches_target() {
        let bars = sample_bars();
        let p = volume_profile(&bars, 20, 0.7).unwrap();
        let enclosed: f64 = p
            .bin_centers
            .iter()
            .zip(&p.volume_at_bin)
            .filter(|(c, _)| **c >= p.value_area_low && **c <= p.value_area_high)
            .map(|(_, v)| v)
            .sum();
        assert!(enclosed >= 0.7 * p.total_volume - 1e-9);
    }

    #[test]
    fn test_poc_at_heaviest_level() {
        let bars = vec![
            bar(0, 101.0, 99.0, 100.0, 10.0),
            bar(1, 111.0, 109.0, 110.0, 500.0),
            bar(2, 121.0, 119.0, 120.0, 10.0),
        ];
        let p = volume_profile(&bars, 11, 0.7).unwrap();
        // Edges run 99..121 in steps of 2; 110 sits in bin 5 (109..111).
        assert!((p.point_of_control - 110.0).abs() < 1e-9);
        assert_eq!(p.high_volume_nodes, vec![110.0]);
        assert!((p.value_area_low - 109.0).abs() < 1e-9);
        assert!((p.value_area_high - 111.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_expands_left() {
        assert_eq!(value_area(&[5.0, 10.0, 5.0], 1, 15.0), (0, 1));
        assert_eq!(value_area(&[1.0, 10.0, 5.0], 1, 15.0), (1, 2));
        assert_eq!(value_area(&[3.0, 3.0, 10.0], 2, 100.0), (0, 2));
    }

    #[test]
    fn test_edge_price_goes_to_lower_bin() {
        let upper = [1.0, 2.0, 3.0];
        assert_eq!(bin_index(&upper, 1.0), 0);
        assert_eq!(bin_index(&upper, 1.5), 1);
        assert_eq!(bin_index(&upper, 3.0), 2);
        assert_eq!(bin_index(&upper, 9.0), 3);
    }

    #[test]
    fn test_single_price_level() {
        let bars = vec![bar(0, 50.0, 50.0, 50.0, 7.0); 4];
        let p = volume_profile(&bars, 20, 0.7).unwrap();
        assert_eq!(p.point_of_control, 50.0);
        assert_eq!(p.value_area_low, 50.0);
        assert_eq!(p.value_area_high, 50.0);
        assert_eq!(p.total_volume, 28.0);
    }

    #[test]
    fn test_zero_volume_profile() {
        let bars: Vec<PriceBar> = (0..5)
            .map(|i| bar(i, 10.0 + i as f64, 9.0, 9.5, 0.0))
            .collect();
        let p = volume_profile(&bars, 4, 0.7).unwrap();
        assert_eq!(p.total_volume, 0.0);
        assert!(p.value_area_low <= p.point_of_control && p.point_of_control <= p.value_area_high);
    }
}
