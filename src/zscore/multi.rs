// =============================================================================
// Multi-Timeframe Z-Score Confluence
// =============================================================================
//
// Computes a rolling Z-score per window and measures how far the windows
// agree on direction:
//
//   confluence = mean(sign(Z_w))   over windows with a defined Z
//   strength   = |confluence|
//   avg_mag    = mean(|Z_w|)
//
// Confluence below -0.8 flags aligned oversold, above 0.8 aligned overbought.

use serde::Serialize;

use crate::zscore::rolling::rolling_zscore;

/// Windows used when the caller does not supply any.
pub const DEFAULT_WINDOWS: [usize; 3] = [20, 50, 100];

/// Agreement level beyond which the windows count as aligned.
const ALIGNMENT_THRESHOLD: f64 = 0.8;

/// Per-window Z columns plus bar-wise confluence statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiTimeframeZScore {
    /// `(window, zscores)` in the order the windows were supplied.
    pub zscores: Vec<(usize, Vec<Option<f64>>)>,
    /// Mean sign across windows; undefined where no window has a Z.
    pub confluence: Vec<Option<f64>>,
    pub aligned_oversold: Vec<bool>,
    pub aligned_overbought: Vec<bool>,
    pub strength: Vec<Option<f64>>,
    pub avg_magnitude: Vec<Option<f64>>,
}

impl MultiTimeframeZScore {
    /// Z column for one window.
    pub fn for_window(&self, window: usize) -> Option<&[Option<f64>]> {
        self.zscores
            .iter()
            .find(|(w, _)| *w == window)
            .map(|(_, z)| z.as_slice())
    }
}

/// Confluence of rolling Z-scores across `windows`.
pub fn multi_timeframe_zscore(prices: &[f64], windows: &[usize]) -> MultiTimeframeZScore {
    let n = prices.len();
    let zscores: Vec<(usize, Vec<Option<f64>>)> = windows
        .iter()
        .map(|&w| (w, rolling_zscore(prices, w, None).zscores()))
        .collect();

    let mut confluence = Vec::with_capacity(n);
    let mut avg_magnitude = Vec::with_capacity(n);

    for i in 0..n {
        let defined: Vec<f64> = zscores.iter().filter_map(|(_, z)| z[i]).collect();
        if defined.is_empty() {
            confluence.push(None);
            avg_magnitude.push(None);
            continue;
        }
        let count = defined.len() as f64;
        let sign_sum: f64 = defined.iter().map(|z| sign(*z)).sum();
        let abs_sum: f64 = defined.iter().map(|z| z.abs()).sum();
        confluence.push(Some(sign_sum / count));
        avg_magnitude.push(Some(abs_sum / count));
    }

    let aligned_oversold = confluence
        .iter()
        .map(|c| c.is_some_and(|c| c < -ALIGNMENT_THRESHOLD))
        .collect();
    let aligned_overbought = confluence
        .iter()
        .map(|c| c.is_some_and(|c| c > ALIGNMENT_THRESHOLD))
        .collect();
    let strength = confluence.iter().map(|c| c.map(f64::abs)).collect();

    MultiTimeframeZScore {
        zscores,
        confluence,
        aligned_oversold,
        aligned_overbought,
        strength,
        avg_magnitude,
    }
}

/// -1, 0 or +1; zero maps to zero.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_series_aligns_overbought() {
        let prices: Vec<f64> = (0..150).map(|i| 100.0 + i as f64 * 0.5).collect();
        let m = multi_timeframe_zscore(&prices, &DEFAULT_WINDOWS);
        let last = prices.len() - 1;
        assert_eq!(m.confluence[last], Some(1.0));
        assert!(m.aligned_overbought[last]);
        assert!(!m.aligned_oversold[last]);
        assert_eq!(m.strength[last], Some(1.0));
        assert!(m.avg_magnitude[last].unwrap() > 1.0);
    }

    #[test]
    fn falling_series_aligns_oversold() {
        let prices: Vec<f64> = (0..150).map(|i| 300.0 - i as f64).collect();
        let m = multi_timeframe_zscore(&prices, &DEFAULT_WINDOWS);
        assert!(m.aligned_oversold[149]);
        assert_eq!(m.confluence[149], Some(-1.0));
    }

    #[test]
    fn partial_windows_use_defined_values_only() {
        // Only the 20-bar window is defined at bar 30.
        let prices: Vec<f64> = (0..60).map(|i| 50.0 + i as f64).collect();
        let m = multi_timeframe_zscore(&prices, &DEFAULT_WINDOWS);
        assert_eq!(m.confluence[30], Some(1.0));
        assert_eq!(m.confluence[5], None);
        assert!(!m.aligned_overbought[5]);
        assert!(m.for_window(100).unwrap()[59].is_none());
        assert!(m.for_window(20).unwrap()[59].is_some());
        assert!(m.for_window(7).is_none());
    }

    #[test]
    fn sign_of_zero_is_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.1), -1.0);
    }
}
