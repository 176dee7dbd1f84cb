// =============================================================================
// Rolling Z-Score & Percentile Rank
// =============================================================================
//
// For every bar i, over the trailing window prices[max(0, i + 1 - w) ..= i]:
//
//   mean  = arithmetic mean
//   std   = sample standard deviation (divisor n - 1)
//   Z     = (price_i - mean) / std
//   pct   = share of the window's earlier values strictly below price_i
//
// Fewer than `min_periods` values leaves the bar undefined. A window whose
// std is zero (relative to the mean's magnitude) gives an undefined Z rather
// than an infinity.
//
// Flags per bar:
//   extreme_low  Z < -2        extreme_high  Z > 2
//   mild_low     -2 <= Z < -1  mild_high     1 < Z <= 2
//   neutral      |Z| <= 1

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::indicators::moments::{mean, sample_std};

/// Default rolling window.
pub const DEFAULT_WINDOW: usize = 20;

/// Relative floor under which a standard deviation counts as zero.
const STD_FLOOR: f64 = 1e-12;

// =============================================================================
// Types
// =============================================================================

/// Rolling statistics for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ZScorePoint {
    pub zscore: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    /// Percentile rank in `[0, 100]`.
    pub percentile: Option<f64>,
    pub extreme_low: bool,
    pub extreme_high: bool,
    pub mild_low: bool,
    pub mild_high: bool,
    pub neutral: bool,
}

/// One [`ZScorePoint`] per input bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ZScoreSeries {
    pub points: Vec<ZScorePoint>,
}

impl ZScoreSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&ZScorePoint> {
        self.points.last()
    }

    /// Z column.
    pub fn zscores(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.zscore).collect()
    }
}

/// Distributional position of a Z value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatCondition {
    ExtremeOversold,
    Oversold,
    Low,
    SlightlyLow,
    Neutral,
    SlightlyHigh,
    High,
    Overbought,
    ExtremeOverbought,
    Unknown,
}

impl StatCondition {
    /// `OVERSOLD` or `EXTREME_OVERSOLD`.
    pub fn is_oversold(self) -> bool {
        matches!(self, Self::Oversold | Self::ExtremeOversold)
    }

    /// `OVERBOUGHT` or `EXTREME_OVERBOUGHT`.
    pub fn is_overbought(self) -> bool {
        matches!(self, Self::Overbought | Self::ExtremeOverbought)
    }
}

impl std::fmt::Display for StatCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExtremeOversold => write!(f, "EXTREME_OVERSOLD"),
            Self::Oversold => write!(f, "OVERSOLD"),
            Self::Low => write!(f, "LOW"),
            Self::SlightlyLow => write!(f, "SLIGHTLY_LOW"),
            Self::Neutral => write!(f, "NEUTRAL"),
            Self::SlightlyHigh => write!(f, "SLIGHTLY_HIGH"),
            Self::High => write!(f, "HIGH"),
            Self::Overbought => write!(f, "OVERBOUGHT"),
            Self::ExtremeOverbought => write!(f, "EXTREME_OVERBOUGHT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Rolling mean with `±k·std` bands for `k = 1..=num_bands`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZScoreBands {
    pub mean: Vec<Option<f64>>,
    pub std: Vec<Option<f64>>,
    /// `upper[k - 1][i]` is `mean + k·std` at bar `i`.
    pub upper: Vec<Vec<Option<f64>>>,
    /// `lower[k - 1][i]` is `mean - k·std` at bar `i`.
    pub lower: Vec<Vec<Option<f64>>>,
}

// =============================================================================
// Computation
// =============================================================================

/// Rolling Z-score, mean, std and percentile for every bar.
///
/// `min_periods` defaults to `window` when `None`.
pub fn rolling_zscore(prices: &[f64], window: usize, min_periods: Option<usize>) -> ZScoreSeries {
    let min_periods = min_periods.unwrap_or(window).max(1);
    if window == 0 {
        return ZScoreSeries {
            points: vec![ZScorePoint::default(); prices.len()],
        };
    }

    let points: Vec<ZScorePoint> = (0..prices.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            zscore_point(&prices[start..=i], min_periods)
        })
        .collect();

    if let Some(last) = points.last() {
        trace!(
            bars = prices.len(),
            window,
            zscore = format!("{:.4}", last.zscore.unwrap_or(f64::NAN)),
            "Rolling Z-score computed"
        );
    }

    ZScoreSeries { points }
}

fn zscore_point(window: &[f64], min_periods: usize) -> ZScorePoint {
    let valid: Vec<f64> = window.iter().copied().filter(|v| v.is_finite()).collect();
    if valid.len() < min_periods {
        return ZScorePoint::default();
    }

    let Some(&current) = window.last() else {
        return ZScorePoint::default();
    };

    let m = mean(&valid);
    let std = match (m, sample_std(&valid)) {
        (Some(m), Some(s)) if s > STD_FLOOR * m.abs().max(1.0) => Some(s),
        _ => None,
    };

    let zscore = match (m, std) {
        (Some(m), Some(s)) if current.is_finite() => Some((current - m) / s),
        _ => None,
    };

    let mut point = ZScorePoint {
        zscore,
        mean: m,
        std,
        percentile: Some(percentile_rank(window)),
        ..ZScorePoint::default()
    };

    if let Some(z) = zscore {
        point.extreme_low = z < -2.0;
        point.extreme_high = z > 2.0;
        point.mild_low = (-2.0..-1.0).contains(&z);
        point.mild_high = z > 1.0 && z <= 2.0;
        point.neutral = (-1.0..=1.0).contains(&z);
    }

    point
}

/// Percentage of the window's earlier values strictly below its last value.
///
/// A window shorter than two values, or containing a non-finite value, ranks
/// at the median (50).
fn percentile_rank(window: &[f64]) -> f64 {
    if window.len() < 2 || window.iter().any(|v| !v.is_finite()) {
        return 50.0;
    }
    let (history, current) = window.split_at(window.len() - 1);
    let below = history.iter().filter(|v| **v < current[0]).count();
    below as f64 / history.len() as f64 * 100.0
}

/// Map a Z value to a [`StatCondition`] and an extremity score.
///
/// The score is `|Z|` (0 for neutral), capped at 5 for the extreme bands.
pub fn classify_zscore(zscore: Option<f64>) -> (StatCondition, f64) {
    let Some(z) = zscore.filter(|z| !z.is_nan()) else {
        return (StatCondition::Unknown, 0.0);
    };

    let abs_z = z.abs();
    let high = z > 0.0;

    if abs_z < 0.5 {
        (StatCondition::Neutral, 0.0)
    } else if abs_z < 1.0 {
        let c = if high { StatCondition::SlightlyHigh } else { StatCondition::SlightlyLow };
        (c, abs_z)
    } else if abs_z < 2.0 {
        let c = if high { StatCondition::High } else { StatCondition::Low };
        (c, abs_z)
    } else if abs_z < 3.0 {
        let c = if high { StatCondition::Overbought } else { StatCondition::Oversold };
        (c, abs_z)
    } else {
        let c = if high {
            StatCondition::ExtremeOverbought
        } else {
            StatCondition::ExtremeOversold
        };
        (c, abs_z.min(5.0))
    }
}

/// Rolling mean and standard-deviation bands.
///
/// Bars with fewer than `window` values are undefined.
pub fn zscore_bands(prices: &[f64], window: usize, num_bands: usize) -> ZScoreBands {
    let mut means = vec![None; prices.len()];
    let mut stds = vec![None; prices.len()];

    if window > 0 {
        for i in (window - 1)..prices.len() {
            let slice = &prices[i + 1 - window..=i];
            if slice.iter().all(|v| v.is_finite()) {
                means[i] = mean(slice);
                stds[i] = sample_std(slice);
            }
        }
    }

    let band = |k: f64| -> Vec<Option<f64>> {
        means
            .iter()
            .zip(&stds)
            .map(|(m, s)| Some((*m)? + k * (*s)?))
            .collect()
    };

    let upper = (1..=num_bands).map(|k| band(k as f64)).collect();
    let lower = (1..=num_bands).map(|k| band(-(k as f64))).collect();

    ZScoreBands {
        mean: means,
        std: stds,
        upper,
        lower,
    }
}
