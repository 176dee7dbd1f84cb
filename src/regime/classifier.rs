// =============================================================================
// Regime Classifier
// =============================================================================
//
// Maps a (smoothed) Hurst exponent onto a discrete market regime with a
// confidence score and a suggested strategy.
//
//   H <  revert_threshold            =>  MEAN_REVERTING  (fade extremes)
//   H >  trend_threshold             =>  TRENDING        (follow momentum)
//   revert_threshold <= H <= trend   =>  RANDOM_WALK     (reduce risk)
//   undefined                        =>  UNKNOWN         (wait)
//
// Exact threshold values fall into RANDOM_WALK, so [0, 1] is partitioned
// with no gaps.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::{Regime, StrategyHint};

/// Default Hurst level above which the market is considered trending.
pub const DEFAULT_TREND_THRESHOLD: f64 = 0.6;

/// Default Hurst level below which the market is considered mean-reverting.
pub const DEFAULT_REVERT_THRESHOLD: f64 = 0.4;

// =============================================================================
// Types
// =============================================================================

/// Regime classification for a single Hurst reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeResult {
    /// Hurst value the classification was made from, if defined.
    pub hurst: Option<f64>,

    /// The classified regime.
    pub regime: Regime,

    /// Confidence in `[0, 1]`.
    pub confidence: f64,

    /// Suggested strategy family for this regime.
    pub strategy_hint: StrategyHint,

    /// Human-readable description.
    pub description: &'static str,
}

/// Five-bucket strength label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegimeStrength {
    StrongMeanRevert,
    WeakMeanRevert,
    RandomWalk,
    WeakTrend,
    StrongTrend,
    Unknown,
}

impl std::fmt::Display for RegimeStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongMeanRevert => write!(f, "STRONG_MEAN_REVERT"),
            Self::WeakMeanRevert => write!(f, "WEAK_MEAN_REVERT"),
            Self::RandomWalk => write!(f, "RANDOM_WALK"),
            Self::WeakTrend => write!(f, "WEAK_TREND"),
            Self::StrongTrend => write!(f, "STRONG_TREND"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Classify a Hurst reading into a regime.
///
/// `None` and NaN both map to [`Regime::Unknown`] with zero confidence.
pub fn classify_regime(
    hurst: Option<f64>,
    trend_threshold: f64,
    revert_threshold: f64,
) -> RegimeResult {
    let Some(h) = hurst.filter(|h| !h.is_nan()) else {
        return RegimeResult {
            hurst: None,
            regime: Regime::Unknown,
            confidence: 0.0,
            strategy_hint: StrategyHint::Wait,
            description: "Insufficient data to determine regime",
        };
    };

    let result = if h < revert_threshold {
        RegimeResult {
            hurst: Some(h),
            regime: Regime::MeanReverting,
            confidence: ((revert_threshold - h) / revert_threshold * 2.0).min(1.0),
            strategy_hint: StrategyHint::FadeExtremes,
            description: "Choppy market - buy dips, sell rips, fade extremes",
        }
    } else if h > trend_threshold {
        RegimeResult {
            hurst: Some(h),
            regime: Regime::Trending,
            confidence: ((h - trend_threshold) / (1.0 - trend_threshold) * 2.0).min(1.0),
            strategy_hint: StrategyHint::FollowMomentum,
            description: "Trending market - buy breakouts, hold winners, trail stops",
        }
    } else {
        RegimeResult {
            hurst: Some(h),
            regime: Regime::RandomWalk,
            confidence: (1.0 - (h - 0.5).abs() * 4.0).max(0.0),
            strategy_hint: StrategyHint::ReduceRisk,
            description: "No statistical edge - reduce position size, wait for clearer regime",
        }
    };

    trace!(
        hurst = format!("{:.4}", h),
        regime = %result.regime,
        confidence = format!("{:.2}", result.confidence),
        "Regime classified"
    );

    result
}

/// Bucket a Hurst reading into five strength bands.
pub fn regime_strength(hurst: Option<f64>) -> (RegimeStrength, f64) {
    let Some(h) = hurst.filter(|h| !h.is_nan()) else {
        return (RegimeStrength::Unknown, 0.0);
    };

    if h < 0.35 {
        (RegimeStrength::StrongMeanRevert, ((0.35 - h) / 0.35).min(1.0))
    } else if h < 0.45 {
        (RegimeStrength::WeakMeanRevert, (0.45 - h) / 0.1)
    } else if h < 0.55 {
        (RegimeStrength::RandomWalk, 1.0 - (h - 0.5).abs() * 10.0)
    } else if h < 0.65 {
        (RegimeStrength::WeakTrend, (h - 0.55) / 0.1)
    } else {
        (RegimeStrength::StrongTrend, ((h - 0.65) / 0.35).min(1.0))
    }
}

/// Flag shifts in a Hurst series.
///
/// Returns one value per input: `+1` when H rose by at least `threshold`
/// over `lookback` bars (toward trending), `-1` when it fell by at least as
/// much (toward mean reversion), `0` otherwise or when either end is
/// undefined.
pub fn detect_regime_change(hurst: &[Option<f64>], lookback: usize, threshold: f64) -> Vec<i8> {
    let mut changes = vec![0_i8; hurst.len()];

    for i in lookback..hurst.len() {
        let (Some(now), Some(then)) = (hurst[i], hurst[i - lookback]) else {
            continue;
        };
        let delta = now - then;
        if delta.is_finite() && delta.abs() >= threshold && delta != 0.0 {
            changes[i] = if delta > 0.0 { 1 } else { -1 };
        }
    }

    changes
}
