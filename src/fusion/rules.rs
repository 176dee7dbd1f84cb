// =============================================================================
// Fusion Rule Table
// =============================================================================
//
// Each rule is an independent (predicate, adjustment, note) triple. The table
// is evaluated top to bottom; every rule whose predicate holds adds its
// deltas and appends its note, so note order always follows table order.
//
// Predicates within a group are mutually exclusive:
//   regime       TRENDING | MEAN_REVERTING | RANDOM_WALK | UNKNOWN
//   extremity    oversold (MR / other) | overbought (MR / other) | neither
//   extension    >2% above filter | >2% below | neither
//   flow         confirms up | confirms down | diverges

use crate::fusion::FusionInputs;
use crate::types::{FlowTrend, Regime, TrendDirection};

/// Fractional distance from the filtered trend that counts as extended.
const EXTENSION_BAND: f64 = 0.02;

/// One additive heuristic.
#[derive(Debug, Clone, Copy)]
pub struct FusionRule {
    pub name: &'static str,
    pub applies: fn(&FusionInputs) -> bool,
    pub pullback_delta: f64,
    pub continuation_delta: f64,
    pub note: fn(&FusionInputs) -> String,
}

/// The fixed evaluation order.
pub static RULES: [FusionRule; 13] = [
    FusionRule {
        name: "trending_regime",
        applies: |i| i.regime == Regime::Trending,
        pullback_delta: -0.10,
        continuation_delta: 0.15,
        note: |i| {
            format!(
                "Trending regime ({:.0}% confidence) favors momentum",
                i.regime_confidence * 100.0
            )
        },
    },
    FusionRule {
        name: "mean_reverting_regime",
        applies: |i| i.regime == Regime::MeanReverting,
        pullback_delta: 0.20,
        continuation_delta: -0.15,
        note: |_| "Mean-reverting regime - expect price to revert to mean".to_string(),
    },
    FusionRule {
        name: "random_walk_regime",
        applies: |i| i.regime == Regime::RandomWalk,
        pullback_delta: 0.0,
        continuation_delta: 0.0,
        note: |_| "Random walk regime - no statistical edge, reduce risk".to_string(),
    },
    FusionRule {
        name: "unknown_regime",
        applies: |i| i.regime == Regime::Unknown,
        pullback_delta: 0.0,
        continuation_delta: 0.0,
        note: |_| "Regime undetermined - not enough history for a Hurst estimate".to_string(),
    },
    FusionRule {
        name: "oversold_mean_reverting",
        applies: |i| i.stat_condition.is_oversold() && i.regime == Regime::MeanReverting,
        pullback_delta: 0.15,
        continuation_delta: 0.0,
        note: |i| {
            format!(
                "Oversold in mean-reverting regime - bounce likely (Z={:.2})",
                i.zscore
            )
        },
    },
    FusionRule {
        name: "oversold",
        applies: |i| i.stat_condition.is_oversold() && i.regime != Regime::MeanReverting,
        pullback_delta: 0.0,
        continuation_delta: 0.0,
        note: |i| format!("Statistically oversold (Z={:.2}) - watch for bounce", i.zscore),
    },
    FusionRule {
        name: "overbought_mean_reverting",
        applies: |i| i.stat_condition.is_overbought() && i.regime == Regime::MeanReverting,
        pullback_delta: 0.15,
        continuation_delta: 0.0,
        note: |i| {
            format!(
                "Overbought in mean-reverting regime - pullback likely (Z={:.2})",
                i.zscore
            )
        },
    },
    FusionRule {
        name: "overbought",
        applies: |i| i.stat_condition.is_overbought() && i.regime != Regime::MeanReverting,
        pullback_delta: 0.0,
        continuation_delta: 0.0,
        note: |i| {
            format!(
                "Statistically overbought (Z={:.2}) - watch for pullback",
                i.zscore
            )
        },
    },
    FusionRule {
        name: "extended_above_trend",
        applies: |i| i.current_price > i.filtered_price * (1.0 + EXTENSION_BAND),
        pullback_delta: 0.0,
        continuation_delta: 0.0,
        note: |_| "Price extended above trend filter".to_string(),
    },
    FusionRule {
        name: "extended_below_trend",
        applies: |i| i.current_price < i.filtered_price * (1.0 - EXTENSION_BAND),
        pullback_delta: 0.0,
        continuation_delta: 0.0,
        note: |_| "Price extended below trend filter".to_string(),
    },
    FusionRule {
        name: "flow_confirms_uptrend",
        applies: confirms_uptrend,
        pullback_delta: 0.0,
        continuation_delta: 0.10,
        note: |_| "Volume delta confirms uptrend".to_string(),
    },
    FusionRule {
        name: "flow_confirms_downtrend",
        applies: confirms_downtrend,
        pullback_delta: 0.0,
        continuation_delta: 0.10,
        note: |_| "Volume delta confirms downtrend".to_string(),
    },
    FusionRule {
        name: "flow_divergence",
        applies: |i| !confirms_uptrend(i) && !confirms_downtrend(i),
        pullback_delta: 0.05,
        continuation_delta: 0.0,
        note: |_| "Volume diverging from price trend".to_string(),
    },
];

fn confirms_uptrend(i: &FusionInputs) -> bool {
    i.flow_trend == FlowTrend::Bullish && i.trend_direction == TrendDirection::Up
}

fn confirms_downtrend(i: &FusionInputs) -> bool {
    i.flow_trend == FlowTrend::Bearish && i.trend_direction == TrendDirection::Down
}
