// =============================================================================
// Fusion Engine — Probability Fusion & Bias
// =============================================================================
//
// Combines the latest regime, trend, statistical and order-flow readings into
// pullback / continuation probabilities, a directional bias and an overall
// confidence.
//
//   1. Start both probabilities at 0.5.
//   2. Apply every rule in `rules::RULES` whose predicate holds.
//   3. Renormalize so the two probabilities sum to 1.
//   4. Bias:
//        continuation > 0.6 in TRENDING        =>  trend direction
//        pullback     > 0.6 in MEAN_REVERTING  =>  fade the trend
//        otherwise                             =>  NEUTRAL
//      A NEUTRAL trend in either active case becomes WAIT.
//   5. confidence = min(max(p, c) * regime confidence, 0.95)

pub mod rules;

use serde::Serialize;
use tracing::debug;

use crate::types::{Bias, FlowTrend, Regime, TrendDirection};
use crate::zscore::StatCondition;

pub use rules::{FusionRule, RULES};

/// Probability above which a side is considered dominant.
const DOMINANCE: f64 = 0.6;

/// Upper bound on the reported confidence.
const MAX_CONFIDENCE: f64 = 0.95;

/// Latest-bar readings the rules are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionInputs {
    pub regime: Regime,
    pub regime_confidence: f64,
    pub trend_direction: TrendDirection,
    pub stat_condition: StatCondition,
    /// Z-score used in notes (already defaulted to 0 when undefined).
    pub zscore: f64,
    pub current_price: f64,
    pub filtered_price: f64,
    pub flow_trend: FlowTrend,
}

/// Result of running the rule table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionOutcome {
    pub pullback_probability: f64,
    pub continuation_probability: f64,
    pub bias: Bias,
    pub confidence: f64,
    /// One note per fired rule, in table order.
    pub notes: Vec<String>,
    /// Names of the fired rules, in table order.
    pub applied_rules: Vec<&'static str>,
}

/// Evaluate the rule table against `inputs`.
pub fn fuse(inputs: &FusionInputs) -> FusionOutcome {
    let mut pullback = 0.5_f64;
    let mut continuation = 0.5_f64;
    let mut notes = Vec::new();
    let mut applied_rules = Vec::new();

    for rule in RULES.iter().filter(|r| (r.applies)(inputs)) {
        pullback += rule.pullback_delta;
        continuation += rule.continuation_delta;
        notes.push((rule.note)(inputs));
        applied_rules.push(rule.name);
    }

    let total = pullback + continuation;
    if total > 0.0 {
        pullback /= total;
        continuation /= total;
    } else {
        pullback = 0.5;
        continuation = 0.5;
    }

    let bias = decide_bias(inputs, pullback, continuation);
    let confidence = (pullback.max(continuation) * inputs.regime_confidence).min(MAX_CONFIDENCE);

    debug!(
        pullback = format!("{:.3}", pullback),
        continuation = format!("{:.3}", continuation),
        bias = %bias,
        confidence = format!("{:.3}", confidence),
        rules = applied_rules.len(),
        "Fusion complete"
    );

    FusionOutcome {
        pullback_probability: pullback,
        continuation_probability: continuation,
        bias,
        confidence,
        notes,
        applied_rules,
    }
}

fn decide_bias(inputs: &FusionInputs, pullback: f64, continuation: f64) -> Bias {
    if continuation > DOMINANCE && inputs.regime == Regime::Trending {
        match inputs.trend_direction {
            TrendDirection::Up => Bias::Up,
            TrendDirection::Down => Bias::Down,
            TrendDirection::Neutral => Bias::Wait,
        }
    } else if pullback > DOMINANCE && inputs.regime == Regime::MeanReverting {
        match inputs.trend_direction {
            TrendDirection::Up => Bias::Down,
            TrendDirection::Down => Bias::Up,
            TrendDirection::Neutral => Bias::Wait,
        }
    } else {
        Bias::Neutral
    }
}
