// =============================================================================
// Market Conditions Report
// =============================================================================
//
// The engine's only externally visible artifact: one flat record per
// analysis call, built fresh and never mutated afterwards. Every numeric
// field is finite; undefined analyzer outputs are replaced by documented
// defaults before the report is assembled.

use serde::Serialize;

use crate::types::{Bias, FlowTrend, Regime, StrategyHint, TrendDirection};
use crate::zscore::StatCondition;

/// Fused market-condition report for the latest bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketConditions {
    // --- Identification ------------------------------------------------------
    pub symbol: String,
    /// Last bar's timestamp, RFC 3339.
    pub timestamp: String,

    // --- Regime ----------------------------------------------------------------
    pub regime: Regime,
    pub regime_confidence: f64,
    /// Smoothed Hurst value; 0.5 when undefined.
    pub hurst_value: f64,
    pub regime_description: String,
    pub strategy_hint: StrategyHint,

    // --- Trend -----------------------------------------------------------------
    pub current_price: f64,
    pub filtered_price: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub uncertainty: f64,
    pub trend_direction: TrendDirection,
    /// `current_price - filtered_price`.
    pub price_vs_filter: f64,

    // --- Statistical position --------------------------------------------------
    /// 0 when undefined.
    pub zscore: f64,
    /// 50 when undefined.
    pub percentile: f64,
    pub statistical_condition: StatCondition,
    /// Current price when undefined.
    pub rolling_mean: f64,
    /// 0 when undefined.
    pub rolling_std: f64,

    // --- Volume ------------------------------------------------------------------
    pub volume_delta_pct: f64,
    pub cumulative_delta: f64,
    pub cumulative_delta_trend: FlowTrend,
    /// 1.0 when undefined.
    pub relative_volume: f64,
    pub buying_pressure: bool,
    pub selling_pressure: bool,

    // --- Key levels ----------------------------------------------------------------
    pub point_of_control: f64,
    pub value_area_high: f64,
    pub value_area_low: f64,

    // --- Fusion ----------------------------------------------------------------------
    pub pullback_probability: f64,
    pub continuation_probability: f64,
    pub suggested_bias: Bias,
    pub confidence: f64,
    pub notes: Vec<String>,
    pub applied_rules: Vec<String>,
}

/// Lightweight screen produced from the tail of a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickScan {
    pub symbol: String,
    pub price: f64,
    pub regime: Regime,
    /// Unsmoothed Hurst estimate over the last 100 closes.
    pub hurst: f64,
    /// UP or DOWN only.
    pub trend: TrendDirection,
    pub velocity: f64,
    pub zscore: Option<f64>,
    pub recommendation: StrategyHint,
}

impl std::fmt::Display for QuickScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let z = self
            .zscore
            .map(|z| format!("{z:+.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        write!(
            f,
            "{:<12} {:>12.4}  {:<15} H={:.3}  {:<4} Z={:<6} -> {}",
            self.symbol,
            self.price,
            self.regime.to_string(),
            self.hurst,
            self.trend.to_string(),
            z,
            self.recommendation
        )
    }
}

impl MarketConditions {
    /// Flat key/value view for transports that want a map.
    pub fn to_flat_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

fn pct(x: f64) -> String {
    format!("{:.0}%", x * 100.0)
}

impl std::fmt::Display for MarketConditions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "  MARKET ANALYSIS: {}", self.symbol)?;
        writeln!(f, "  {}", self.timestamp)?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;

        writeln!(f, "REGIME: {} (H={:.3})", self.regime, self.hurst_value)?;
        writeln!(f, "   Confidence: {}", pct(self.regime_confidence))?;
        writeln!(f, "   {}", self.regime_description)?;
        writeln!(f, "   Strategy:   {}", self.strategy_hint)?;
        writeln!(f)?;

        writeln!(f, "TREND: {}", self.trend_direction)?;
        writeln!(f, "   Current Price:  {:.2}", self.current_price)?;
        writeln!(f, "   Filtered Price: {:.2}", self.filtered_price)?;
        writeln!(f, "   Velocity:       {:.4}", self.velocity)?;
        writeln!(f, "   Uncertainty:    {:.4}", self.uncertainty)?;
        writeln!(f)?;

        writeln!(f, "STATISTICAL POSITION: {}", self.statistical_condition)?;
        writeln!(f, "   Z-Score:    {:.2}", self.zscore)?;
        writeln!(f, "   Percentile: {:.0}%", self.percentile)?;
        writeln!(f)?;

        writeln!(f, "VOLUME:")?;
        writeln!(f, "   Delta %:          {:.1}%", self.volume_delta_pct)?;
        writeln!(f, "   Cumulative Trend: {}", self.cumulative_delta_trend)?;
        writeln!(f, "   Relative Volume:  {:.2}x", self.relative_volume)?;
        writeln!(f)?;

        writeln!(f, "KEY LEVELS:")?;
        writeln!(f, "   POC:        {:.2}", self.point_of_control)?;
        writeln!(
            f,
            "   Value Area: {:.2} - {:.2}",
            self.value_area_low, self.value_area_high
        )?;
        writeln!(f)?;

        writeln!(f, "PROBABILITIES:")?;
        writeln!(f, "   Pullback:     {}", pct(self.pullback_probability))?;
        writeln!(f, "   Continuation: {}", pct(self.continuation_probability))?;
        writeln!(f)?;

        writeln!(f, "SUGGESTED BIAS: {}", self.suggested_bias)?;
        writeln!(f, "   Confidence: {}", pct(self.confidence))?;
        writeln!(f)?;

        writeln!(f, "NOTES:")?;
        for note in &self.notes {
            writeln!(f, "   - {note}")?;
        }
        write!(f, "{rule}")
    }
}
