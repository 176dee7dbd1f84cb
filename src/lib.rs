// =============================================================================
// Regime Fusion — Market-regime analysis engine
// =============================================================================
//
// Turns an OHLCV bar series into one fused market-condition report:
// Hurst regime, Kalman trend, rolling Z-score position and order flow,
// combined by an ordered rule table into probabilities, bias and notes.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
pub mod engine;
pub mod engine_config;
pub mod error;
pub mod fusion;
pub mod indicators;
pub mod regime;
pub mod report;
pub mod trend;
pub mod types;
pub mod volume;
pub mod zscore;

#[cfg(test)]
mod test_support;

pub use engine::{AnalysisEngine, Diagnostics, DiagnosticsSlot};
pub use engine_config::EngineConfig;
pub use error::EngineError;
pub use report::{MarketConditions, QuickScan};
pub use types::{
    parse_bars_json, Bias, FlowTrend, PriceBar, Regime, StrategyHint, TrendDirection,
};
