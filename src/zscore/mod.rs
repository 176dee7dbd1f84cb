// =============================================================================
// Statistical Position Module
// =============================================================================
//
// Where the current price sits in its recent distribution:
// - Rolling Z-score, mean, std and percentile rank
// - Discrete condition bands (OVERSOLD ... OVERBOUGHT)
// - Multi-window confluence
// - Mean-reversion positions, volatility-scaled thresholds, divergences

pub mod multi;
pub mod rolling;
pub mod signals;

pub use multi::{multi_timeframe_zscore, MultiTimeframeZScore};
pub use rolling::{
    classify_zscore, rolling_zscore, zscore_bands, StatCondition, ZScoreBands, ZScorePoint,
    ZScoreSeries,
};
pub use signals::{
    dynamic_zscore_threshold, mean_reversion_signal, zscore_divergence, DynamicThreshold,
    MeanReversionSignal, ZScoreDivergence,
};
