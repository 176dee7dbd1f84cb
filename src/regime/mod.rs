// =============================================================================
// Regime Estimation Module
// =============================================================================
//
// Long-memory regime detection from the Hurst exponent:
// - Rescaled range (R/S) and detrended fluctuation (DFA) estimators
// - Rolling estimate with EMA smoothing
// - Threshold classification into TRENDING / MEAN_REVERTING / RANDOM_WALK

pub mod classifier;
pub mod dfa;
pub mod hurst;

pub use classifier::{
    classify_regime, detect_regime_change, regime_strength, RegimeResult, RegimeStrength,
};
pub use dfa::hurst_dfa;
pub use hurst::{hurst_rs, rolling_hurst, HurstMethod, NEUTRAL_HURST};
