// =============================================================================
// Trend Filter Module
// =============================================================================
//
// Noise-filtered trend estimation with a two-state (price, velocity) Kalman
// filter, its volatility-adaptive variant, signals derived from it and a
// lag comparison against a plain EMA.

pub mod kalman;
pub mod signals;

pub use kalman::{adaptive_filter, filter, TrendSeries, TrendState};
pub use signals::{
    bands, compare_kalman_ema, trend_signal, LagComparison, TrendBands, TrendSignal,
};
