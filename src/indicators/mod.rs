// =============================================================================
// Numeric Building Blocks
// =============================================================================
//
// Pure, side-effect-free helpers shared by the analyzers. Functions return
// `Option` so callers are forced to handle insufficient-data and
// numerical-edge-case scenarios.

pub mod atr;
pub mod ema;
pub mod moments;

pub use atr::{atr_series, latest_atr};
pub use ema::{ewm_mean, smooth_ema};
pub use moments::{correlation, linear_regression, mean, population_std, rolling_mean, sample_std};
