// =============================================================================
// Volume & Order-Flow Module
// =============================================================================
//
// Order-flow confirmation from OHLCV bars:
// - Per-bar buy/sell split and cumulative delta
// - Volume-at-price profile with point of control and value area
// - Relative volume and VWAP
// - On-balance volume, volume momentum and the A/D line
// - A latest-bar summary voting those readings into a volume bias

pub mod accumulation;
pub mod delta;
pub mod obv;
pub mod profile;
pub mod relative;
pub mod summary;

pub use accumulation::{accumulation_distribution, AccumulationSeries};
pub use delta::{volume_delta, VolumeDeltaSeries};
pub use obv::{on_balance_volume, volume_momentum, ObvSeries, VolumeMomentumSeries};
pub use profile::{volume_profile, VolumeProfile};
pub use relative::{relative_volume, vwap, RelativeVolumeSeries, VwapSeries};
pub use summary::{volume_summary, VolumeBias, VolumeSummary};
