// =============================================================================
// Analysis Engine — Orchestrates the four analyzers and the fusion layer
// =============================================================================
//
// One call = one pure pass over an immutable bar series:
//
//   validate bars  ->  length check against the regime window
//     -> regime | trend | statistics | volume   (independent, optionally parallel)
//     -> latest-bar readings, NaN-safe defaults
//     -> fusion rules  ->  MarketConditions
//
// The engine holds only its configuration. Intermediate series are handed
// back as an explicit `Diagnostics` value; callers that want a shared
// last-run cache write it into a `DiagnosticsSlot`.
//
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine_config::EngineConfig;
use crate::error::EngineError;
use crate::fusion::{fuse, FusionInputs};
use crate::indicators::atr_series;
use crate::regime::{classify_regime, rolling_hurst, NEUTRAL_HURST};
use crate::report::{MarketConditions, QuickScan};
use crate::trend::{adaptive_filter, filter, TrendSeries};
use crate::types::{closes, validate_bars, FlowTrend, PriceBar, TrendDirection};
use crate::volume::{
    relative_volume, volume_delta, volume_profile, RelativeVolumeSeries, VolumeDeltaSeries,
    VolumeProfile,
};
use crate::zscore::{classify_zscore, rolling_zscore, ZScoreSeries};

/// Closes fed to the quick-scan Hurst estimate.
const QUICK_HURST_BARS: usize = 100;

/// Closes fed to the quick-scan trend filter.
const QUICK_TREND_BARS: usize = 50;

/// Closes fed to the quick-scan Z-score; a longer configured window
/// widens the tail to fit it.
const QUICK_ZSCORE_BARS: usize = 30;

/// Relative volume reported when the trailing average is undefined.
const NEUTRAL_RVOL: f64 = 1.0;

/// Percentile reported when the rolling window is undefined.
const NEUTRAL_PERCENTILE: f64 = 50.0;

// =============================================================================
// Diagnostics
// =============================================================================

/// Full per-bar output of every analyzer for one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub symbol: String,
    /// EMA-smoothed rolling Hurst exponent.
    pub hurst_series: Vec<Option<f64>>,
    pub trend: TrendSeries,
    pub zscore: ZScoreSeries,
    pub volume_delta: VolumeDeltaSeries,
    pub volume_profile: Option<VolumeProfile>,
    pub relative_volume: RelativeVolumeSeries,
}

/// Shared holder for the most recent [`Diagnostics`].
///
/// Writes replace the whole record; readers get an `Arc` snapshot and never
/// observe a partially written run.
#[derive(Debug, Default)]
pub struct DiagnosticsSlot {
    latest: RwLock<Option<Arc<Diagnostics>>>,
}

impl DiagnosticsSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, diagnostics: Diagnostics) {
        *self.latest.write() = Some(Arc::new(diagnostics));
    }

    pub fn snapshot(&self) -> Option<Arc<Diagnostics>> {
        self.latest.read().clone()
    }

    pub fn clear(&self) {
        *self.latest.write() = None;
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Market-regime fusion engine.
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    config: EngineConfig,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }
}

struct VolumeReadings {
    delta: VolumeDeltaSeries,
    profile: Option<VolumeProfile>,
    relative: RelativeVolumeSeries,
}

impl AnalysisEngine {
    /// Build an engine after validating `config`.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze one bar series and return the fused report.
    pub fn analyze(&self, bars: &[PriceBar], symbol: &str) -> Result<MarketConditions, EngineError> {
        self.analyze_with_diagnostics(bars, symbol)
            .map(|(conditions, _)| conditions)
    }

    /// Analyze and also store the intermediate series in `slot`.
    pub fn analyze_into(
        &self,
        bars: &[PriceBar],
        symbol: &str,
        slot: &DiagnosticsSlot,
    ) -> Result<MarketConditions, EngineError> {
        let (conditions, diagnostics) = self.analyze_with_diagnostics(bars, symbol)?;
        slot.store(diagnostics);
        Ok(conditions)
    }

    /// Analyze and return the report together with every analyzer's series.
    pub fn analyze_with_diagnostics(
        &self,
        bars: &[PriceBar],
        symbol: &str,
    ) -> Result<(MarketConditions, Diagnostics), EngineError> {
        validate_bars(bars)?;

        let cfg = &self.config;
        if bars.len() < cfg.hurst_window {
            return Err(EngineError::InsufficientData {
                required: cfg.hurst_window,
                actual: bars.len(),
            });
        }

        let prices = closes(bars);
        let diagnostics = self.run_analyzers(bars, &prices, symbol)?;
        let conditions = self.assemble(bars, &prices, symbol, &diagnostics);

        info!(
            symbol = %symbol,
            bars = bars.len(),
            regime = %conditions.regime,
            hurst = format!("{:.4}", conditions.hurst_value),
            bias = %conditions.suggested_bias,
            confidence = format!("{:.3}", conditions.confidence),
            "Analysis complete"
        );

        Ok((conditions, diagnostics))
    }

    /// Analyze several symbols. A failing symbol maps to `None` and is
    /// logged; the rest of the batch still runs.
    pub fn analyze_multiple(
        &self,
        series: &BTreeMap<String, Vec<PriceBar>>,
    ) -> BTreeMap<String, Option<MarketConditions>> {
        series
            .par_iter()
            .map(|(symbol, bars)| {
                let result = match self.analyze(bars, symbol) {
                    Ok(conditions) => Some(conditions),
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Analysis failed, skipping symbol");
                        None
                    }
                };
                (symbol.clone(), result)
            })
            .collect()
    }

    /// Cheap screen over the tail of the series.
    pub fn quick_scan(&self, bars: &[PriceBar], symbol: &str) -> Result<QuickScan, EngineError> {
        validate_bars(bars)?;
        let Some(last) = bars.last() else {
            return Err(EngineError::InsufficientData {
                required: 1,
                actual: 0,
            });
        };

        let cfg = &self.config;
        let prices = closes(bars);

        let hurst = cfg
            .hurst_method
            .estimate(tail(&prices, QUICK_HURST_BARS), cfg.hurst_max_lag);
        let regime = classify_regime(Some(hurst), cfg.trend_threshold, cfg.revert_threshold);

        let velocity = filter(
            tail(&prices, QUICK_TREND_BARS),
            cfg.process_noise,
            cfg.observation_noise,
        )
        .latest()
        .map(|s| s.velocity)
        .unwrap_or(0.0);
        let trend = if velocity > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        };

        let zscore_bars = QUICK_ZSCORE_BARS.max(cfg.zscore_window);
        let zscore = rolling_zscore(tail(&prices, zscore_bars), cfg.zscore_window, None)
            .latest()
            .and_then(|p| p.zscore);

        debug!(
            symbol = %symbol,
            hurst = format!("{:.4}", hurst),
            trend = %trend,
            "Quick scan"
        );

        Ok(QuickScan {
            symbol: symbol.to_string(),
            price: last.close,
            regime: regime.regime,
            hurst,
            trend,
            velocity,
            zscore,
            recommendation: regime.strategy_hint,
        })
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn run_analyzers(
        &self,
        bars: &[PriceBar],
        prices: &[f64],
        symbol: &str,
    ) -> Result<Diagnostics, EngineError> {
        let regime = || self.regime_series(prices);
        let trend = || self.trend_series(bars, prices);
        let stats = || rolling_zscore(prices, self.config.zscore_window, None);
        let volume = || self.volume_readings(bars);

        let ((hurst_series, trend), (zscore, volume)) = if self.config.parallel_analyzers {
            rayon::join(|| rayon::join(regime, trend), || rayon::join(stats, volume))
        } else {
            ((regime(), trend()), (stats(), volume()))
        };

        Ok(Diagnostics {
            symbol: symbol.to_string(),
            hurst_series,
            trend: trend?,
            zscore,
            volume_delta: volume.delta,
            volume_profile: volume.profile,
            relative_volume: volume.relative,
        })
    }

    fn regime_series(&self, prices: &[f64]) -> Vec<Option<f64>> {
        let cfg = &self.config;
        rolling_hurst(
            prices,
            cfg.hurst_window,
            cfg.hurst_smooth,
            cfg.hurst_method,
            cfg.hurst_max_lag,
        )
    }

    fn trend_series(&self, bars: &[PriceBar], prices: &[f64]) -> Result<TrendSeries, EngineError> {
        let cfg = &self.config;
        if cfg.adaptive_trend_filter {
            let volatility = atr_series(bars, cfg.volatility_period);
            adaptive_filter(prices, &volatility, cfg.process_noise, cfg.observation_noise)
        } else {
            Ok(filter(prices, cfg.process_noise, cfg.observation_noise))
        }
    }

    fn volume_readings(&self, bars: &[PriceBar]) -> VolumeReadings {
        let cfg = &self.config;
        VolumeReadings {
            delta: volume_delta(bars),
            profile: volume_profile(bars, cfg.profile_bins, cfg.value_area_pct),
            relative: relative_volume(bars, cfg.relative_volume_window),
        }
    }

    fn assemble(
        &self,
        bars: &[PriceBar],
        prices: &[f64],
        symbol: &str,
        d: &Diagnostics,
    ) -> MarketConditions {
        let cfg = &self.config;
        let last_bar = &bars[bars.len() - 1];
        let current_price = prices[prices.len() - 1];

        // --- Regime ----------------------------------------------------------
        let hurst = d.hurst_series.last().copied().flatten().filter(|h| h.is_finite());
        let regime = classify_regime(hurst, cfg.trend_threshold, cfg.revert_threshold);

        // --- Trend -------------------------------------------------------------
        let state = d.trend.latest().unwrap_or_default();
        let filtered_price = finite_or(state.filtered_price, current_price);
        let velocity = finite_or(state.velocity, 0.0);
        let trend_direction = TrendDirection::from_velocity(velocity, cfg.velocity_threshold);

        // --- Statistics --------------------------------------------------------
        let point = d.zscore.latest().copied().unwrap_or_default();
        let (stat_condition, _) = classify_zscore(point.zscore);
        let zscore = point.zscore.filter(|z| z.is_finite()).unwrap_or(0.0);

        // --- Volume --------------------------------------------------------------
        let last = d.volume_delta.len() - 1;
        let flow_trend = d
            .volume_delta
            .flow_trend(cfg.cum_delta_lookback)
            .unwrap_or(FlowTrend::Bearish);
        let relative_volume = d
            .relative_volume
            .rvol
            .last()
            .copied()
            .flatten()
            .filter(|r| r.is_finite())
            .unwrap_or(NEUTRAL_RVOL);
        let (point_of_control, value_area_low, value_area_high) = d
            .volume_profile
            .as_ref()
            .map(|p| (p.point_of_control, p.value_area_low, p.value_area_high))
            .unwrap_or((current_price, current_price, current_price));

        // --- Fusion --------------------------------------------------------------
        let outcome = fuse(&FusionInputs {
            regime: regime.regime,
            regime_confidence: regime.confidence,
            trend_direction,
            stat_condition,
            zscore,
            current_price,
            filtered_price,
            flow_trend,
        });

        MarketConditions {
            symbol: symbol.to_string(),
            timestamp: format_timestamp(last_bar.timestamp),

            regime: regime.regime,
            regime_confidence: regime.confidence,
            hurst_value: hurst.unwrap_or(NEUTRAL_HURST),
            regime_description: regime.description.to_string(),
            strategy_hint: regime.strategy_hint,

            current_price,
            filtered_price,
            velocity,
            acceleration: finite_or(state.acceleration, 0.0),
            uncertainty: finite_or(state.uncertainty, 0.0),
            trend_direction,
            price_vs_filter: current_price - filtered_price,

            zscore,
            percentile: point
                .percentile
                .filter(|p| p.is_finite())
                .unwrap_or(NEUTRAL_PERCENTILE),
            statistical_condition: stat_condition,
            rolling_mean: point.mean.filter(|m| m.is_finite()).unwrap_or(current_price),
            rolling_std: point.std.filter(|s| s.is_finite()).unwrap_or(0.0),

            volume_delta_pct: finite_or(d.volume_delta.delta_pct[last], 0.0),
            cumulative_delta: finite_or(d.volume_delta.cumulative_delta[last], 0.0),
            cumulative_delta_trend: flow_trend,
            relative_volume,
            buying_pressure: d.volume_delta.buying_pressure[last],
            selling_pressure: d.volume_delta.selling_pressure[last],

            point_of_control,
            value_area_high,
            value_area_low,

            pullback_probability: outcome.pullback_probability,
            continuation_probability: outcome.continuation_probability,
            suggested_bias: outcome.bias,
            confidence: outcome.confidence,
            notes: outcome.notes,
            applied_rules: outcome
                .applied_rules
                .iter()
                .map(|r| r.to_string())
                .collect(),
        }
    }
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        default
    }
}

fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
