// =============================================================================
// Engine Configuration — Tunables, presets and atomic persistence
// =============================================================================
//
// Every analysis parameter lives here so one engine instance can be tuned
// without touching the analyzers. All fields carry a serde default, so a
// partial JSON file (or `{}`) loads cleanly and older files keep working as
// fields are added.
//
// Persistence uses an atomic tmp + rename write.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EngineError;
use crate::regime::{hurst, HurstMethod};
use crate::trend::kalman;
use crate::volume::profile;
use crate::zscore::rolling;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_hurst_window() -> usize {
    100
}

fn default_hurst_smooth() -> usize {
    20
}

fn default_hurst_max_lag() -> usize {
    hurst::DEFAULT_MAX_LAG
}

fn default_zscore_window() -> usize {
    rolling::DEFAULT_WINDOW
}

fn default_process_noise() -> f64 {
    kalman::DEFAULT_PROCESS_NOISE
}

fn default_observation_noise() -> f64 {
    kalman::DEFAULT_OBSERVATION_NOISE
}

fn default_velocity_threshold() -> f64 {
    0.1
}

fn default_trend_threshold() -> f64 {
    0.6
}

fn default_revert_threshold() -> f64 {
    0.4
}

fn default_profile_bins() -> usize {
    profile::DEFAULT_BINS
}

fn default_value_area_pct() -> f64 {
    profile::DEFAULT_VALUE_AREA_PCT
}

fn default_lookback() -> usize {
    20
}

fn default_volatility_period() -> usize {
    14
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Tunable parameters for one analysis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    // --- Regime -------------------------------------------------------------

    /// Bars per rolling Hurst window; also the minimum series length.
    #[serde(default = "default_hurst_window")]
    pub hurst_window: usize,

    /// EMA period applied to the rolling Hurst series (<= 1 disables).
    #[serde(default = "default_hurst_smooth")]
    pub hurst_smooth: usize,

    /// Largest R/S lag, or largest DFA scale.
    #[serde(default = "default_hurst_max_lag")]
    pub hurst_max_lag: usize,

    #[serde(default)]
    pub hurst_method: HurstMethod,

    /// H above this is TRENDING.
    #[serde(default = "default_trend_threshold")]
    pub trend_threshold: f64,

    /// H below this is MEAN_REVERTING.
    #[serde(default = "default_revert_threshold")]
    pub revert_threshold: f64,

    // --- Trend filter -------------------------------------------------------

    /// Kalman process noise `q` (lower = smoother, more lag).
    #[serde(default = "default_process_noise")]
    pub process_noise: f64,

    /// Kalman observation noise `r` (higher = more smoothing).
    #[serde(default = "default_observation_noise")]
    pub observation_noise: f64,

    /// Velocity dead band for UP / DOWN classification.
    #[serde(default = "default_velocity_threshold")]
    pub velocity_threshold: f64,

    /// Scale observation noise per bar by ATR.
    #[serde(default)]
    pub adaptive_trend_filter: bool,

    /// ATR period feeding the adaptive filter.
    #[serde(default = "default_volatility_period")]
    pub volatility_period: usize,

    // --- Statistics ---------------------------------------------------------

    #[serde(default = "default_zscore_window")]
    pub zscore_window: usize,

    // --- Volume -------------------------------------------------------------

    #[serde(default = "default_profile_bins")]
    pub profile_bins: usize,

    /// Fraction of profile volume enclosed by the value area.
    #[serde(default = "default_value_area_pct")]
    pub value_area_pct: f64,

    /// Bars between the two CVD readings compared for flow trend.
    #[serde(default = "default_lookback")]
    pub cum_delta_lookback: usize,

    #[serde(default = "default_lookback")]
    pub relative_volume_window: usize,

    // --- Execution ----------------------------------------------------------

    /// Run the four analyzers on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel_analyzers: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hurst_window: default_hurst_window(),
            hurst_smooth: default_hurst_smooth(),
            hurst_max_lag: default_hurst_max_lag(),
            hurst_method: HurstMethod::default(),
            trend_threshold: default_trend_threshold(),
            revert_threshold: default_revert_threshold(),
            process_noise: default_process_noise(),
            observation_noise: default_observation_noise(),
            velocity_threshold: default_velocity_threshold(),
            adaptive_trend_filter: false,
            volatility_period: default_volatility_period(),
            zscore_window: default_zscore_window(),
            profile_bins: default_profile_bins(),
            value_area_pct: default_value_area_pct(),
            cum_delta_lookback: default_lookback(),
            relative_volume_window: default_lookback(),
            parallel_analyzers: true,
        }
    }
}

impl EngineConfig {
    /// Named factory presets: `default`, `fast`, `smooth`, `aggressive`.
    pub fn preset(name: &str) -> Result<Self, EngineError> {
        let base = Self::default();
        let cfg = match name.trim().to_ascii_lowercase().as_str() {
            "default" => base,
            "fast" => Self {
                hurst_window: 50,
                hurst_smooth: 10,
                zscore_window: 10,
                process_noise: 0.05,
                observation_noise: 0.5,
                ..base
            },
            "smooth" => Self {
                hurst_window: 150,
                hurst_smooth: 30,
                zscore_window: 30,
                process_noise: 0.005,
                observation_noise: 2.0,
                ..base
            },
            "aggressive" => Self {
                hurst_window: 100,
                hurst_smooth: 10,
                zscore_window: 15,
                process_noise: 0.02,
                observation_noise: 0.7,
                velocity_threshold: 0.05,
                ..base
            },
            other => {
                return Err(EngineError::InvalidConfig(format!(
                    "unknown preset '{other}' (expected default, fast, smooth or aggressive)"
                )))
            }
        };
        Ok(cfg)
    }

    /// Reject parameter combinations the analyzers cannot work with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let windows = [
            ("hurst_window", self.hurst_window),
            ("zscore_window", self.zscore_window),
            ("profile_bins", self.profile_bins),
            ("relative_volume_window", self.relative_volume_window),
            ("volatility_period", self.volatility_period),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(EngineError::InvalidConfig(format!("{name} must be > 0")));
            }
        }

        if self.hurst_max_lag <= 10 {
            return Err(EngineError::InvalidConfig(format!(
                "hurst_max_lag must exceed 10, got {}",
                self.hurst_max_lag
            )));
        }

        for (name, value) in [
            ("process_noise", self.process_noise),
            ("observation_noise", self.observation_noise),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        if !(self.velocity_threshold.is_finite() && self.velocity_threshold >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "velocity_threshold must be non-negative, got {}",
                self.velocity_threshold
            )));
        }

        let unit = 0.0..=1.0;
        if !unit.contains(&self.revert_threshold) || !unit.contains(&self.trend_threshold) {
            return Err(EngineError::InvalidConfig(
                "regime thresholds must lie in [0, 1]".to_string(),
            ));
        }
        if self.revert_threshold >= self.trend_threshold {
            return Err(EngineError::InvalidConfig(format!(
                "revert_threshold ({}) must be below trend_threshold ({})",
                self.revert_threshold, self.trend_threshold
            )));
        }

        if !(self.value_area_pct > 0.0 && self.value_area_pct <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "value_area_pct must lie in (0, 1], got {}",
                self.value_area_pct
            )));
        }

        Ok(())
    }

    /// Load configuration from a JSON file at `path`.
    ///
    /// The loaded file is validated; a missing or invalid file is an error so
    /// the caller can fall back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid engine config in {}", path.display()))?;

        info!(
            path = %path.display(),
            hurst_window = config.hurst_window,
            hurst_method = %config.hurst_method,
            zscore_window = config.zscore_window,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }
}
