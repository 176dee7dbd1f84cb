// =============================================================================
// Shared types used across the analysis engine
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// =============================================================================
// Input bars
// =============================================================================

/// A single OHLCV bar. Bars are supplied oldest-first and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar open time in epoch milliseconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price `(high + low + close) / 3`.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Extract closing prices (oldest-first).
pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Check every bar for finite, non-negative fields, `high >= low` and strictly
/// increasing timestamps.
///
/// `low <= {open, close} <= high` is deliberately not enforced; violating it
/// only degrades the buy/sell pressure estimate.
pub fn validate_bars(bars: &[PriceBar]) -> Result<(), EngineError> {
    let mut prev_ts: Option<i64> = None;

    for (i, bar) in bars.iter().enumerate() {
        let fields = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
            ("volume", bar.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(EngineError::malformed(i, format!("{name} is not finite")));
            }
            if value < 0.0 {
                return Err(EngineError::malformed(i, format!("{name} is negative")));
            }
        }

        if bar.high < bar.low {
            return Err(EngineError::malformed(
                i,
                format!("high {} below low {}", bar.high, bar.low),
            ));
        }

        if let Some(prev) = prev_ts {
            if bar.timestamp <= prev {
                return Err(EngineError::malformed(
                    i,
                    format!("timestamp {} not after {}", bar.timestamp, prev),
                ));
            }
        }
        prev_ts = Some(bar.timestamp);
    }

    Ok(())
}

/// Decode a JSON array of bars. Missing or mistyped fields surface as
/// [`EngineError::MalformedInput`] before any analyzer runs.
pub fn parse_bars_json(json: &str) -> Result<Vec<PriceBar>, EngineError> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| EngineError::malformed(0, format!("not a JSON array of bars: {e}")))?;

    raw.into_iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value::<PriceBar>(value)
                .map_err(|e| EngineError::malformed(i, e.to_string()))
        })
        .collect()
}

// =============================================================================
// Classification enums
// =============================================================================

/// Long-memory regime derived from the Hurst exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Trending,
    MeanReverting,
    RandomWalk,
    Unknown,
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trending => write!(f, "TRENDING"),
            Self::MeanReverting => write!(f, "MEAN_REVERTING"),
            Self::RandomWalk => write!(f, "RANDOM_WALK"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Suggested trading approach for a regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyHint {
    FollowMomentum,
    FadeExtremes,
    ReduceRisk,
    Wait,
}

impl std::fmt::Display for StrategyHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FollowMomentum => write!(f, "FOLLOW_MOMENTUM"),
            Self::FadeExtremes => write!(f, "FADE_EXTREMES"),
            Self::ReduceRisk => write!(f, "REDUCE_RISK"),
            Self::Wait => write!(f, "WAIT"),
        }
    }
}

/// Direction of the filtered trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

impl TrendDirection {
    /// Classify a velocity against a symmetric dead band.
    pub fn from_velocity(velocity: f64, threshold: f64) -> Self {
        if velocity > threshold {
            Self::Up
        } else if velocity < -threshold {
            Self::Down
        } else {
            Self::Neutral
        }
    }

    /// +1 / -1 / 0.
    pub fn as_signal(self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
            Self::Neutral => 0,
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Direction of cumulative order flow over the lookback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowTrend {
    Bullish,
    Bearish,
}

impl std::fmt::Display for FlowTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "BULLISH"),
            Self::Bearish => write!(f, "BEARISH"),
        }
    }
}

/// Final directional bias of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bias {
    Up,
    Down,
    Neutral,
    Wait,
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Neutral => write!(f, "NEUTRAL"),
            Self::Wait => write!(f, "WAIT"),
        }
    }
}
