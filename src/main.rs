// =============================================================================
// Regime Fusion — Runner
// =============================================================================
//
// Reads bars from a JSON file, runs the engine and prints the report.
//
//   FUSION_BARS    path to a bar array, or to an object of symbol -> bar array
//   FUSION_SYMBOL  symbol name for a single bar array (default "UNKNOWN")
//   FUSION_CONFIG  engine config JSON (optional)
//   FUSION_PRESET  default | fast | smooth | aggressive (used without a config)
//   FUSION_OUTPUT  text | json (default text)
// =============================================================================

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use regime_fusion::{parse_bars_json, AnalysisEngine, EngineConfig, MarketConditions, PriceBar};

fn main() -> Result<()> {
    // ── 1. Environment & logging ────────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── 2. Engine config ────────────────────────────────────────────────────
    let config = load_config()?;
    let engine = AnalysisEngine::new(config).context("Engine config rejected")?;

    // ── 3. Input bars ───────────────────────────────────────────────────────
    let path = std::env::var("FUSION_BARS").context("FUSION_BARS is not set")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {path}"))?;
    let series = decode_series(&raw)?;
    info!(path = %path, symbols = series.len(), "Bars loaded");

    // ── 4. Analyze & print ──────────────────────────────────────────────────
    let json = match std::env::var("FUSION_OUTPUT") {
        Ok(v) if v.eq_ignore_ascii_case("json") => true,
        Ok(v) if v.eq_ignore_ascii_case("text") => false,
        Ok(other) => bail!("FUSION_OUTPUT must be 'text' or 'json', got '{other}'"),
        Err(_) => false,
    };

    if series.len() == 1 {
        for (symbol, bars) in &series {
            let conditions = engine.analyze(bars, symbol)?;
            print_conditions(&conditions, json)?;
        }
        return Ok(());
    }

    let results = engine.analyze_multiple(&series);
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (symbol, result) in &results {
            match result {
                Some(conditions) => println!("{conditions}\n"),
                None => println!("{symbol}: analysis failed\n"),
            }
        }
    }
    Ok(())
}

fn load_config() -> Result<EngineConfig> {
    if let Ok(path) = std::env::var("FUSION_CONFIG") {
        return Ok(EngineConfig::load(&path).unwrap_or_else(|e| {
            warn!(path = %path, error = %e, "Failed to load config, using defaults");
            EngineConfig::default()
        }));
    }
    match std::env::var("FUSION_PRESET") {
        Ok(name) => Ok(EngineConfig::preset(&name)?),
        Err(_) => Ok(EngineConfig::default()),
    }
}

/// A bare array is one symbol; an object maps symbol names to arrays.
fn decode_series(raw: &str) -> Result<BTreeMap<String, Vec<PriceBar>>> {
    let value: serde_json::Value = serde_json::from_str(raw).context("Bars file is not JSON")?;
    let mut series = BTreeMap::new();

    match value {
        serde_json::Value::Array(_) => {
            let symbol = std::env::var("FUSION_SYMBOL").unwrap_or_else(|_| "UNKNOWN".into());
            series.insert(symbol, parse_bars_json(raw)?);
        }
        serde_json::Value::Object(map) => {
            for (symbol, bars) in map {
                let bars = parse_bars_json(&bars.to_string())
                    .with_context(|| format!("Bad bars for {symbol}"))?;
                series.insert(symbol, bars);
            }
        }
        _ => bail!("Bars file must hold an array or an object of arrays"),
    }

    Ok(series)
}

fn print_conditions(conditions: &MarketConditions, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&conditions.to_flat_map())?);
    } else {
        println!("{conditions}");
    }
    Ok(())
}
