// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// ATR is the volatility signal fed to the adaptive trend filter.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_0   = SMA of first `period` TR values
//   ATR_t   = (ATR_{t-1} * (period - 1) + TR_t) / period
// =============================================================================

use crate::types::PriceBar;

/// Per-bar ATR aligned with `bars`.
///
/// The first TR needs a previous close, so the first defined value sits at
/// index `period`; everything before it is `None`. A non-finite TR stops the
/// series there (later entries stay `None`).
pub fn atr_series(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if period == 0 || bars.len() < period + 1 {
        return out;
    }

    let tr_values: Vec<f64> = bars
        .windows(2)
        .map(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            // f64::max swallows NaN, so poison explicitly.
            if !(cur.high.is_finite() && cur.low.is_finite() && prev.close.is_finite()) {
                return f64::NAN;
            }
            let hl = cur.high - cur.low;
            let hc = (cur.high - prev.close).abs();
            let lc = (cur.low - prev.close).abs();
            hl.max(hc).max(lc)
        })
        .collect();

    // Seed with the SMA of the first `period` TR values. tr_values[k] belongs
    // to bar k + 1.
    let seed = tr_values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return out;
    }
    out[period] = Some(seed);

    let period_f = period as f64;
    let mut atr = seed;
    for (k, &tr) in tr_values.iter().enumerate().skip(period) {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            break;
        }
        out[k + 1] = Some(atr);
    }

    out
}

/// Most recent ATR value, if any.
pub fn latest_atr(bars: &[PriceBar], period: usize) -> Option<f64> {
    atr_series(bars, period).last().copied().flatten()
}
