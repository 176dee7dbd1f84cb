// =============================================================================
// Exponential Moving Average (EMA) over a gappy series
// =============================================================================
//
// Used to smooth the rolling Hurst series, which is undefined for the first
// `window` bars.
//
// Formula:
//   alpha  = 2 / (period + 1)
//   EMA_t  = alpha * x_t + (1 - alpha) * EMA_{t-1}
//
// Unlike the textbook SMA seed, the first defined input seeds the EMA
// directly. An undefined input leaves the output undefined at that bar, and
// the next defined input re-seeds.
//
// `ewm_mean` is the bias-corrected form used by the volume flow indicators.
// =============================================================================

/// Smooth `values` with an EMA of the given `period`.
///
/// `period <= 1` returns the input unchanged. Non-finite inputs are treated
/// as undefined.
pub fn smooth_ema(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period <= 1 {
        return values.to_vec();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out: Vec<Option<f64>> = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for value in values {
        let next = match (value.filter(|v| v.is_finite()), prev) {
            (Some(v), Some(p)) => Some(alpha * v + (1.0 - alpha) * p),
            (Some(v), None) => Some(v),
            (None, _) => None,
        };
        out.push(next);
        prev = next;
    }

    out
}

/// Bias-corrected exponential mean over a dense series.
///
/// Every output is the `(1 - alpha)^k`-weighted average of all inputs so far,
/// so the first value equals the first input and early values are not pulled
/// toward a seed. Non-finite inputs are skipped and repeat the previous
/// output (`NaN` before the first finite input).
pub fn ewm_mean(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut numerator = 0.0_f64;
    let mut denominator = 0.0_f64;
    let mut last = f64::NAN;

    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                numerator = v + decay * numerator;
                denominator = 1.0 + decay * denominator;
                last = numerator / denominator;
            }
            last
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(smooth_ema(&[], 5).is_empty());
    }

    #[test]
    fn ema_period_one_is_identity() {
        let v = vec![None, Some(1.0), Some(2.0)];
        assert_eq!(smooth_ema(&v, 1), v);
    }

    #[test]
    fn ema_seeds_from_first_defined_value() {
        let v = vec![None, None, Some(0.7), Some(0.1)];
        let out = smooth_ema(&v, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(0.7));
        // alpha = 0.5
        assert!((out[3].unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn ema_known_values() {
        let closes: Vec<Option<f64>> = (1..=10).map(|x| Some(x as f64)).collect();
        let out = smooth_ema(&closes, 5);
        let mult = 2.0 / 6.0;
        let mut expected = 1.0;
        assert!((out[0].unwrap() - expected).abs() < 1e-12);
        for (i, c) in closes.iter().enumerate().skip(1) {
            expected = c.unwrap() * mult + expected * (1.0 - mult);
            assert!((out[i].unwrap() - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn ewm_first_value_is_input() {
        let out = ewm_mean(&[4.0, 4.0, 4.0], 20);
        assert_eq!(out, vec![4.0, 4.0, 4.0]);
        assert!(ewm_mean(&[], 5).is_empty());
    }

    #[test]
    fn ewm_is_bias_corrected() {
        // span 3 => alpha 0.5; second value = (2 + 0.5 * 1) / (1 + 0.5)
        let out = ewm_mean(&[1.0, 2.0, 3.0], 3);
        assert_eq!(out[0], 1.0);
        assert!((out[1] - 2.5 / 1.5).abs() < 1e-12);
        assert!((out[2] - (3.0 + 0.5 * 2.0 + 0.25) / 1.75).abs() < 1e-12);
    }

    #[test]
    fn ewm_skips_non_finite() {
        let out = ewm_mean(&[f64::NAN, 2.0, f64::NAN, 2.0], 5);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 2.0);
        assert_eq!(out[2], 2.0);
        assert_eq!(out[3], 2.0);
    }

    #[test]
    fn ema_gap_reseeds() {
        let v = vec![Some(1.0), Some(f64::NAN), Some(5.0)];
        let out = smooth_ema(&v, 9);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(5.0));
    }
}
