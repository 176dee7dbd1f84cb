// =============================================================================
// Two-State Kalman Trend Filter
// =============================================================================
//
// State x = [price, velocity], constant-velocity model:
//
//   F = [[1, 1],      H = [1, 0]      Q = q * I      R = r (scalar)
//        [0, 1]]
//
// Per bar:
//   predict   x' = F x              P' = F P F^T + Q
//   innovate  y  = z - x'_0         S  = P'_00 + R
//   gain      K  = P' H^T / S       (K_0 = P'_00 / S, K_1 = P'_10 / S)
//   update    x  = x' + K y         P  = (I - K H) P'
//
// With a 2x2 state the matrix algebra reduces to a handful of scalar
// expressions, written out below. Initial state is [first price, 0] with
// identity covariance.
//
// A larger R shrinks the gain, so the estimate leans on the model and
// smooths harder. The adaptive variant scales R per bar by normalized
// volatility: volatile bars are trusted less.

use serde::Serialize;
use tracing::debug;

use crate::error::EngineError;

/// Default process noise `q`.
pub const DEFAULT_PROCESS_NOISE: f64 = 0.01;

/// Default observation noise `r`.
pub const DEFAULT_OBSERVATION_NOISE: f64 = 1.0;

/// Lower and upper bound of the normalized volatility multiplier.
const VOL_SCALE_MIN: f64 = 0.2;
const VOL_SCALE_MAX: f64 = 2.0;

// =============================================================================
// Types
// =============================================================================

/// Filter output for one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrendState {
    pub filtered_price: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub uncertainty: f64,
}

/// Per-bar filter output as parallel sequences, each as long as the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSeries {
    pub filtered_price: Vec<f64>,
    pub velocity: Vec<f64>,
    /// First difference of velocity; the first element is 0.
    pub acceleration: Vec<f64>,
    /// Standard deviation of the price estimate, `sqrt(P_00)`.
    pub uncertainty: Vec<f64>,
}

impl TrendSeries {
    pub fn len(&self) -> usize {
        self.filtered_price.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered_price.is_empty()
    }

    /// State at bar `i`.
    pub fn get(&self, i: usize) -> Option<TrendState> {
        Some(TrendState {
            filtered_price: *self.filtered_price.get(i)?,
            velocity: *self.velocity.get(i)?,
            acceleration: *self.acceleration.get(i)?,
            uncertainty: *self.uncertainty.get(i)?,
        })
    }

    /// State at the most recent bar.
    pub fn latest(&self) -> Option<TrendState> {
        self.get(self.len().checked_sub(1)?)
    }
}

/// How the observation noise is chosen per bar.
#[derive(Debug, Clone, Copy)]
enum ObservationNoise<'a> {
    /// Same `r` on every bar.
    Constant(f64),
    /// Pre-computed `r` for each bar.
    PerBar(&'a [f64]),
}

impl ObservationNoise<'_> {
    fn at(&self, i: usize) -> f64 {
        match self {
            Self::Constant(r) => *r,
            Self::PerBar(rs) => rs[i],
        }
    }
}

/// Recursive state; lives only for the duration of one filter run.
#[derive(Debug, Clone, Copy)]
struct KalmanState {
    price: f64,
    velocity: f64,
    p00: f64,
    p01: f64,
    p10: f64,
    p11: f64,
}

impl KalmanState {
    fn new(first_price: f64) -> Self {
        Self {
            price: first_price,
            velocity: 0.0,
            p00: 1.0,
            p01: 0.0,
            p10: 0.0,
            p11: 1.0,
        }
    }

    fn step(&mut self, z: f64, q: f64, r: f64) {
        // Predict.
        let price_pred = self.price + self.velocity;
        let vel_pred = self.velocity;
        let pp00 = self.p00 + self.p10 + self.p01 + self.p11 + q;
        let pp01 = self.p01 + self.p11;
        let pp10 = self.p10 + self.p11;
        let pp11 = self.p11 + q;

        // Update.
        let innovation = z - price_pred;
        let s = pp00 + r;
        let k0 = pp00 / s;
        let k1 = pp10 / s;

        self.price = price_pred + k0 * innovation;
        self.velocity = vel_pred + k1 * innovation;
        self.p00 = (1.0 - k0) * pp00;
        self.p01 = (1.0 - k0) * pp01;
        self.p10 = pp10 - k1 * pp00;
        self.p11 = pp11 - k1 * pp01;
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Run the filter over `closes` with constant noise parameters.
pub fn filter(closes: &[f64], process_noise: f64, observation_noise: f64) -> TrendSeries {
    run(closes, process_noise, ObservationNoise::Constant(observation_noise))
}

/// Run the filter with observation noise scaled per bar by `volatility`.
///
/// Volatility is min-max normalized over its defined values into
/// `[0.2, 2.0]` and multiplies `base_observation_noise`. A flat volatility
/// series uses the base noise throughout, and bars with undefined volatility
/// use a multiplier of 1.
pub fn adaptive_filter(
    closes: &[f64],
    volatility: &[Option<f64>],
    process_noise: f64,
    base_observation_noise: f64,
) -> Result<TrendSeries, EngineError> {
    if volatility.len() != closes.len() {
        return Err(EngineError::LengthMismatch {
            expected: closes.len(),
            actual: volatility.len(),
        });
    }

    let scales = normalize_volatility(volatility);
    let noise: Vec<f64> = scales.iter().map(|s| base_observation_noise * s).collect();

    debug!(
        bars = closes.len(),
        base_r = format!("{:.4}", base_observation_noise),
        "Adaptive trend filter"
    );

    Ok(run(closes, process_noise, ObservationNoise::PerBar(&noise)))
}

fn run(closes: &[f64], q: f64, noise: ObservationNoise<'_>) -> TrendSeries {
    let n = closes.len();
    let Some(&first) = closes.first() else {
        return TrendSeries::default();
    };

    let mut state = KalmanState::new(first);
    let mut out = TrendSeries {
        filtered_price: Vec::with_capacity(n),
        velocity: Vec::with_capacity(n),
        acceleration: Vec::with_capacity(n),
        uncertainty: Vec::with_capacity(n),
    };

    for (i, &z) in closes.iter().enumerate() {
        state.step(z, q, noise.at(i));
        out.filtered_price.push(state.price);
        out.velocity.push(state.velocity);
        out.uncertainty.push(state.p00.max(0.0).sqrt());
    }

    out.acceleration.push(0.0);
    out.acceleration
        .extend(out.velocity.windows(2).map(|w| w[1] - w[0]));

    out
}

/// Min-max normalize into `[VOL_SCALE_MIN, VOL_SCALE_MAX]`.
fn normalize_volatility(volatility: &[Option<f64>]) -> Vec<f64> {
    let defined = volatility.iter().flatten().filter(|v| v.is_finite());
    let (lo, hi) = defined.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });

    let range = hi - lo;
    if !range.is_finite() || range < 1e-10 {
        return vec![1.0; volatility.len()];
    }

    volatility
        .iter()
        .map(|v| match v {
            Some(v) if v.is_finite() => {
                VOL_SCALE_MIN + (VOL_SCALE_MAX - VOL_SCALE_MIN) * (v - lo) / (range + 1e-10)
            }
            _ => 1.0,
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
    fn test_empty_input() {
        let out = filter(&[], 0.01, 1.0);
        assert!(out.is_empty());
        assert!(out.latest().is_none());
    }

    #[test]
    fn test_outputs_are_parallel() {
        let closes: Vec<f64> = (0..37).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let out = filter(&closes, 0.01, 1.0);
        assert_eq!(out.filtered_price.len(), 37);
        assert_eq!(out.velocity.len(), 37);
        assert_eq!(out.acceleration.len(), 37);
        assert_eq!(out.uncertainty.len(), 37);
        assert_eq!(out.acceleration[0], 0.0);
        assert!((out.acceleration[5] - (out.velocity[5] - out.velocity[4])).abs() < 1e-15);
    }

    #[test]
    fn test_constant_series_stays_put() {
        let closes = vec![250.0; 50];
        let out = filter(&closes, 0.01, 1.0);
        for i in 0..50 {
            assert_eq!(out.filtered_price[i], 250.0);
            assert_eq!(out.velocity[i], 0.0);
        }
    }

    #[test]
    fn test_first_step_uncertainty() {
        // P'_00 = 1 + 1 + 0.01 = 2.01, P_00 = 2.01 * 1 / 3.01.
        let out = filter(&[10.0, 11.0], 0.01, 1.0);
        let expected = (2.01_f64 / 3.01).sqrt();
        assert!((out.uncertainty[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_linear_ramp_velocity_converges() {
        let closes: Vec<f64> = (0..200).map(|i| 100.0 + i as f64).collect();
        let out = filter(&closes, 0.01, 1.0);
        for v in &out.velocity[50..] {
            assert!(*v > 0.0);
        }
        let last = out.latest().unwrap();
        assert!((last.velocity - 1.0).abs() < 0.1, "velocity {}", last.velocity);
        assert!((last.filtered_price - 299.0).abs() < 1.0);
    }

    #[test]
    fn test_falling_ramp_has_negative_velocity() {
        let closes: Vec<f64> = (0..120).map(|i| 500.0 - 2.0 * i as f64).collect();
        let out = filter(&closes, 0.01, 1.0);
        assert!(out.latest().unwrap().velocity < -1.5);
    }

    #[test]
    fn test_uncertainty_is_non_negative() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + ((i * 7) % 11) as f64).collect();
        let out = filter(&closes, 0.05, 0.5);
        assert!(out.uncertainty.iter().all(|u| *u >= 0.0 && u.is_finite()));
    }

    #[test]
    fn test_adaptive_length_mismatch() {
        let closes = vec![1.0; 10];
        let vol = vec![Some(1.0); 9];
        let err = adaptive_filter(&closes, &vol, 0.01, 1.0).unwrap_err();
        assert_eq!(
            err,
            EngineError::LengthMismatch {
                expected: 10,
                actual: 9
            }
        );
    }

    #[test]
    fn test_adaptive_flat_volatility_matches_plain_filter() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.2).cos() * 3.0).collect();
        let vol = vec![Some(0.7); 60];
        let adaptive = adaptive_filter(&closes, &vol, 0.01, 1.0).unwrap();
        let plain = filter(&closes, 0.01, 1.0);
        assert_eq!(adaptive, plain);
    }

    #[test]
    fn test_high_volatility_damps_response() {
        let mut closes = vec![100.0; 30];
        closes.extend(std::iter::repeat(110.0).take(5));
        // Bar 0 is the calm reference; every later bar is at peak volatility.
        let mut vol = vec![Some(1.0); closes.len()];
        vol[0] = Some(0.0);

        let adaptive = adaptive_filter(&closes, &vol, 0.01, 1.0).unwrap();
        let plain = filter(&closes, 0.01, 1.0);
        assert!(adaptive.filtered_price[30] < plain.filtered_price[30]);
        assert!(adaptive.filtered_price[30] > 100.0);
    }

    #[test]
    fn test_normalize_volatility_range() {
        let vol = vec![None, Some(1.0), Some(3.0), Some(2.0), Some(f64::NAN)];
        let scales = normalize_volatility(&vol);
        assert_eq!(scales[0], 1.0);
        assert!((scales[1] - 0.2).abs() < 1e-9);
        assert!((scales[2] - 2.0).abs() < 1e-9);
        assert!((scales[3] - 1.1).abs() < 1e-9);
        assert_eq!(scales[4], 1.0);
    }

    #[test]
    fn test_normalize_all_undefined() {
        let scales = normalize_volatility(&[None, None]);
        assert_eq!(scales, vec![1.0, 1.0]);
    }
}
