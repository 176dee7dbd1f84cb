// =============================================================================
// Deterministic series generators for unit tests
// =============================================================================

use crate::types::PriceBar;

/// xorshift64 generator so fixtures never depend on an RNG crate's stream.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1).wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in (0, 1).
    pub fn uniform(&mut self) -> f64 {
        ((self.next_u64() >> 11) as f64 + 0.5) / (1u64 << 53) as f64
    }

    /// Standard normal via Box-Muller.
    pub fn gaussian(&mut self) -> f64 {
        let u1 = self.uniform();
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// Geometric random walk starting at 100 with 1% per-bar volatility.
pub fn pseudorandom_walk(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = XorShift::new(seed);
    let mut price = 100.0_f64;
    (0..n)
        .map(|_| {
            price *= (0.01 * rng.gaussian()).exp();
            price
        })
        .collect()
}

/// Ornstein-Uhlenbeck path: `x += theta * (mu - x) + sigma * N(0, 1)`.
pub fn ou_series(n: usize, theta: f64, mu: f64, sigma: f64, seed: u64) -> Vec<f64> {
    let mut rng = XorShift::new(seed);
    let mut x = mu;
    (0..n)
        .map(|_| {
            x += theta * (mu - x) + sigma * rng.gaussian();
            x
        })
        .collect()
}

/// Smoothly accelerating uptrend.
pub fn accelerating_series(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let i = i as f64;
            100.0 + i + 0.005 * i * (i - 1.0)
        })
        .collect()
}

/// Strict 105 / 95 alternation.
pub fn alternating_series(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| if i % 2 == 0 { 105.0 } else { 95.0 })
        .collect()
}

/// Wrap closes into bars: open at the previous close, 0.5 of padding on
/// each side, one-minute spacing and constant volume.
pub fn bars_from_closes(closes: &[f64], volume: f64) -> Vec<PriceBar> {
    let mut prev = closes.first().copied().unwrap_or(0.0);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = prev;
            prev = close;
            let high = open.max(close) + 0.5;
            let low = (open.min(close) - 0.5).max(0.0);
            PriceBar::new(1_700_000_000_000 + i as i64 * 60_000, open, high, low, close, volume)
        })
        .collect()
}
