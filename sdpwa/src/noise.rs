use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::error::{Result, SdpwaError};

const DERIVATION_TAG: &[u8] = b"sdpwa.laplace.v1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    Count,
    Sum,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Count => "count",
            Metric::Sum => "sum",
        }
    }
}

/// Deterministic Laplace sampler. Each draw is keyed by the seed digest, the
/// window start, and the metric label, so the same coordinates reproduce the
/// same noise on every compliant host, native or wasm32.
#[derive(Clone, Debug)]
pub struct NoiseEngine {
    seed_digest: [u8; 32],
}

impl NoiseEngine {
    pub fn new(seed: &[u8]) -> Result<Self> {
        if seed.is_empty() {
            return Err(SdpwaError::InvalidConfig("seed must not be empty".into()));
        }
        let mut hasher = Sha256::new();
        hasher.update(DERIVATION_TAG);
        hasher.update(seed);
        Ok(Self {
            seed_digest: hasher.finalize().into(),
        })
    }

    fn subkey(&self, window_start_ms: i64, metric: Metric) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(DERIVATION_TAG);
        hasher.update(self.seed_digest);
        hasher.update(window_start_ms.to_le_bytes());
        hasher.update(metric.label().as_bytes());
        hasher.finalize().into()
    }

    /// Draws Laplace noise with the given scale for `(window_start, metric)`.
    /// Zero sensitivity collapses the scale to zero and draws nothing.
    pub fn laplace(&self, scale: f64, window_start_ms: i64, metric: Metric) -> f64 {
        if scale <= 0.0 {
            return 0.0;
        }
        let mut rng = ChaCha20Rng::from_seed(self.subkey(window_start_ms, metric));
        let u = uniform_open(&mut rng);
        -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
    }
}

/// 53-bit uniform on the open interval (-1/2, 1/2), assembled from two 64-bit
/// draws. A zero mantissa is redrawn so both endpoints stay excluded; every
/// intermediate value is an exact multiple of 2^-53, pinning the arithmetic
/// path across hosts.
fn uniform_open(rng: &mut ChaCha20Rng) -> f64 {
    loop {
        let hi = rng.next_u64();
        let lo = rng.next_u64();
        let mantissa = ((hi >> 37) << 26) | (lo >> 38);
        if mantissa == 0 {
            continue;
        }
        return mantissa as f64 / (1u64 << 53) as f64 - 0.5;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> NoiseEngine {
        NoiseEngine::new(b"deterministic-noise-seed").expect("seed accepted")
    }

    #[test]
    fn rejects_empty_seed() {
        assert!(NoiseEngine::new(b"").is_err());
    }

    #[test]
    fn identical_coordinates_reproduce_the_draw() {
        let a = engine().laplace(2.0, 1_000, Metric::Count);
        let b = engine().laplace(2.0, 1_000, Metric::Count);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn metrics_draw_independent_noise() {
        let count = engine().laplace(1.0, 1_000, Metric::Count);
        let sum = engine().laplace(1.0, 1_000, Metric::Sum);
        assert_ne!(count.to_bits(), sum.to_bits());
    }

    #[test]
    fn windows_draw_independent_noise() {
        let first = engine().laplace(1.0, 0, Metric::Count);
        let second = engine().laplace(1.0, 1_000, Metric::Count);
        assert_ne!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn zero_scale_draws_nothing() {
        assert_eq!(engine().laplace(0.0, 0, Metric::Count), 0.0);
    }

    #[test]
    fn draws_are_finite() {
        let engine = engine();
        for window in 0..500 {
            let sample = engine.laplace(1.0, window * 1_000, Metric::Sum);
            assert!(sample.is_finite());
        }
    }

    #[test]
    fn uniform_stays_inside_open_interval() {
        let mut rng = ChaCha20Rng::from_seed([7u8; 32]);
        for _ in 0..10_000 {
            let u = uniform_open(&mut rng);
            assert!(u > -0.5 && u < 0.5);
        }
    }
}
