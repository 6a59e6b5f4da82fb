//! Random variate generation for the bandit: standard Normal (Box-Muller),
//! Gamma (Marsaglia-Tsang with the shape < 1 boost) and Beta (Gamma ratio).
//!
//! All draws come from an injected [`RandomSource`] so tests can pin a seed.

use campaign_core::{CampaignError, CampaignResult};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::error;

/// Upper bound on Marsaglia-Tsang iterations for a single Gamma draw.
/// Acceptance is above 95% per iteration, so hitting this means the
/// uniform source is broken.
pub const DEFAULT_MAX_GAMMA_ITERATIONS: u32 = 10_000;

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    fn next_uniform(&mut self) -> f64;
}

impl<R: RngCore> RandomSource for R {
    fn next_uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

pub struct VariateSampler<R> {
    source: R,
    max_iterations: u32,
}

impl VariateSampler<StdRng> {
    /// Sampler backed by an OS-seeded generator.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Sampler with a fixed seed; identical seeds replay identical draws.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: RandomSource> VariateSampler<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            max_iterations: DEFAULT_MAX_GAMMA_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn uniform(&mut self) -> f64 {
        self.source.next_uniform()
    }

    /// Box-Muller transform. The cosine branch only; the paired sine value
    /// is discarded.
    pub fn standard_normal(&mut self) -> f64 {
        // ln(0) is -inf, so nudge a zero draw onto the smallest positive float
        let u1 = self.uniform().max(f64::MIN_POSITIVE);
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Sample from Gamma(shape, 1).
    pub fn gamma(&mut self, shape: f64) -> CampaignResult<f64> {
        if !shape.is_finite() || shape <= 0.0 {
            return Err(CampaignError::InvalidArgument(format!(
                "gamma shape must be positive and finite, got {}",
                shape
            )));
        }

        if shape < 1.0 {
            // Boost: Gamma(a) = Gamma(a+1) * U^(1/a)
            let boosted = self.gamma(shape + 1.0)?;
            let u = self.uniform();
            return Ok(boosted * u.powf(1.0 / shape));
        }

        let d = shape - 1.0 / 3.0;
        let c = 1.0 / (9.0 * d).sqrt();

        for _ in 0..self.max_iterations {
            let x = self.standard_normal();
            let v = 1.0 + c * x;
            if v <= 0.0 {
                continue;
            }
            let v = v * v * v;

            let u = self.uniform();
            if u < 1.0 - 0.0331 * x.powi(4) || u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
                return Ok(d * v);
            }
        }

        error!(
            shape = shape,
            iterations = self.max_iterations,
            "Gamma rejection loop exhausted; uniform source is suspect"
        );
        Err(CampaignError::SamplingIntegrity {
            iterations: self.max_iterations,
            shape,
        })
    }

    /// Sample from Beta(alpha, beta) as Ga / (Ga + Gb).
    pub fn beta(&mut self, alpha: f64, beta: f64) -> CampaignResult<f64> {
        let ga = self.gamma(alpha)?;
        let gb = self.gamma(beta)?;
        let total = ga + gb;
        if total == 0.0 {
            return Ok(0.5);
        }
        Ok(ga / total)
    }
}
