//! Reinforcement Learning engine — Beta-Bernoulli Thompson Sampling with an
//! exploration floor, backed by a seedable Gamma/Beta variate sampler.

pub mod bandits;
pub mod sampler;

pub use bandits::{BanditSelector, Selection, SelectionReason, VariantPosterior};
pub use sampler::{RandomSource, VariateSampler};
