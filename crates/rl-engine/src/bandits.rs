//! Beta-Bernoulli Thompson Sampling with an exploration floor, plus the
//! impression gate used before any champion promotion.

use crate::sampler::{RandomSource, VariateSampler};
use campaign_core::config::BanditConfig;
use campaign_core::types::{ArmSet, BanditScope, Variant};
use campaign_core::{CampaignError, CampaignResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MIN_IMPRESSIONS: u64 = 100;
pub const EXPLORATION_FLOOR: f64 = 0.20;

/// z-score for the 95% credible band reported by [`BanditSelector::summarize`].
const CREDIBLE_Z: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    SingleVariant,
    ExplorationFloor,
    ThompsonSampling,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionReason::SingleVariant => "single_variant",
            SelectionReason::ExplorationFloor => "exploration_floor",
            SelectionReason::ThompsonSampling => "thompson_sampling",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub variant_id: String,
    pub posterior_mean: f64,
    pub posterior_variance: f64,
    /// The winning Beta draw for Thompson picks; the posterior mean otherwise.
    pub sample_value: f64,
    pub selection_reason: SelectionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<BanditScope>,
}

impl Selection {
    fn for_variant(variant: &Variant, sample_value: f64, reason: SelectionReason) -> Self {
        Self {
            variant_id: variant.id.clone(),
            posterior_mean: variant.posterior_mean(),
            posterior_variance: variant.posterior_variance(),
            sample_value,
            selection_reason: reason,
            scope: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantPosterior {
    pub id: String,
    pub impressions: u64,
    pub observed_rate: f64,
    pub posterior_mean: f64,
    pub posterior_variance: f64,
    pub credible_lower: f64,
    pub credible_upper: f64,
    pub champion_eligible: bool,
}

/// Stateless variant selector. Counts live with the caller, randomness with
/// the sampler, so one selector can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct BanditSelector {
    min_impressions: u64,
    exploration_floor: f64,
}

impl BanditSelector {
    pub fn new() -> Self {
        Self {
            min_impressions: MIN_IMPRESSIONS,
            exploration_floor: EXPLORATION_FLOOR,
        }
    }

    pub fn from_config(config: &BanditConfig) -> Self {
        Self {
            min_impressions: config.min_impressions,
            exploration_floor: config.exploration_floor.clamp(0.0, 1.0),
        }
    }

    pub fn min_impressions(&self) -> u64 {
        self.min_impressions
    }

    /// Pick the variant to serve next.
    ///
    /// A lone variant is returned without drawing any randomness. Otherwise,
    /// with probability `exploration_floor`, a variant below
    /// `min_impressions` is picked uniformly; the remaining calls (and all
    /// calls once every variant is past the floor) draw one Beta sample per
    /// variant and take the highest, first-seen winning ties.
    pub fn select_variant<R: RandomSource>(
        &self,
        variants: &[Variant],
        sampler: &mut VariateSampler<R>,
    ) -> CampaignResult<Selection> {
        let selection = match variants {
            [] => {
                return Err(CampaignError::InvalidArgument(
                    "select_variant requires at least one variant".to_string(),
                ))
            }
            [only] => {
                Selection::for_variant(only, only.posterior_mean(), SelectionReason::SingleVariant)
            }
            _ => match self.explore(variants, sampler) {
                Some(selection) => selection,
                None => self.thompson_sampling(variants, sampler)?,
            },
        };

        metrics::counter!("bandit.selections", "reason" => selection.selection_reason.as_str())
            .increment(1);
        debug!(
            variant_id = %selection.variant_id,
            reason = selection.selection_reason.as_str(),
            sample = selection.sample_value,
            "Variant selected"
        );

        Ok(selection)
    }

    /// Select from a scoped arm set; the scope is echoed on the selection.
    pub fn select_from<R: RandomSource>(
        &self,
        arm_set: &ArmSet,
        sampler: &mut VariateSampler<R>,
    ) -> CampaignResult<Selection> {
        let mut selection = self.select_variant(&arm_set.arms, sampler)?;
        selection.scope = Some(arm_set.scope);
        Ok(selection)
    }

    /// Statistical-significance gate: enough impressions to trust the rate.
    pub fn can_declare_champion(&self, variant: &Variant) -> bool {
        variant.impressions() >= self.min_impressions
    }

    /// Posterior summary per variant with a 95% normal-approximation band.
    pub fn summarize(&self, variants: &[Variant]) -> Vec<VariantPosterior> {
        variants
            .iter()
            .map(|v| {
                let mean = v.posterior_mean();
                let variance = v.posterior_variance();
                let half_width = CREDIBLE_Z * variance.sqrt();
                VariantPosterior {
                    id: v.id.clone(),
                    impressions: v.impressions(),
                    observed_rate: v.observed_rate(),
                    posterior_mean: mean,
                    posterior_variance: variance,
                    credible_lower: (mean - half_width).max(0.0),
                    credible_upper: (mean + half_width).min(1.0),
                    champion_eligible: self.can_declare_champion(v),
                }
            })
            .collect()
    }

    fn explore<R: RandomSource>(
        &self,
        variants: &[Variant],
        sampler: &mut VariateSampler<R>,
    ) -> Option<Selection> {
        let under_explored: Vec<&Variant> = variants
            .iter()
            .filter(|v| v.impressions() < self.min_impressions)
            .collect();

        if under_explored.is_empty() || sampler.uniform() >= self.exploration_floor {
            return None;
        }

        let n = under_explored.len();
        let idx = ((sampler.uniform() * n as f64) as usize).min(n - 1);
        let chosen = under_explored[idx];
        Some(Selection::for_variant(
            chosen,
            chosen.posterior_mean(),
            SelectionReason::ExplorationFloor,
        ))
    }

    fn thompson_sampling<R: RandomSource>(
        &self,
        variants: &[Variant],
        sampler: &mut VariateSampler<R>,
    ) -> CampaignResult<Selection> {
        let mut best: Option<(&Variant, f64)> = None;

        for variant in variants {
            let sample = sampler.beta(variant.alpha(), variant.beta())?;
            match best {
                Some((_, best_sample)) if sample <= best_sample => {}
                _ => best = Some((variant, sample)),
            }
        }

        // variants is non-empty here, so best is always set
        let (variant, sample) = best.ok_or_else(|| {
            CampaignError::InvalidArgument("no variants to sample".to_string())
        })?;
        Ok(Selection::for_variant(variant, sample, SelectionReason::ThompsonSampling))
    }
}

impl Default for BanditSelector {
    fn default() -> Self {
        Self::new()
    }
}
