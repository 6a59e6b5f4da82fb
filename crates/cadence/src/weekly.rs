//! Weekly cadence: mine patterns that work in one venture and recommend them
//! to ventures that have not tried them yet.

use campaign_core::config::CadenceConfig;
use campaign_core::types::{Decision, VentureMetrics};
use std::collections::{HashMap, HashSet};

pub const PATTERN_SUCCESS_RATE: f64 = 0.5;
pub const PATTERN_MIN_SAMPLE_SIZE: u64 = 30;

#[derive(Debug, Clone)]
pub struct PatternMiner {
    success_rate: f64,
    min_sample_size: u64,
}

struct Usage<'a> {
    venture_id: &'a str,
    success_rate: f64,
    sample_size: u64,
}

impl PatternMiner {
    pub fn new() -> Self {
        Self {
            success_rate: PATTERN_SUCCESS_RATE,
            min_sample_size: PATTERN_MIN_SAMPLE_SIZE,
        }
    }

    pub fn from_config(config: &CadenceConfig) -> Self {
        Self {
            success_rate: config.pattern_success_rate,
            min_sample_size: config.pattern_min_sample_size,
        }
    }

    /// One recommendation per pattern that has at least one successful usage
    /// and at least one venture not using it. Patterns are reported in the
    /// order they first appear in the input.
    pub fn evaluate(&self, ventures: &[VentureMetrics]) -> Vec<Decision> {
        if ventures.len() < 2 {
            return Vec::new();
        }

        let mut order: Vec<&str> = Vec::new();
        let mut usages: HashMap<&str, Vec<Usage<'_>>> = HashMap::new();
        for venture in ventures {
            for obs in &venture.patterns {
                usages
                    .entry(obs.pattern.as_str())
                    .or_insert_with(|| {
                        order.push(obs.pattern.as_str());
                        Vec::new()
                    })
                    .push(Usage {
                        venture_id: &venture.venture_id,
                        success_rate: obs.success_rate,
                        sample_size: obs.sample_size,
                    });
            }
        }

        let mut recommendations = Vec::new();
        for pattern in order {
            let Some(observed) = usages.get(pattern) else {
                continue;
            };

            let successful: Vec<&Usage<'_>> = observed
                .iter()
                .filter(|u| {
                    u.success_rate > self.success_rate && u.sample_size >= self.min_sample_size
                })
                .collect();
            let Some(exemplar) = successful.first() else {
                continue;
            };

            // A venture id listed twice counts as using the pattern if any of
            // its entries reports it.
            let users: HashSet<&str> = ventures
                .iter()
                .filter(|v| v.uses_pattern(pattern))
                .map(|v| v.venture_id.as_str())
                .collect();
            let mut seen = HashSet::new();
            let targets: Vec<String> = ventures
                .iter()
                .map(|v| v.venture_id.as_str())
                .filter(|id| !users.contains(id) && seen.insert(*id))
                .map(str::to_string)
                .collect();
            if targets.is_empty() {
                continue;
            }

            recommendations.push(Decision::CrossPollination {
                pattern: pattern.to_string(),
                source_venture: exemplar.venture_id.to_string(),
                success_rate: exemplar.success_rate,
                sample_size: exemplar.sample_size,
                reason: format!(
                    "Pattern '{}' succeeds in {} at {:.0}% over {} samples \
                     ({} successful usage(s)); {} venture(s) have not tried it",
                    pattern,
                    exemplar.venture_id,
                    exemplar.success_rate * 100.0,
                    exemplar.sample_size,
                    successful.len(),
                    targets.len(),
                ),
                target_ventures: targets,
            });
        }

        recommendations
    }
}

impl Default for PatternMiner {
    fn default() -> Self {
        Self::new()
    }
}
