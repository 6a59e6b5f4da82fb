//! Hourly cadence: shift budget from the worst-ROI channel to the best one
//! when the gap between them is wide enough.

use campaign_core::config::CadenceConfig;
use campaign_core::types::{ChannelMetrics, Decision};
use std::cmp::Ordering;

pub const ROI_THRESHOLD: f64 = 0.15;
pub const BUDGET_SHIFT_MIN: f64 = 0.10;
pub const BUDGET_SHIFT_MAX: f64 = 0.50;

#[derive(Debug, Clone)]
pub struct BudgetReallocator {
    roi_threshold: f64,
    shift_min: f64,
    shift_max: f64,
    shift_factor: f64,
}

impl BudgetReallocator {
    pub fn new() -> Self {
        Self {
            roi_threshold: ROI_THRESHOLD,
            shift_min: BUDGET_SHIFT_MIN,
            shift_max: BUDGET_SHIFT_MAX,
            shift_factor: 0.5,
        }
    }

    pub fn from_config(config: &CadenceConfig) -> Self {
        Self {
            roi_threshold: config.roi_threshold,
            shift_min: config.budget_shift_min,
            shift_max: config.budget_shift_max,
            shift_factor: config.roi_shift_factor,
        }
    }

    /// Only the best/worst pair is compared, so at most one decision comes
    /// back regardless of how many channels are supplied.
    pub fn evaluate(&self, channels: &[ChannelMetrics]) -> Vec<Decision> {
        if channels.len() < 2 {
            return Vec::new();
        }

        let mut ranked: Vec<(&ChannelMetrics, f64)> =
            channels.iter().map(|c| (c, c.roi())).collect();
        // Stable: equal ROIs keep input order
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let (Some(&(best, best_roi)), Some(&(worst, worst_roi))) = (ranked.first(), ranked.last())
        else {
            return Vec::new();
        };

        let roi_diff = best_roi - worst_roi;
        if roi_diff.is_nan() || roi_diff <= self.roi_threshold {
            return Vec::new();
        }

        let shift_percent = (roi_diff * self.shift_factor)
            .max(self.shift_min)
            .min(self.shift_max);

        vec![Decision::BudgetReallocation {
            from_channel: worst.channel_id.clone(),
            to_channel: best.channel_id.clone(),
            shift_percent,
            reason: format!(
                "ROI gap of {:.1}% exceeds {:.0}% threshold: {} returns {:.1}% vs {} at {:.1}%",
                roi_diff * 100.0,
                self.roi_threshold * 100.0,
                best.channel_id,
                best_roi * 100.0,
                worst.channel_id,
                worst_roi * 100.0,
            ),
            best_roi,
            worst_roi,
        }]
    }
}

impl Default for BudgetReallocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift_of(decision: &Decision) -> (String, String, f64) {
        match decision {
            Decision::BudgetReallocation {
                from_channel,
                to_channel,
                shift_percent,
                ..
            } => (from_channel.clone(), to_channel.clone(), *shift_percent),
            other => panic!("unexpected decision {:?}", other),
        }
    }

    #[test]
    fn test_needs_two_channels() {
        let hourly = BudgetReallocator::new();
        assert!(hourly.evaluate(&[]).is_empty());
        assert!(hourly
            .evaluate(&[ChannelMetrics::new("solo", 100.0, 900.0)])
            .is_empty());
    }

    #[test]
    fn test_wide_gap_moves_budget_to_best() {
        let hourly = BudgetReallocator::new();
        let decisions = hourly.evaluate(&[
            ChannelMetrics::new("A", 100.0, 300.0),
            ChannelMetrics::new("B", 100.0, 105.0),
        ]);
        assert_eq!(decisions.len(), 1);
        let (from, to, shift) = shift_of(&decisions[0]);
        assert_eq!(from, "B");
        assert_eq!(to, "A");
        // gap 1.95 * 0.5 is capped
        assert!((shift - 0.50).abs() < 1e-12);
        assert!(decisions[0].reason().contains("threshold"));
    }

    #[test]
    fn test_narrow_gap_is_noop() {
        let hourly = BudgetReallocator::new();
        let decisions = hourly.evaluate(&[
            ChannelMetrics::new("A", 100.0, 120.0),
            ChannelMetrics::new("B", 100.0, 110.0),
        ]);
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_shift_floor_applies() {
        let hourly = BudgetReallocator::new();
        // gap 0.16 * 0.5 = 0.08 rounds up to the floor
        let decisions = hourly.evaluate(&[
            ChannelMetrics::new("A", 100.0, 136.0),
            ChannelMetrics::new("B", 100.0, 120.0),
        ]);
        let (_, _, shift) = shift_of(&decisions[0]);
        assert!((shift - BUDGET_SHIFT_MIN).abs() < 1e-12);
    }

    #[test]
    fn test_midrange_shift_is_half_gap() {
        let hourly = BudgetReallocator::new();
        // ROI 0.6 vs 0.0 -> shift 0.3
        let decisions = hourly.evaluate(&[
            ChannelMetrics::new("social", 100.0, 100.0),
            ChannelMetrics::new("email", 50.0, 80.0),
        ]);
        let (from, to, shift) = shift_of(&decisions[0]);
        assert_eq!((from.as_str(), to.as_str()), ("social", "email"));
        assert!((shift - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_only_extremes_considered() {
        let hourly = BudgetReallocator::new();
        let decisions = hourly.evaluate(&[
            ChannelMetrics::new("mid", 100.0, 150.0),
            ChannelMetrics::new("top", 100.0, 400.0),
            ChannelMetrics::new("zero-spend", 0.0, 0.0),
            ChannelMetrics::new("bottom", 100.0, 20.0),
        ]);
        assert_eq!(decisions.len(), 1);
        let (from, to, _) = shift_of(&decisions[0]);
        assert_eq!(from, "bottom");
        assert_eq!(to, "top");
    }

    #[test]
    fn test_zero_spend_channel_counts_as_flat_roi() {
        let hourly = BudgetReallocator::new();
        let decisions = hourly.evaluate(&[
            ChannelMetrics::new("unfunded", 0.0, 50.0),
            ChannelMetrics::new("paid", 100.0, 160.0),
        ]);
        let (from, to, _) = shift_of(&decisions[0]);
        assert_eq!(from, "unfunded");
        assert_eq!(to, "paid");
    }

    #[test]
    fn test_roi_tie_keeps_first_listed_as_best() {
        let hourly = BudgetReallocator::new();
        let decisions = hourly.evaluate(&[
            ChannelMetrics::new("search", 100.0, 300.0),
            ChannelMetrics::new("display", 100.0, 300.0),
            ChannelMetrics::new("print", 100.0, 100.0),
        ]);
        let (from, to, _) = shift_of(&decisions[0]);
        assert_eq!(to, "search");
        assert_eq!(from, "print");
    }
}
