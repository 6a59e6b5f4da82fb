//! Daily cadence: champion/challenger promotion.

use campaign_core::config::{BanditConfig, CadenceConfig};
use campaign_core::types::{Decision, Variant};
use campaign_rl_engine::BanditSelector;

/// Absolute conversion-rate lead a challenger needs over the champion.
pub const CHAMPION_CONFIDENCE: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct ChampionPromoter {
    gate: BanditSelector,
    confidence: f64,
}

impl ChampionPromoter {
    pub fn new() -> Self {
        Self {
            gate: BanditSelector::new(),
            confidence: CHAMPION_CONFIDENCE,
        }
    }

    pub fn from_config(bandit: &BanditConfig, cadence: &CadenceConfig) -> Self {
        Self {
            gate: BanditSelector::from_config(bandit),
            confidence: cadence.champion_confidence,
        }
    }

    /// Promote at most one challenger per cycle. Challengers are scanned in
    /// input order and the first eligible one that clears the margin wins;
    /// later ones are not looked at.
    pub fn evaluate(&self, variants: &[Variant]) -> Vec<Decision> {
        let mut champions = variants.iter().filter(|v| v.is_champion);
        let champion = match (champions.next(), champions.next()) {
            (Some(champion), None) => champion,
            _ => return Vec::new(),
        };

        let champion_rate = champion.observed_rate();

        for challenger in variants.iter().filter(|v| !v.is_champion) {
            if !self.gate.can_declare_champion(challenger) {
                continue;
            }

            // An exact margin (0.55 vs 0.50) must not promote; the difference
            // 0.55 - 0.50 rounds above 0.05.
            let challenger_rate = challenger.observed_rate();
            if challenger_rate > champion_rate + self.confidence {
                let lead = challenger_rate - champion_rate;
                return vec![Decision::ChampionPromotion {
                    previous_champion: champion.id.clone(),
                    new_champion: challenger.id.clone(),
                    improvement_percent: lead * 100.0,
                    champion_rate,
                    challenger_rate,
                    reason: format!(
                        "Challenger {} converts at {:.1}% over {} impressions vs champion {} \
                         at {:.1}% (+{:.1} pts, margin {:.0} pts)",
                        challenger.id,
                        challenger_rate * 100.0,
                        challenger.impressions(),
                        champion.id,
                        champion_rate * 100.0,
                        lead * 100.0,
                        self.confidence * 100.0,
                    ),
                }];
            }
        }

        Vec::new()
    }
}

impl Default for ChampionPromoter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promoted(decisions: &[Decision]) -> Option<String> {
        match decisions {
            [Decision::ChampionPromotion { new_champion, .. }] => Some(new_champion.clone()),
            [] => None,
            other => panic!("unexpected decisions {:?}", other),
        }
    }

    #[test]
    fn test_clear_winner_is_promoted() {
        let daily = ChampionPromoter::new();
        let decisions = daily.evaluate(&[
            Variant::champion("champ", 50, 50),
            Variant::new("chal", 70, 30),
        ]);
        assert_eq!(promoted(&decisions).as_deref(), Some("chal"));

        match &decisions[0] {
            Decision::ChampionPromotion {
                previous_champion,
                champion_rate,
                challenger_rate,
                improvement_percent,
                ..
            } => {
                assert_eq!(previous_champion, "champ");
                assert!((champion_rate - 0.5).abs() < 1e-12);
                assert!((challenger_rate - 0.7).abs() < 1e-12);
                assert!((improvement_percent - 20.0).abs() < 1e-9);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_small_lead_is_ignored() {
        let daily = ChampionPromoter::new();
        let decisions = daily.evaluate(&[
            Variant::champion("champ", 50, 50),
            Variant::new("chal", 52, 48),
        ]);
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_exact_margin_is_not_enough() {
        let daily = ChampionPromoter::new();
        let exact = daily.evaluate(&[
            Variant::champion("champ", 50, 50),
            Variant::new("chal", 55, 45),
        ]);
        assert!(exact.is_empty());

        let exact_high = daily.evaluate(&[
            Variant::champion("champ", 70, 30),
            Variant::new("chal", 75, 25),
        ]);
        assert!(exact_high.is_empty());

        let one_more = daily.evaluate(&[
            Variant::champion("champ", 50, 50),
            Variant::new("chal", 56, 44),
        ]);
        assert_eq!(promoted(&one_more).as_deref(), Some("chal"));
    }

    #[test]
    fn test_under_sampled_challenger_skipped() {
        let daily = ChampionPromoter::new();
        let decisions = daily.evaluate(&[
            Variant::champion("champ", 50, 50),
            Variant::new("hot-but-new", 40, 5),
            Variant::new("proven", 80, 40),
        ]);
        assert_eq!(promoted(&decisions).as_deref(), Some("proven"));
    }

    #[test]
    fn test_first_qualifying_challenger_wins() {
        let daily = ChampionPromoter::new();
        let decisions = daily.evaluate(&[
            Variant::new("good", 60, 40),
            Variant::champion("champ", 30, 70),
            Variant::new("better", 90, 10),
        ]);
        assert_eq!(promoted(&decisions).as_deref(), Some("good"));
    }

    #[test]
    fn test_requires_exactly_one_champion() {
        let daily = ChampionPromoter::new();
        assert!(daily
            .evaluate(&[Variant::new("a", 10, 90), Variant::new("b", 90, 10)])
            .is_empty());
        assert!(daily
            .evaluate(&[
                Variant::champion("a", 10, 90),
                Variant::champion("b", 20, 80),
                Variant::new("c", 90, 10),
            ])
            .is_empty());
        assert!(daily.evaluate(&[Variant::champion("alone", 10, 90)]).is_empty());
    }

    #[test]
    fn test_champion_without_impressions_has_zero_rate() {
        let daily = ChampionPromoter::new();
        let decisions = daily.evaluate(&[
            Variant::champion("cold", 0, 0),
            Variant::new("warm", 10, 90),
        ]);
        match &decisions[..] {
            [Decision::ChampionPromotion { champion_rate, .. }] => {
                assert_eq!(*champion_rate, 0.0)
            }
            other => panic!("expected promotion, got {:?}", other),
        }
    }
}
