use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A content variant competing for exposure. Counts are owned by the caller;
/// the optimizer only ever reads a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub successes: u64,
    pub failures: u64,
    /// Set on the variant currently serving as champion (daily cadence input).
    #[serde(default)]
    pub is_champion: bool,
}

impl Variant {
    pub fn new(id: impl Into<String>, successes: u64, failures: u64) -> Self {
        Self {
            id: id.into(),
            successes,
            failures,
            is_champion: false,
        }
    }

    pub fn champion(id: impl Into<String>, successes: u64, failures: u64) -> Self {
        Self {
            is_champion: true,
            ..Self::new(id, successes, failures)
        }
    }

    pub fn impressions(&self) -> u64 {
        self.successes.saturating_add(self.failures)
    }

    /// Beta posterior alpha under a Beta(1,1) prior.
    pub fn alpha(&self) -> f64 {
        self.successes as f64 + 1.0
    }

    /// Beta posterior beta under a Beta(1,1) prior.
    pub fn beta(&self) -> f64 {
        self.failures as f64 + 1.0
    }

    pub fn posterior_mean(&self) -> f64 {
        let (a, b) = (self.alpha(), self.beta());
        a / (a + b)
    }

    pub fn posterior_variance(&self) -> f64 {
        let (a, b) = (self.alpha(), self.beta());
        let total = a + b;
        (a * b) / (total.powi(2) * (total + 1.0))
    }

    /// Raw success rate; 0 when the variant has no impressions.
    pub fn observed_rate(&self) -> f64 {
        match self.impressions() {
            0 => 0.0,
            n => self.successes as f64 / n as f64,
        }
    }
}

/// Which decision surface an arm set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BanditScope {
    Channel,
    #[default]
    Variant,
    SendTime,
}

/// A group of competing arms sharing a scope and an objective metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmSet {
    #[serde(default)]
    pub scope: BanditScope,
    #[serde(default = "default_objective_metric")]
    pub objective_metric: String,
    pub arms: Vec<Variant>,
}

fn default_objective_metric() -> String {
    "conversion_rate".to_string()
}

/// Spend and revenue for one marketing channel over the hourly window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub channel_id: String,
    pub spend: f64,
    pub revenue: f64,
}

impl ChannelMetrics {
    pub fn new(channel_id: impl Into<String>, spend: f64, revenue: f64) -> Self {
        Self {
            channel_id: channel_id.into(),
            spend,
            revenue,
        }
    }

    /// (revenue - spend) / spend, or 0 for a channel with no spend.
    pub fn roi(&self) -> f64 {
        if self.spend > 0.0 {
            (self.revenue - self.spend) / self.spend
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternObservation {
    pub pattern: String,
    pub success_rate: f64,
    pub sample_size: u64,
}

/// Pattern usage reported by one venture for the weekly cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VentureMetrics {
    pub venture_id: String,
    #[serde(default)]
    pub patterns: Vec<PatternObservation>,
}

impl VentureMetrics {
    pub fn new(venture_id: impl Into<String>) -> Self {
        Self {
            venture_id: venture_id.into(),
            patterns: Vec::new(),
        }
    }

    pub fn with_pattern(
        mut self,
        pattern: impl Into<String>,
        success_rate: f64,
        sample_size: u64,
    ) -> Self {
        self.patterns.push(PatternObservation {
            pattern: pattern.into(),
            success_rate,
            sample_size,
        });
        self
    }

    pub fn uses_pattern(&self, pattern: &str) -> bool {
        self.patterns.iter().any(|p| p.pattern == pattern)
    }
}

/// A recommendation emitted by one of the cadence procedures. The optimizer
/// never enacts these; a downstream consumer does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision_type", rename_all = "snake_case")]
pub enum Decision {
    BudgetReallocation {
        from_channel: String,
        to_channel: String,
        shift_percent: f64,
        reason: String,
        best_roi: f64,
        worst_roi: f64,
    },
    ChampionPromotion {
        previous_champion: String,
        new_champion: String,
        improvement_percent: f64,
        champion_rate: f64,
        challenger_rate: f64,
        reason: String,
    },
    CrossPollination {
        pattern: String,
        source_venture: String,
        success_rate: f64,
        sample_size: u64,
        target_ventures: Vec<String>,
        reason: String,
    },
}

impl Decision {
    pub fn kind(&self) -> &'static str {
        match self {
            Decision::BudgetReallocation { .. } => "budget_reallocation",
            Decision::ChampionPromotion { .. } => "champion_promotion",
            Decision::CrossPollination { .. } => "cross_pollination",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Decision::BudgetReallocation { reason, .. }
            | Decision::ChampionPromotion { reason, .. }
            | Decision::CrossPollination { reason, .. } => reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CadenceType {
    Hourly,
    Daily,
    Weekly,
}

impl CadenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CadenceType::Hourly => "hourly",
            CadenceType::Daily => "daily",
            CadenceType::Weekly => "weekly",
        }
    }
}

impl std::fmt::Display for CadenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a single cadence run. For the weekly cadence the decisions are
/// cross-pollination recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceReport {
    pub cadence: CadenceType,
    pub decisions: Vec<Decision>,
    pub execution_duration_ms: u64,
}

impl CadenceReport {
    pub fn is_noop(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Append-only record of one cadence invocation, handed to the decision log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRun {
    pub id: Uuid,
    pub cadence_type: CadenceType,
    pub decisions_made: Vec<Decision>,
    pub metrics_used: serde_json::Value,
    pub execution_duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl OptimizationRun {
    pub fn new(
        cadence_type: CadenceType,
        decisions_made: Vec<Decision>,
        metrics_used: serde_json::Value,
        execution_duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            cadence_type,
            decisions_made,
            metrics_used,
            execution_duration_ms,
            created_at: Utc::now(),
        }
    }
}
