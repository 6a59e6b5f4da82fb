use crate::error::CampaignResult;
use serde::Deserialize;

/// Root optimizer configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_OPTIMIZER__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub bandit: BanditConfig,
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub decision_log: DecisionLogConfig,
}

// ─── Bandit Config ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct BanditConfig {
    /// Impressions a variant needs before it can be declared champion, and
    /// below which it is eligible for the exploration floor.
    #[serde(default = "default_min_impressions")]
    pub min_impressions: u64,
    /// Probability of forcing an under-explored variant.
    #[serde(default = "default_exploration_floor")]
    pub exploration_floor: f64,
    #[serde(default = "default_max_gamma_iterations")]
    pub max_gamma_iterations: u32,
}

fn default_min_impressions() -> u64 {
    100
}

fn default_exploration_floor() -> f64 {
    0.20
}

fn default_max_gamma_iterations() -> u32 {
    10_000
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            min_impressions: default_min_impressions(),
            exploration_floor: default_exploration_floor(),
            max_gamma_iterations: default_max_gamma_iterations(),
        }
    }
}

// ─── Cadence Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CadenceConfig {
    #[serde(default = "default_roi_threshold")]
    pub roi_threshold: f64,
    #[serde(default = "default_budget_shift_min")]
    pub budget_shift_min: f64,
    #[serde(default = "default_budget_shift_max")]
    pub budget_shift_max: f64,
    #[serde(default = "default_roi_shift_factor")]
    pub roi_shift_factor: f64,
    #[serde(default = "default_champion_confidence")]
    pub champion_confidence: f64,
    #[serde(default = "default_pattern_success_rate")]
    pub pattern_success_rate: f64,
    #[serde(default = "default_pattern_min_sample_size")]
    pub pattern_min_sample_size: u64,
    #[serde(default = "default_hourly_interval_secs")]
    pub hourly_interval_secs: u64,
    #[serde(default = "default_daily_interval_secs")]
    pub daily_interval_secs: u64,
    #[serde(default = "default_weekly_interval_secs")]
    pub weekly_interval_secs: u64,
}

fn default_roi_threshold() -> f64 {
    0.15
}

fn default_budget_shift_min() -> f64 {
    0.10
}

fn default_budget_shift_max() -> f64 {
    0.50
}

fn default_roi_shift_factor() -> f64 {
    0.5
}

fn default_champion_confidence() -> f64 {
    0.05
}

fn default_pattern_success_rate() -> f64 {
    0.5
}

fn default_pattern_min_sample_size() -> u64 {
    30
}

fn default_hourly_interval_secs() -> u64 {
    3_600
}

fn default_daily_interval_secs() -> u64 {
    86_400
}

fn default_weekly_interval_secs() -> u64 {
    604_800
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            roi_threshold: default_roi_threshold(),
            budget_shift_min: default_budget_shift_min(),
            budget_shift_max: default_budget_shift_max(),
            roi_shift_factor: default_roi_shift_factor(),
            champion_confidence: default_champion_confidence(),
            pattern_success_rate: default_pattern_success_rate(),
            pattern_min_sample_size: default_pattern_min_sample_size(),
            hourly_interval_secs: default_hourly_interval_secs(),
            daily_interval_secs: default_daily_interval_secs(),
            weekly_interval_secs: default_weekly_interval_secs(),
        }
    }
}

// ─── Decision Log Config ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionLogConfig {
    /// Upper bound on how long a cadence run waits for the sink.
    #[serde(default = "default_log_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_log_path")]
    pub path: String,
    #[serde(default = "default_log_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_log_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_log_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_log_timeout_ms() -> u64 {
    250
}

fn default_log_path() -> String {
    "optimization_runs.ndjson".to_string()
}

fn default_log_batch_size() -> usize {
    100
}

fn default_log_flush_interval_ms() -> u64 {
    1000
}

fn default_log_channel_capacity() -> usize {
    10_000
}

impl Default for DecisionLogConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_log_timeout_ms(),
            path: default_log_path(),
            batch_size: default_log_batch_size(),
            flush_interval_ms: default_log_flush_interval_ms(),
            channel_capacity: default_log_channel_capacity(),
        }
    }
}

fn default_node_id() -> String {
    "optimizer-01".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            bandit: BanditConfig::default(),
            cadence: CadenceConfig::default(),
            decision_log: DecisionLogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    /// Environment values win over the file. Missing files are skipped;
    /// unreadable or mistyped values surface as `CampaignError::Config`.
    pub fn load(path: Option<&str>) -> CampaignResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let builder = builder.add_source(
            config::Environment::with_prefix("CAMPAIGN_OPTIMIZER")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CampaignError;

    fn write_temp_toml(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("optimizer-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_match_optimizer_constants() {
        let config = AppConfig::default();
        assert_eq!(config.bandit.min_impressions, 100);
        assert!((config.bandit.exploration_floor - 0.20).abs() < f64::EPSILON);
        assert!((config.cadence.roi_threshold - 0.15).abs() < f64::EPSILON);
        assert!((config.cadence.budget_shift_min - 0.10).abs() < f64::EPSILON);
        assert!((config.cadence.budget_shift_max - 0.50).abs() < f64::EPSILON);
        assert!((config.cadence.champion_confidence - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.cadence.pattern_min_sample_size, 30);
        assert_eq!(config.decision_log.timeout_ms, 250);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"bandit":{"min_impressions":50}}"#).unwrap();
        assert_eq!(config.bandit.min_impressions, 50);
        assert!((config.bandit.exploration_floor - 0.20).abs() < f64::EPSILON);
        assert_eq!(config.node_id, "optimizer-01");
        assert_eq!(config.cadence.hourly_interval_secs, 3_600);
    }

    #[test]
    fn test_load_reads_toml_file() {
        let path = write_temp_toml(
            "node_id = \"optimizer-test\"\n\n[cadence]\nroi_threshold = 0.25\n",
        );
        let config = AppConfig::load(path.to_str()).unwrap();
        assert_eq!(config.node_id, "optimizer-test");
        assert!((config.cadence.roi_threshold - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.bandit.min_impressions, 100);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("absent-{}.toml", uuid::Uuid::new_v4()));
        let config = AppConfig::load(path.to_str()).unwrap();
        assert_eq!(config.decision_log.timeout_ms, 250);
    }

    #[test]
    fn test_load_rejects_mistyped_value() {
        let path = write_temp_toml("[bandit]\nmin_impressions = \"lots\"\n");
        let result = AppConfig::load(path.to_str());
        assert!(matches!(result, Err(CampaignError::Config(_))));
        std::fs::remove_file(path).ok();
    }
}
