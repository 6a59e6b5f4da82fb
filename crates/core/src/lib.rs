pub mod config;
pub mod decision_log;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use decision_log::DecisionLogSink;
pub use error::{CampaignError, CampaignResult};
