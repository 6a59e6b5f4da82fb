use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The Gamma rejection loop ran past its iteration cap. Only a broken
    /// uniform source gets here, so callers must not retry.
    #[error(
        "Sampling integrity failure: gamma(shape={shape}) rejected {iterations} consecutive draws"
    )]
    SamplingIntegrity { iterations: u32, shape: f64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for CampaignError {
    fn from(e: config::ConfigError) -> Self {
        CampaignError::Config(e.to_string())
    }
}
