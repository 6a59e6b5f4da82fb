//! Metrics snapshots feeding the periodic cadence loops.

use async_trait::async_trait;
use campaign_core::types::{ChannelMetrics, Variant, VentureMetrics};
use serde::{Deserialize, Serialize};

/// Supplies fresh metrics snapshots at each cadence tick.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn channel_metrics(&self) -> anyhow::Result<Vec<ChannelMetrics>>;
    async fn variant_metrics(&self) -> anyhow::Result<Vec<Variant>>;
    async fn venture_metrics(&self) -> anyhow::Result<Vec<VentureMetrics>>;
}

/// A fixed snapshot, e.g. read once from a JSON export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotSource {
    #[serde(default)]
    pub channels: Vec<ChannelMetrics>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub ventures: Vec<VentureMetrics>,
}

#[async_trait]
impl MetricsSource for SnapshotSource {
    async fn channel_metrics(&self) -> anyhow::Result<Vec<ChannelMetrics>> {
        Ok(self.channels.clone())
    }

    async fn variant_metrics(&self) -> anyhow::Result<Vec<Variant>> {
        Ok(self.variants.clone())
    }

    async fn venture_metrics(&self) -> anyhow::Result<Vec<VentureMetrics>> {
        Ok(self.ventures.clone())
    }
}
