//! Decision log seam. Each cadence run produces one [`OptimizationRun`] which
//! is handed to a sink; durability and querying belong to the sink.

use crate::types::OptimizationRun;
use async_trait::async_trait;

#[async_trait]
pub trait DecisionLogSink: Send + Sync {
    /// Record a run. Errors are reported to the caller, which treats them as
    /// warnings and never retries.
    async fn record(&self, run: &OptimizationRun) -> anyhow::Result<()>;
}
