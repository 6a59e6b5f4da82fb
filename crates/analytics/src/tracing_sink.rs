use async_trait::async_trait;
use campaign_core::types::OptimizationRun;
use campaign_core::DecisionLogSink;
use tracing::info;

/// Emits each run as a structured log line under the `decision_log` target,
/// leaving retention to whatever collects the logs.
pub struct TracingDecisionLog {
    node_id: String,
}

impl TracingDecisionLog {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }
}

#[async_trait]
impl DecisionLogSink for TracingDecisionLog {
    async fn record(&self, run: &OptimizationRun) -> anyhow::Result<()> {
        let decisions = serde_json::to_string(&run.decisions_made)?;
        info!(
            target: "decision_log",
            node_id = %self.node_id,
            run_id = %run.id,
            cadence = %run.cadence_type,
            decision_count = run.decisions_made.len(),
            duration_ms = run.execution_duration_ms,
            created_at = %run.created_at,
            decisions = %decisions,
            "Optimization run"
        );
        Ok(())
    }
}
