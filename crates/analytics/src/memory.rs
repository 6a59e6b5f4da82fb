use async_trait::async_trait;
use campaign_core::types::{CadenceType, OptimizationRun};
use campaign_core::DecisionLogSink;
use parking_lot::Mutex;

/// Append-only in-process decision log. Useful when the optimizer is embedded
/// and the host reads runs back directly.
#[derive(Default)]
pub struct InMemoryDecisionLog {
    runs: Mutex<Vec<OptimizationRun>>,
}

impl InMemoryDecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<OptimizationRun> {
        self.runs.lock().clone()
    }

    pub fn by_cadence(&self, cadence: CadenceType) -> Vec<OptimizationRun> {
        self.runs
            .lock()
            .iter()
            .filter(|r| r.cadence_type == cadence)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.runs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.lock().is_empty()
    }
}

#[async_trait]
impl DecisionLogSink for InMemoryDecisionLog {
    async fn record(&self, run: &OptimizationRun) -> anyhow::Result<()> {
        self.runs.lock().push(run.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order_and_filters() {
        let log = InMemoryDecisionLog::new();
        assert!(log.is_empty());

        for cadence in [CadenceType::Hourly, CadenceType::Weekly, CadenceType::Hourly] {
            let run = OptimizationRun::new(cadence, vec![], serde_json::Value::Null, 0);
            log.record(&run).await.unwrap();
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.runs()[1].cadence_type, CadenceType::Weekly);
        assert_eq!(log.by_cadence(CadenceType::Hourly).len(), 2);
        assert!(log.by_cadence(CadenceType::Daily).is_empty());
    }
}
