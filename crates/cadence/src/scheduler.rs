//! Cadence scheduler: runs the hourly, daily and weekly procedures, hands one
//! `OptimizationRun` per invocation to the decision log, and optionally drives
//! all three on timers.

use crate::daily::ChampionPromoter;
use crate::hourly::BudgetReallocator;
use crate::source::MetricsSource;
use crate::weekly::PatternMiner;
use campaign_core::config::{AppConfig, CadenceConfig};
use campaign_core::types::{
    CadenceReport, CadenceType, ChannelMetrics, Decision, OptimizationRun, Variant, VentureMetrics,
};
use campaign_core::DecisionLogSink;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct CadenceIntervals {
    pub hourly: Duration,
    pub daily: Duration,
    pub weekly: Duration,
}

impl CadenceIntervals {
    pub fn from_config(config: &CadenceConfig) -> Self {
        Self {
            hourly: Duration::from_secs(config.hourly_interval_secs),
            daily: Duration::from_secs(config.daily_interval_secs),
            weekly: Duration::from_secs(config.weekly_interval_secs),
        }
    }
}

pub struct CadenceScheduler {
    hourly: BudgetReallocator,
    daily: ChampionPromoter,
    weekly: PatternMiner,
    sink: Arc<dyn DecisionLogSink>,
    log_timeout: Duration,
}

impl CadenceScheduler {
    pub fn new(config: &AppConfig, sink: Arc<dyn DecisionLogSink>) -> Self {
        Self {
            hourly: BudgetReallocator::from_config(&config.cadence),
            daily: ChampionPromoter::from_config(&config.bandit, &config.cadence),
            weekly: PatternMiner::from_config(&config.cadence),
            sink,
            log_timeout: Duration::from_millis(config.decision_log.timeout_ms),
        }
    }

    pub fn with_log_timeout(mut self, timeout: Duration) -> Self {
        self.log_timeout = timeout;
        self
    }

    pub async fn run_hourly(&self, channels: &[ChannelMetrics]) -> CadenceReport {
        let started = Instant::now();
        let decisions = self.hourly.evaluate(channels);
        self.finish(CadenceType::Hourly, decisions, channels, started)
            .await
    }

    pub async fn run_daily(&self, variants: &[Variant]) -> CadenceReport {
        let started = Instant::now();
        let decisions = self.daily.evaluate(variants);
        self.finish(CadenceType::Daily, decisions, variants, started)
            .await
    }

    /// The report's decisions are cross-pollination recommendations.
    pub async fn run_weekly(&self, ventures: &[VentureMetrics]) -> CadenceReport {
        let started = Instant::now();
        let decisions = self.weekly.evaluate(ventures);
        self.finish(CadenceType::Weekly, decisions, ventures, started)
            .await
    }

    /// Drive all three cadences on their own timers until `shutdown` flips to
    /// true or its sender is dropped. Each timer first fires one full period
    /// after start. A tick whose metrics fetch fails is skipped.
    pub async fn run_periodic<S>(
        &self,
        source: &S,
        intervals: CadenceIntervals,
        mut shutdown: watch::Receiver<bool>,
    ) where
        S: MetricsSource + ?Sized,
    {
        let mut hourly = Self::ticker(intervals.hourly);
        let mut daily = Self::ticker(intervals.daily);
        let mut weekly = Self::ticker(intervals.weekly);

        info!(
            hourly_secs = intervals.hourly.as_secs_f64(),
            daily_secs = intervals.daily.as_secs_f64(),
            weekly_secs = intervals.weekly.as_secs_f64(),
            "Cadence loops started"
        );

        if *shutdown.borrow() {
            return;
        }

        loop {
            tokio::select! {
                _ = hourly.tick() => match source.channel_metrics().await {
                    Ok(channels) => {
                        self.run_hourly(&channels).await;
                    }
                    Err(e) => {
                        warn!(error = %e, cadence = "hourly", "Metrics fetch failed, skipping tick")
                    }
                },
                _ = daily.tick() => match source.variant_metrics().await {
                    Ok(variants) => {
                        self.run_daily(&variants).await;
                    }
                    Err(e) => {
                        warn!(error = %e, cadence = "daily", "Metrics fetch failed, skipping tick")
                    }
                },
                _ = weekly.tick() => match source.venture_metrics().await {
                    Ok(ventures) => {
                        self.run_weekly(&ventures).await;
                    }
                    Err(e) => {
                        warn!(error = %e, cadence = "weekly", "Metrics fetch failed, skipping tick")
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Cadence loops stopped");
    }

    fn ticker(period: Duration) -> tokio::time::Interval {
        let period = period.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval
    }

    async fn finish<T>(
        &self,
        cadence: CadenceType,
        decisions: Vec<Decision>,
        input: &T,
        started: Instant,
    ) -> CadenceReport
    where
        T: Serialize + ?Sized,
    {
        let execution_duration_ms = started.elapsed().as_millis() as u64;

        metrics::counter!("optimizer.runs", "cadence" => cadence.as_str()).increment(1);
        metrics::counter!("optimizer.decisions", "cadence" => cadence.as_str())
            .increment(decisions.len() as u64);

        if decisions.is_empty() {
            debug!(
                cadence = %cadence,
                duration_ms = execution_duration_ms,
                "Cadence run produced no decisions"
            );
        }
        for decision in &decisions {
            info!(
                cadence = %cadence,
                decision = decision.kind(),
                reason = decision.reason(),
                "Optimization decision emitted"
            );
        }

        let metrics_used = serde_json::to_value(input).unwrap_or_else(|e| {
            warn!(error = %e, cadence = %cadence, "Could not serialize metrics snapshot");
            serde_json::Value::Null
        });
        let run = OptimizationRun::new(
            cadence,
            decisions.clone(),
            metrics_used,
            execution_duration_ms,
        );
        self.log_run(&run).await;

        CadenceReport {
            cadence,
            decisions,
            execution_duration_ms,
        }
    }

    /// Best effort: a failing or slow sink is reported and otherwise ignored.
    async fn log_run(&self, run: &OptimizationRun) {
        match tokio::time::timeout(self.log_timeout, self.sink.record(run)).await {
            Ok(Ok(())) => {
                debug!(run_id = %run.id, cadence = %run.cadence_type, "Optimization run recorded");
            }
            Ok(Err(e)) => {
                metrics::counter!("optimizer.decision_log.failures").increment(1);
                warn!(
                    error = %e,
                    run_id = %run.id,
                    cadence = %run.cadence_type,
                    "Failed to record optimization run"
                );
            }
            Err(_) => {
                metrics::counter!("optimizer.decision_log.timeouts").increment(1);
                warn!(
                    run_id = %run.id,
                    cadence = %run.cadence_type,
                    timeout_ms = self.log_timeout.as_millis() as u64,
                    "Decision log write timed out"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SnapshotSource;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        runs: Mutex<Vec<OptimizationRun>>,
    }

    impl RecordingSink {
        fn runs(&self) -> Vec<OptimizationRun> {
            self.runs.lock().clone()
        }
    }

    #[async_trait]
    impl DecisionLogSink for RecordingSink {
        async fn record(&self, run: &OptimizationRun) -> anyhow::Result<()> {
            self.runs.lock().push(run.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl DecisionLogSink for FailingSink {
        async fn record(&self, _run: &OptimizationRun) -> anyhow::Result<()> {
            anyhow::bail!("decision store unavailable")
        }
    }

    struct StalledSink;

    #[async_trait]
    impl DecisionLogSink for StalledSink {
        async fn record(&self, _run: &OptimizationRun) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    fn channels() -> Vec<ChannelMetrics> {
        vec![
            ChannelMetrics::new("A", 100.0, 300.0),
            ChannelMetrics::new("B", 100.0, 105.0),
        ]
    }

    #[tokio::test]
    async fn test_each_run_is_logged_once() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = CadenceScheduler::new(&AppConfig::default(), sink.clone());

        let report = scheduler.run_hourly(&channels()).await;
        assert_eq!(report.cadence, CadenceType::Hourly);
        assert_eq!(report.decisions.len(), 1);

        // No-op runs are still recorded
        let noop = scheduler.run_daily(&[]).await;
        assert!(noop.is_noop());

        let runs = sink.runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].cadence_type, CadenceType::Hourly);
        assert_eq!(runs[0].decisions_made, report.decisions);
        assert_eq!(runs[0].metrics_used[0]["channel_id"], "A");
        assert_eq!(runs[1].cadence_type, CadenceType::Daily);
        assert!(runs[1].decisions_made.is_empty());
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_fail_run() {
        let scheduler = CadenceScheduler::new(&AppConfig::default(), Arc::new(FailingSink));
        let report = scheduler.run_hourly(&channels()).await;
        assert_eq!(report.decisions.len(), 1);
    }

    #[tokio::test]
    async fn test_stalled_sink_is_bounded() {
        let scheduler = CadenceScheduler::new(&AppConfig::default(), Arc::new(StalledSink))
            .with_log_timeout(Duration::from_millis(20));

        let started = Instant::now();
        let report = scheduler
            .run_weekly(&[
                VentureMetrics::new("V1").with_pattern("urgency-cta", 0.8, 50),
                VentureMetrics::new("V2"),
            ])
            .await;
        assert_eq!(report.decisions.len(), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_periodic_loops_run_all_cadences() {
        let sink = Arc::new(RecordingSink::default());
        let scheduler = Arc::new(CadenceScheduler::new(&AppConfig::default(), sink.clone()));
        let source = Arc::new(SnapshotSource {
            channels: channels(),
            variants: vec![Variant::champion("champ", 50, 50), Variant::new("chal", 70, 30)],
            ventures: vec![],
        });
        let intervals = CadenceIntervals {
            hourly: Duration::from_millis(10),
            daily: Duration::from_millis(15),
            weekly: Duration::from_millis(20),
        };
        let (tx, rx) = watch::channel(false);

        let handle = {
            let scheduler = scheduler.clone();
            let source = source.clone();
            tokio::spawn(async move {
                scheduler.run_periodic(source.as_ref(), intervals, rx).await
            })
        };

        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let runs = sink.runs();
        for cadence in [CadenceType::Hourly, CadenceType::Daily, CadenceType::Weekly] {
            assert!(
                runs.iter().any(|r| r.cadence_type == cadence),
                "no {} run recorded",
                cadence
            );
        }
        assert!(runs
            .iter()
            .filter(|r| r.cadence_type == CadenceType::Daily)
            .all(|r| r.decisions_made.len() == 1));
    }

    #[tokio::test]
    async fn test_periodic_exits_when_sender_dropped() {
        let scheduler =
            CadenceScheduler::new(&AppConfig::default(), Arc::new(RecordingSink::default()));
        let source = SnapshotSource::default();
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let intervals = CadenceIntervals::from_config(&CadenceConfig::default());
        tokio::time::timeout(Duration::from_secs(5), scheduler.run_periodic(&source, intervals, rx))
            .await
            .expect("loop should stop once the shutdown sender is gone");
    }
}
