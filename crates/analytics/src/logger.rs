//! Asynchronous decision logger that batches optimization runs and appends
//! them to an NDJSON file. Uses a channel-based architecture so recording a
//! run never waits on disk I/O.

use async_trait::async_trait;
use campaign_core::config::DecisionLogConfig;
use campaign_core::types::OptimizationRun;
use campaign_core::DecisionLogSink;
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Decision logger with background batch writer.
pub struct DecisionLogger {
    sender: mpsc::Sender<OptimizationRun>,
    writer: JoinHandle<()>,
}

impl DecisionLogger {
    /// Open (or create) the log file and spawn the background writer.
    pub async fn new(config: &DecisionLogConfig, node_id: String) -> anyhow::Result<Self> {
        let (sender, receiver) = mpsc::channel::<OptimizationRun>(config.channel_capacity.max(1));

        let writer = BatchWriter::open(PathBuf::from(&config.path), node_id).await?;
        let batch_size = config.batch_size.max(1);
        let flush_interval = std::time::Duration::from_millis(config.flush_interval_ms.max(1));

        let writer = tokio::spawn(async move {
            writer.run(receiver, batch_size, flush_interval).await;
        });

        info!(path = %config.path, "Decision logger initialized with NDJSON backend");

        Ok(Self { sender, writer })
    }

    /// Stop accepting runs, flush whatever is buffered and wait for the writer.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.writer.await {
            error!(error = %e, "Decision log writer task failed");
        }
    }
}

#[async_trait]
impl DecisionLogSink for DecisionLogger {
    /// Queue a run (non-blocking). A full queue drops the run and returns an
    /// error; the caller decides how loudly to report it.
    async fn record(&self, run: &OptimizationRun) -> anyhow::Result<()> {
        match self.sender.try_send(run.clone()) {
            Ok(()) => {
                metrics::counter!("decision_log.queued").increment(1);
                Ok(())
            }
            Err(e) => {
                metrics::counter!("decision_log.dropped").increment(1);
                anyhow::bail!("decision log queue rejected run {}: {}", run.id, e)
            }
        }
    }
}

#[derive(Serialize)]
struct LoggedRun<'a> {
    node_id: &'a str,
    #[serde(flatten)]
    run: &'a OptimizationRun,
}

/// Background writer that batches runs and appends them to the log file.
struct BatchWriter {
    file: tokio::fs::File,
    path: PathBuf,
    node_id: String,
}

impl BatchWriter {
    async fn open(path: PathBuf, node_id: String) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self { file, path, node_id })
    }

    async fn run(
        mut self,
        mut receiver: mpsc::Receiver<OptimizationRun>,
        batch_size: usize,
        flush_interval: std::time::Duration,
    ) {
        let mut buffer: Vec<OptimizationRun> = Vec::with_capacity(batch_size);
        let mut interval = tokio::time::interval(flush_interval);

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Some(run) => {
                        buffer.push(run);
                        if buffer.len() >= batch_size {
                            self.flush(&mut buffer).await;
                        }
                    }
                    None => {
                        self.flush(&mut buffer).await;
                        break;
                    }
                },
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        self.flush(&mut buffer).await;
                    }
                }
            }
        }

        debug!(path = %self.path.display(), "Decision log writer stopped");
    }

    async fn flush(&mut self, buffer: &mut Vec<OptimizationRun>) {
        let count = buffer.len();
        if count == 0 {
            return;
        }
        debug!(count = count, "Flushing decision log batch");

        let mut payload = String::new();
        for run in buffer.iter() {
            let line = LoggedRun {
                node_id: &self.node_id,
                run,
            };
            match serde_json::to_string(&line) {
                Ok(json) => {
                    payload.push_str(&json);
                    payload.push('\n');
                }
                Err(e) => warn!(error = %e, run_id = %run.id, "Skipping unserializable run"),
            }
        }
        buffer.clear();

        if payload.is_empty() {
            return;
        }

        let written = async {
            self.file.write_all(payload.as_bytes()).await?;
            self.file.flush().await
        }
        .await;

        match written {
            Ok(()) => {
                metrics::counter!("decision_log.flushed").increment(count as u64);
                debug!(count = count, "Decision log batch flushed successfully");
            }
            Err(e) => {
                metrics::counter!("decision_log.flush_errors").increment(1);
                error!(
                    error = %e,
                    count = count,
                    path = %self.path.display(),
                    "Failed to flush decision log batch"
                );
            }
        }
    }
}
