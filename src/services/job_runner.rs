//! Batch job queue
//!
//! A single worker task owns batch execution. Jobs arrive over a bounded
//! channel of depth one; the submit path only enqueues after winning the
//! busy gate, so the channel never holds more than the job in flight.
//!
//! Each job runs inside its own spawned task. A panicking job unwinds inside
//! that task, which drops its gate guard and leaves the worker loop alive
//! for subsequent batches.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::services::batch_processor::{BatchJob, BatchProcessor};

/// Error returned when the worker is no longer accepting jobs
#[derive(Debug, Error)]
#[error("ingestion worker is not running")]
pub struct WorkerStopped;

/// Submit side of the job queue
#[derive(Clone)]
pub struct JobSender {
    tx: mpsc::Sender<BatchJob>,
}

impl JobSender {
    /// Hand a job to the worker
    pub async fn submit(&self, job: BatchJob) -> Result<(), WorkerStopped> {
        self.tx.send(job).await.map_err(|_| WorkerStopped)
    }
}

/// Owns the worker task
pub struct JobRunner {
    worker: JoinHandle<()>,
}

impl JobRunner {
    /// Start the worker and hand back the submit side
    pub fn start(processor: BatchProcessor, cancel: CancellationToken) -> (JobRunner, JobSender) {
        let (tx, mut rx) = mpsc::channel::<BatchJob>(1);

        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let batch_id = job.batch_id;
                let processor = processor.clone();
                let job_cancel = cancel.clone();

                let outcome = tokio::spawn(async move {
                    processor.run(job, &job_cancel).await;
                })
                .await;

                if let Err(e) = outcome {
                    if e.is_panic() {
                        tracing::error!(
                            batch_id = %batch_id,
                            "batch job panicked; gate released by its guard, worker continues"
                        );
                    }
                }

                if cancel.is_cancelled() {
                    break;
                }
            }

            tracing::info!("ingestion worker stopped");
        });

        (JobRunner { worker }, JobSender { tx })
    }

    /// Wait for the worker to finish
    ///
    /// Call after cancelling the shutdown token and dropping all senders.
    /// An in-flight job finishes its current row before stopping.
    pub async fn join(self) {
        if let Err(e) = self.worker.await {
            if e.is_panic() {
                tracing::error!("ingestion worker panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::events::EventBus;
    use crate::services::analysis_client::{AnalysisClient, DEFAULT_MODEL};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn worker_exits_when_all_senders_drop() {
        let pool = connect_in_memory().await.unwrap();
        let client = Arc::new(AnalysisClient::new("http://127.0.0.1:9", DEFAULT_MODEL).unwrap());
        let processor = BatchProcessor::new(pool, client, EventBus::new(8));

        let (runner, sender) = JobRunner::start(processor, CancellationToken::new());
        drop(sender);

        tokio::time::timeout(Duration::from_secs(5), runner.join())
            .await
            .expect("worker should stop once the queue closes");
    }
}
