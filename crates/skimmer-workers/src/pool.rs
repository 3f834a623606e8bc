//! Fixed-size worker pools over bounded queues.

use crate::job::{Job, JobProcessor};
use skimmer_types::{ExtractError, ExtractedResult, SourceType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Counters shared by a pool's workers.
#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

/// Snapshot of a pool's counters.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PoolStats {
    pub workers: usize,
    pub queue_capacity: usize,
    pub processed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

/// A fixed set of workers consuming one bounded queue.
pub struct WorkerPool {
    name: &'static str,
    worker_count: usize,
    queue_capacity: usize,
    tx: mpsc::Sender<Job>,
    workers: Vec<tokio::task::JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Start `size` workers over a queue bounded at `2 * size`.
    pub fn start(name: &'static str, size: usize, processor: Arc<dyn JobProcessor>) -> Self {
        let size = size.max(1);
        let queue_capacity = size * 2;
        let (tx, rx) = mpsc::channel::<Job>(queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let counters = Arc::new(Counters::default());

        info!(pool = name, workers = size, queue = queue_capacity, "starting worker pool");

        let workers = (0..size)
            .map(|index| {
                let rx = Arc::clone(&rx);
                let processor = Arc::clone(&processor);
                let counters = Arc::clone(&counters);
                tokio::spawn(worker_loop(name, index, rx, processor, counters))
            })
            .collect();

        Self {
            name,
            worker_count: size,
            queue_capacity,
            tx,
            workers,
            counters,
        }
    }

    /// Enqueue a job. Blocks while the queue is full; that wait is the
    /// caller's backpressure. Errors only after shutdown.
    pub async fn submit(&self, job: Job) -> Result<(), ExtractedResult> {
        let url = job.url.clone();
        match self.tx.send(job).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(job)) => {
                error!(pool = self.name, url = %url, "job queue closed");
                // The pool is gone; deliver the failure ourselves so
                // the caller still gets its one result.
                let result = ExtractedResult::failure(
                    &job.url,
                    SourceType::Unknown,
                    ExtractError::Request("worker pool is shut down".to_string()),
                );
                let _ = job.result_tx.send(result.clone());
                Err(result)
            }
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.worker_count,
            queue_capacity: self.queue_capacity,
            processed: self.counters.processed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
        }
    }

    /// Close the queue and wait for workers to drain it.
    pub async fn shutdown(self) {
        info!(pool = self.name, "shutting down worker pool");
        drop(self.tx);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(pool = self.name, error = %e, "worker task join failed");
            }
        }
    }
}

async fn worker_loop(
    pool: &'static str,
    index: usize,
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    processor: Arc<dyn JobProcessor>,
    counters: Arc<Counters>,
) {
    debug!(pool, worker = index, "worker started");

    loop {
        // Hold the queue lock only for the dequeue itself.
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        let result = if job.cancel.is_cancelled() {
            counters.cancelled.fetch_add(1, Ordering::Relaxed);
            cancelled_result(&job)
        } else {
            tokio::select! {
                _ = job.cancel.cancelled() => {
                    counters.cancelled.fetch_add(1, Ordering::Relaxed);
                    cancelled_result(&job)
                }
                result = processor.process(&job.url, job.endpoint, job.max_chars) => {
                    if result.processed_successfully {
                        counters.processed.fetch_add(1, Ordering::Relaxed);
                    } else {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                    }
                    result
                }
            }
        };

        // Exactly one send per job; a dropped receiver just means the
        // request went away first.
        if job.result_tx.send(result).is_err() {
            debug!(pool, worker = index, "result receiver dropped before delivery");
        }
    }

    debug!(pool, worker = index, "worker stopped");
}

fn cancelled_result(job: &Job) -> ExtractedResult {
    ExtractedResult::failure_typed(&job.url, SourceType::Unknown, &ExtractError::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Job, JobProcessor};
    use async_trait::async_trait;
    use skimmer_types::{Endpoint, SourceData};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct EchoProcessor;

    #[async_trait]
    impl JobProcessor for EchoProcessor {
        async fn process(
            &self,
            url: &str,
            _endpoint: Endpoint,
            _max_chars: Option<usize>,
        ) -> ExtractedResult {
            ExtractedResult::success(
                url,
                SourceType::Webpage,
                SourceData::Webpage {
                    title: "t".to_string(),
                    text_content: url.to_string(),
                },
            )
        }
    }

    struct SlowProcessor;

    #[async_trait]
    impl JobProcessor for SlowProcessor {
        async fn process(
            &self,
            url: &str,
            _endpoint: Endpoint,
            _max_chars: Option<usize>,
        ) -> ExtractedResult {
            tokio::time::sleep(Duration::from_secs(60)).await;
            ExtractedResult::failure(url, SourceType::Webpage, "never reached")
        }
    }

    #[tokio::test]
    async fn every_accepted_job_gets_exactly_one_result() {
        let pool = WorkerPool::start("test", 4, Arc::new(EchoProcessor));

        let mut receivers = Vec::new();
        for i in 0..20 {
            let (job, rx) = Job::new(
                format!("https://example.com/{}", i),
                Endpoint::Search,
                None,
                CancellationToken::new(),
            );
            pool.submit(job).await.unwrap();
            receivers.push(rx);
        }

        for (i, rx) in receivers.into_iter().enumerate() {
            let result = rx.await.expect("exactly one result per job");
            assert!(result.processed_successfully);
            assert_eq!(result.url, format!("https://example.com/{}", i));
        }

        assert_eq!(pool.stats().processed, 20);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn cancelled_jobs_report_cancellation() {
        let pool = WorkerPool::start("test-cancel", 1, Arc::new(SlowProcessor));

        let cancel = CancellationToken::new();
        let (job, rx) = Job::new(
            "https://example.com/slow",
            Endpoint::Extract,
            None,
            cancel.clone(),
        );
        pool.submit(job).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("cancellation must deliver promptly")
            .expect("one result even on cancel");
        assert!(!result.processed_successfully);
        assert!(result.error.unwrap_or_default().contains("cancelled"));
    }

    #[tokio::test]
    async fn queue_bound_is_twice_worker_count() {
        let pool = WorkerPool::start("test-bound", 2, Arc::new(SlowProcessor));
        assert_eq!(pool.stats().queue_capacity, 4);

        // 2 jobs occupy the workers, 4 fill the queue; the 7th submit
        // must block until something drains.
        let mut receivers = Vec::new();
        for i in 0..6 {
            let (job, rx) = Job::new(
                format!("https://example.com/{}", i),
                Endpoint::Search,
                None,
                CancellationToken::new(),
            );
            pool.submit(job).await.unwrap();
            receivers.push(rx);
        }

        let (blocked_job, _blocked_rx) = Job::new(
            "https://example.com/blocked",
            Endpoint::Search,
            None,
            CancellationToken::new(),
        );
        let blocked = tokio::time::timeout(Duration::from_millis(200), pool.submit(blocked_job));
        assert!(blocked.await.is_err(), "submit should backpressure");
    }
}
