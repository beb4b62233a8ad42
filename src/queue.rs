//! Work queue and worker pool for the job pipeline.
//!
//! The original event-driven "enqueue and process later" pattern is made
//! explicit here: a bounded mpsc channel carries [`WorkItem`]s, and a pool
//! of worker loops dequeues and drives each job to a terminal state. The
//! channel's single-consumer semantics (the receiver sits behind a mutex)
//! give at-most-one delivery per item; submission enqueues each fresh job id
//! exactly once, so a job id has at most one active processing attempt.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::contract::{Analyzer, JobStore, RepositoryClient, WorkItem};
use crate::error::{PipelineError, Result};
use crate::pipeline;

/// Sending half of the work queue, held by the submission path.
pub struct JobQueue {
    sender: mpsc::Sender<WorkItem>,
}

/// Receiving half, consumed by [`WorkerPool::spawn`].
pub type JobReceiver = mpsc::Receiver<WorkItem>;

impl JobQueue {
    pub fn new(capacity: usize) -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Hand a work item to the pool.
    ///
    /// A closed queue is reported as `PersistenceError`: the job record has
    /// been created but no worker will ever drive it, which is exactly the
    /// inconsistent-state condition that error exists for.
    pub async fn enqueue(&self, item: WorkItem) -> Result<()> {
        let job_id = item.job_id;
        self.sender.send(item).await.map_err(|_| {
            PipelineError::PersistenceError(format!(
                "work queue closed before job {job_id} could be enqueued"
            ))
        })
    }
}

/// Pool of worker loops sharing one queue receiver.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `concurrency` workers over the given receiver. Workers run
    /// until the queue's sending half is dropped and the channel drains.
    pub fn spawn<R, A, S>(
        receiver: JobReceiver,
        concurrency: usize,
        repo_client: Arc<R>,
        analyzer: Arc<A>,
        store: Arc<S>,
        config: PipelineConfig,
    ) -> Self
    where
        R: RepositoryClient + 'static,
        A: Analyzer + 'static,
        S: JobStore + 'static,
    {
        let receiver = Arc::new(Mutex::new(receiver));
        let mut handles = Vec::new();
        for worker_id in 0..concurrency.max(1) {
            let receiver = Arc::clone(&receiver);
            let repo_client = Arc::clone(&repo_client);
            let analyzer = Arc::clone(&analyzer);
            let store = Arc::clone(&store);
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, receiver, repo_client, analyzer, store, config).await;
            }));
        }
        Self { handles }
    }

    /// Wait for every worker to drain and exit.
    pub async fn join(self) {
        futures::future::join_all(self.handles).await;
    }
}

async fn worker_loop<R, A, S>(
    worker_id: usize,
    receiver: Arc<Mutex<JobReceiver>>,
    repo_client: Arc<R>,
    analyzer: Arc<A>,
    store: Arc<S>,
    config: PipelineConfig,
) where
    R: RepositoryClient,
    A: Analyzer,
    S: JobStore,
{
    info!(worker_id, "[WORKER] Started and listening for jobs");
    loop {
        // Hold the receiver lock only while waiting for the next item, so a
        // busy worker never blocks its siblings from picking up work.
        let item = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };
        let Some(item) = item else {
            break;
        };

        info!(worker_id, job_id = %item.job_id, "[WORKER] Processing job");
        match pipeline::process_job(
            repo_client.as_ref(),
            analyzer.as_ref(),
            store.as_ref(),
            &config,
            &item,
        )
        .await
        {
            Ok(()) => info!(worker_id, job_id = %item.job_id, "[WORKER] Job completed"),
            Err(e) => {
                // The job record already reached `failed`; the error is
                // surfaced here for the monitoring layer, then the worker
                // moves on to the next item.
                error!(worker_id, job_id = %item.job_id, error = %e, "[WORKER] Job failed");
            }
        }
    }
    info!(worker_id, "[WORKER] Queue closed, shutting down");
}
