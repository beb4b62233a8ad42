use tracing::info;

use crate::contract::{Job, JobStore, WorkItem};
use crate::error::Result;
use crate::queue::JobQueue;

/// Submission boundary: create the job record in `pending` state and hand a
/// work item to the queue.
///
/// The URL is deliberately not validated here. Route-level rejection belongs
/// to the request-handling surface in front of this crate; the pipeline
/// itself parses the URL as its first step, so a malformed submission
/// produces a job that fails with `InvalidRepositoryUrl` rather than a job
/// that never existed.
pub async fn submit_job<S: JobStore>(
    store: &S,
    queue: &JobQueue,
    repository_url: &str,
) -> Result<Job> {
    let job = store.create_job(repository_url).await?;
    info!(job_id = %job.id, url = %repository_url, "Submitted documentation job");
    queue
        .enqueue(WorkItem {
            job_id: job.id,
            repository_url: repository_url.to_string(),
        })
        .await?;
    Ok(job)
}
