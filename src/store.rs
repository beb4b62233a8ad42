use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::contract::{DocumentationArtifact, Job, JobStatus, JobStore};
use crate::error::{PipelineError, Result};

/// In-memory job store behind the [`JobStore`] seam.
///
/// Whole-record writes under a single lock give the read-after-write
/// consistency the pipeline requires. The store also guards two invariants
/// at the storage seam: no transition leaves a terminal state, and the
/// documentation artifact for a job is created exactly once.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
    documentation: RwLock<HashMap<Uuid, DocumentationArtifact>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(&self, repository_url: &str) -> Result<Job> {
        let job = Job {
            id: Uuid::new_v4(),
            repository_url: repository_url.to_string(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
        };
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update_job_status(&self, id: Uuid, status: JobStatus) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| PipelineError::PersistenceError(format!("unknown job {id}")))?;
        if job.status.is_terminal() {
            return Err(PipelineError::PersistenceError(format!(
                "job {id} is already {} and cannot transition to {status}",
                job.status
            )));
        }
        job.status = status;
        Ok(())
    }

    async fn create_documentation(
        &self,
        job_id: Uuid,
        artifact: DocumentationArtifact,
    ) -> Result<()> {
        let mut documentation = self.documentation.write().await;
        if documentation.contains_key(&job_id) {
            return Err(PipelineError::PersistenceError(format!(
                "documentation for job {job_id} already exists"
            )));
        }
        documentation.insert(job_id, artifact);
        Ok(())
    }

    async fn get_documentation(&self, job_id: Uuid) -> Result<Option<DocumentationArtifact>> {
        Ok(self.documentation.read().await.get(&job_id).cloned())
    }
}
