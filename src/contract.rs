//! # contract: collaborator interfaces for the documentation pipeline
//!
//! This module defines the three trait seams the pipeline orchestrates over
//! (`RepositoryClient`, `Analyzer`, `JobStore`) together with the data types
//! that cross those seams.
//!
//! ## Interface & Extensibility
//! - Implement [`RepositoryClient`] to crawl a different hosting API.
//! - Implement [`Analyzer`] to swap the language-model backend.
//! - Implement [`JobStore`] to back jobs/artifacts with a real database.
//! - All methods are async and return the crate's typed [`PipelineError`].
//!
//! ## Mocking & Testing
//! - Each trait is annotated for `mockall`, so consumers can generate
//!   deterministic mocks for unit/integration tests. The mocks are exported
//!   through the `test-export-mocks` feature (on by default), letting the
//!   `tests/` directory drive the pipeline without any network or storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::Result;

/// Lifecycle of one documentation job.
///
/// `Pending` is set at submission, `Processing` exactly once when a worker
/// claims the job, and `Completed`/`Failed` are terminal: no transition
/// leaves either of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Durable record of one end-to-end documentation request.
///
/// Mutated only by the worker owning the current processing attempt, never
/// by two workers concurrently for the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub repository_url: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Kind of a node in the hosted repository tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A named node in the hosted repository tree, as returned by a directory
/// listing. Transient: produced during a single crawl, never persisted.
#[derive(Debug, Clone)]
pub struct RepositoryEntry {
    pub name: String,
    /// Full path from the repository root.
    pub path: String,
    pub kind: EntryKind,
    /// Content-retrieval handle for files. Files without one are skipped by
    /// the pipeline rather than failing the job.
    pub download_url: Option<String>,
}

/// A file entry that passed the crawler's extension and test-marker filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFile {
    pub name: String,
    pub path: String,
    pub download_url: Option<String>,
}

impl CodeFile {
    /// View this file as a repository entry again, for content fetching.
    pub fn to_entry(&self) -> RepositoryEntry {
        RepositoryEntry {
            name: self.name.clone(),
            path: self.path.clone(),
            kind: EntryKind::File,
            download_url: self.download_url.clone(),
        }
    }
}

/// Documentation produced for a single code file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFragment {
    pub file: String,
    pub documentation: serde_json::Value,
}

/// The aggregate output of one successful job. Created exactly once,
/// immutable afterward, keyed by job id in the store.
///
/// Serialized camelCase, the shape the documentation consumers already
/// expect: `{"repository", "filesAnalyzed", "files"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationArtifact {
    pub repository: String,
    pub files_analyzed: usize,
    pub files: Vec<AnalysisFragment>,
}

/// Submission-boundary payload: one queued unit of work. The queue delivers
/// each item to at most one worker, and submission enqueues each job id
/// exactly once, which together give the single-owner-at-a-time invariant.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub job_id: Uuid,
    pub repository_url: String,
}

/// Thin adapter over a remote source-hosting API.
///
/// No retry logic lives here (retries, if any, are the pipeline's policy)
/// and implementations must not cache: repository content may change between
/// submission and processing.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// List the entries of one directory, in the upstream's listing order.
    ///
    /// Fails with `UpstreamUnavailable` on transport/HTTP errors and
    /// `NotFound` if the path does not exist.
    async fn list_directory(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<RepositoryEntry>>;

    /// Fetch the raw bytes of a file entry via its content handle.
    ///
    /// Fails with `ContentUnavailable` when the entry has no retrievable
    /// handle and `UpstreamUnavailable` on transport errors.
    async fn fetch_content(&self, entry: &RepositoryEntry) -> Result<Vec<u8>>;
}

/// Per-file adapter to a language-model service.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Turn raw source text into a structured documentation payload.
    ///
    /// `filename` is a human-readable label for the prompt, not dispatch
    /// logic. Fails with `AnalysisError` if the upstream call fails or its
    /// output cannot be parsed as a structured value.
    async fn analyze(&self, content: &str, filename: &str) -> Result<serde_json::Value>;
}

/// Durable record of job state and resulting documentation.
///
/// The pipeline requires read-after-write consistency for the owning worker:
/// `get_job` must observe the latest committed status.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job record in `Pending` state and return it.
    async fn create_job(&self, repository_url: &str) -> Result<Job>;

    /// Fetch a job by id, or `None` if it does not exist.
    async fn get_job(&self, id: Uuid) -> Result<Option<Job>>;

    /// Update a job's status. Implementations must reject transitions out
    /// of a terminal state.
    async fn update_job_status(&self, id: Uuid, status: JobStatus) -> Result<()>;

    /// Persist the documentation artifact for a job, exactly once.
    async fn create_documentation(
        &self,
        job_id: Uuid,
        artifact: DocumentationArtifact,
    ) -> Result<()>;

    /// Fetch the documentation artifact for a job, if one was produced.
    async fn get_documentation(&self, job_id: Uuid) -> Result<Option<DocumentationArtifact>>;
}
