//! Per-job orchestration: the job state machine and the crawl → fetch →
//! analyze → assemble → persist pipeline.
//!
//! # Failure policy
//! Crawl-level and URL-parsing failures are fatal to the job and propagate
//! to the caller after the job record is durably set to `failed`. Per-file
//! problems (missing content handle, fetch failure, oversized content,
//! analysis failure) are isolated: the file yields no fragment, the failure
//! is logged with job id and path, and the job proceeds. `PersistenceError`
//! is always fatal and always surfaced, since it leaves state inconsistent.

use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::contract::{
    AnalysisFragment, Analyzer, DocumentationArtifact, JobStatus, JobStore, RepositoryClient,
    WorkItem,
};
use crate::crawler::Crawler;
use crate::error::Result;
use crate::github::parse_repository_url;

/// Execute one job end-to-end.
///
/// The job is claimed by transitioning it to `processing`; any subsequent
/// failure moves it to `failed` *before* the error is returned, so a
/// surrounding retry/monitoring layer observes the error against a
/// consistent record. Success leaves the job `completed` with its artifact
/// persisted under the job id.
pub async fn process_job<R, A, S>(
    repo_client: &R,
    analyzer: &A,
    store: &S,
    config: &PipelineConfig,
    item: &WorkItem,
) -> Result<()>
where
    R: RepositoryClient,
    A: Analyzer,
    S: JobStore,
{
    let job_id = item.job_id;
    info!(job_id = %job_id, url = %item.repository_url, "[PIPELINE] Claiming job");
    store.update_job_status(job_id, JobStatus::Processing).await?;

    match run_stages(repo_client, analyzer, store, config, item).await {
        Ok(()) => {
            info!(job_id = %job_id, "[PIPELINE] Job completed");
            Ok(())
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "[PIPELINE][ERROR] Job failed");
            if let Err(update_err) = store.update_job_status(job_id, JobStatus::Failed).await {
                error!(
                    job_id = %job_id,
                    error = %update_err,
                    "[PIPELINE][ERROR] Could not mark job as failed"
                );
            }
            Err(e)
        }
    }
}

async fn run_stages<R, A, S>(
    repo_client: &R,
    analyzer: &A,
    store: &S,
    config: &PipelineConfig,
    item: &WorkItem,
) -> Result<()>
where
    R: RepositoryClient,
    A: Analyzer,
    S: JobStore,
{
    let job_id = item.job_id;

    let repo_id = parse_repository_url(&item.repository_url)?;
    info!(job_id = %job_id, repository = %repo_id.full_name(), "[PIPELINE] Parsed repository identity");

    let crawler = Crawler::from_config(config);
    let candidates = crawler
        .crawl(repo_client, &repo_id.owner, &repo_id.repo)
        .await?;
    info!(job_id = %job_id, candidates = candidates.len(), "[PIPELINE] Crawl finished");

    if candidates.len() > config.max_files {
        info!(
            job_id = %job_id,
            cap = config.max_files,
            dropped = candidates.len() - config.max_files,
            "[PIPELINE] Truncating candidate list to file cap"
        );
    }

    let mut fragments: Vec<AnalysisFragment> = Vec::new();
    for file in candidates.into_iter().take(config.max_files) {
        if file.download_url.is_none() {
            debug!(job_id = %job_id, path = %file.path, "[PIPELINE] Skipping file without content handle");
            continue;
        }

        let entry = file.to_entry();
        let bytes = match repo_client.fetch_content(&entry).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(job_id = %job_id, path = %file.path, error = %e, "[PIPELINE] Fetch failed, skipping file");
                continue;
            }
        };

        let content = String::from_utf8_lossy(&bytes);
        let char_count = content.chars().count();
        if char_count > config.max_file_chars {
            debug!(
                job_id = %job_id,
                path = %file.path,
                chars = char_count,
                cap = config.max_file_chars,
                "[PIPELINE] Skipping oversized file"
            );
            continue;
        }

        match analyzer.analyze(&content, &file.name).await {
            Ok(documentation) => {
                info!(job_id = %job_id, path = %file.path, "[PIPELINE] File analyzed");
                fragments.push(AnalysisFragment {
                    file: file.path,
                    documentation,
                });
            }
            Err(e) => {
                // Isolation policy: an analysis failure costs this file its
                // fragment, never the job.
                warn!(job_id = %job_id, path = %file.path, error = %e, "[PIPELINE] Analysis failed, skipping file");
            }
        }
    }

    let artifact = DocumentationArtifact {
        repository: repo_id.full_name(),
        files_analyzed: fragments.len(),
        files: fragments,
    };
    info!(
        job_id = %job_id,
        files_analyzed = artifact.files_analyzed,
        "[PIPELINE] Persisting documentation artifact"
    );
    store.create_documentation(job_id, artifact).await?;

    store.update_job_status(job_id, JobStatus::Completed).await?;
    Ok(())
}
