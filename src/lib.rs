#![doc = "docsmith: asynchronous repository documentation pipeline."]

//! This crate accepts a public repository URL, crawls the repository's code
//! files over the hosting API, sends each file to a language-model service
//! for documentation synthesis, and assembles a per-repository
//! documentation artifact retrievable by job id.
//!
//! The collaborator seams (repository host, language model, job store) live
//! in [`contract`]; the pipeline orchestrates over them and never depends on
//! a concrete implementation, which is also how the test suite drives it.

pub mod analyzer;
pub mod config;
pub mod contract;
pub mod crawler;
pub mod error;
pub mod github;
pub mod load_config;
pub mod pipeline;
pub mod queue;
pub mod store;
pub mod submit;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use analyzer::LlmAnalyzer;
use contract::{JobStatus, JobStore};
use github::GitHubClient;
use load_config::{default_config, load_config};
use queue::{JobQueue, WorkerPool};
use store::InMemoryJobStore;
use submit::submit_job;

#[derive(Parser)]
#[clap(
    name = "docsmith",
    version,
    about = "Crawl a hosted repository and generate API documentation for its source files with an LLM"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a repository URL and run the pipeline until the job finishes
    Analyze {
        /// Public repository URL, e.g. https://github.com/acme/widget
        #[clap(long)]
        url: String,
        /// Path to the YAML config file (defaults apply without one)
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Analyze { url, config } => {
            let config = match config {
                Some(path) => load_config(path)?,
                None => default_config(),
            };

            let store = Arc::new(InMemoryJobStore::new());
            let repo_client = Arc::new(GitHubClient::new(config.github.clone())?);
            let llm = Arc::new(LlmAnalyzer::new(config.analyzer.clone())?);

            let (queue, receiver) = JobQueue::new(config.worker.queue_capacity);
            let pool = WorkerPool::spawn(
                receiver,
                config.worker.concurrency,
                repo_client,
                llm,
                Arc::clone(&store),
                config.pipeline.clone(),
            );

            let job = submit_job(store.as_ref(), &queue, &url).await?;
            println!("Analysis started (job {})", job.id);

            // Terminal status is observed by polling, not push notification.
            let status = loop {
                let current = store
                    .get_job(job.id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("job {} vanished from store", job.id))?;
                if current.status.is_terminal() {
                    break current.status;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            };

            // Closing the queue drains the pool.
            drop(queue);
            pool.join().await;

            match status {
                JobStatus::Completed => {
                    let artifact = store
                        .get_documentation(job.id)
                        .await?
                        .ok_or_else(|| {
                            anyhow::anyhow!("completed job {} has no documentation", job.id)
                        })?;
                    println!("Documentation generated.");
                    println!("{}", serde_json::to_string_pretty(&artifact)?);
                    Ok(())
                }
                status => {
                    eprintln!("[ERROR] Job {} finished as {status}", job.id);
                    Err(anyhow::anyhow!("documentation job finished as {status}"))
                }
            }
        }
    }
}
