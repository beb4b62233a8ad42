use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::config::GitHubConfig;
use crate::contract::{EntryKind, RepositoryClient, RepositoryEntry};
use crate::error::{PipelineError, Result};

/// Owner/repository pair parsed out of a submitted URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    /// `owner/repo` form used as the artifact's repository identity.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn repo_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://[^/\s]+/([A-Za-z0-9_-]+)/([A-Za-z0-9_-]+)(\.git)?$")
            .expect("repository URL pattern is valid")
    })
}

/// Parse the accepted repository URL shape,
/// `http(s)://<host>/<owner>/<repo>[.git]`, where owner and repo are
/// restricted to alphanumerics, `-` and `_`. Anything else is
/// `InvalidRepositoryUrl`.
pub fn parse_repository_url(url: &str) -> Result<RepoId> {
    let caps = repo_url_regex()
        .captures(url)
        .ok_or_else(|| PipelineError::InvalidRepositoryUrl(url.to_string()))?;
    Ok(RepoId {
        owner: caps[1].to_string(),
        repo: caps[2].to_string(),
    })
}

/// One entry of the hosting API's directory-listing response.
#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    download_url: Option<String>,
}

/// Repository client over the GitHub contents API.
///
/// Deliberately retry-free and cache-free: retries are the pipeline's
/// policy, and repository content may change between submission and
/// processing.
pub struct GitHubClient {
    client: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if path.is_empty() {
            format!("{base}/repos/{owner}/{repo}/contents")
        } else {
            format!("{base}/repos/{owner}/{repo}/contents/{path}")
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        // GitHub rejects requests without a User-Agent.
        let mut req = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", concat!("docsmith/", env!("CARGO_PKG_VERSION")));
        if let Some(token) = &self.config.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    async fn list_directory(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<RepositoryEntry>> {
        let url = self.contents_url(owner, repo, path);
        let response = self.request(&url).send().await.map_err(|e| {
            PipelineError::UpstreamUnavailable(format!("GET {url} failed: {e}"))
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PipelineError::NotFound(format!("{owner}/{repo}/{path}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamUnavailable(format!(
                "GET {url} returned {status}: {body}"
            )));
        }

        let entries: Vec<ContentsEntry> = response.json().await.map_err(|e| {
            PipelineError::UpstreamUnavailable(format!("malformed listing for {url}: {e}"))
        })?;

        let mut listing = Vec::with_capacity(entries.len());
        for entry in entries {
            let kind = match entry.kind.as_str() {
                "file" => EntryKind::File,
                "dir" => EntryKind::Directory,
                other => {
                    // Symlinks and submodules are not crawlable content.
                    debug!(path = %entry.path, kind = other, "Dropping unsupported entry kind");
                    continue;
                }
            };
            listing.push(RepositoryEntry {
                name: entry.name,
                path: entry.path,
                kind,
                download_url: entry.download_url,
            });
        }
        Ok(listing)
    }

    async fn fetch_content(&self, entry: &RepositoryEntry) -> Result<Vec<u8>> {
        let url = entry
            .download_url
            .as_deref()
            .ok_or_else(|| PipelineError::ContentUnavailable {
                path: entry.path.clone(),
                reason: "no download handle".to_string(),
            })?;

        let response = self.request(url).send().await.map_err(|e| {
            PipelineError::UpstreamUnavailable(format!("GET {url} failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::ContentUnavailable {
                path: entry.path.clone(),
                reason: format!("GET {url} returned {status}"),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            PipelineError::UpstreamUnavailable(format!("reading body of {url} failed: {e}"))
        })?;
        Ok(bytes.to_vec())
    }
}
