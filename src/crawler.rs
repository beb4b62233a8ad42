use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::contract::{CodeFile, EntryKind, RepositoryClient, RepositoryEntry};
use crate::error::Result;

/// Directory-name substrings that prune a subtree without descending into it.
const SKIP_DIR_SUBSTRINGS: &[&str] = &[
    "node_modules",
    "test",
    "__tests__",
    "tests",
    ".git",
    "dist",
    "build",
    "coverage",
    "examples",
];

/// File-name substrings that exclude a file even when its extension matches.
const TEST_FILE_MARKERS: &[&str] = &[".test.", ".spec."];

/// Bounded traversal over a hosted repository tree, producing a flat,
/// filtered, ordered list of candidate source files.
///
/// Ordering is pre-order with children fully expanded before later siblings,
/// preserving the upstream listing order within each directory. For a fixed
/// upstream listing the output is deterministic, so downstream file-count
/// truncation is reproducible.
pub struct Crawler {
    max_depth: usize,
    extensions: Vec<String>,
    skip_dirs: Vec<String>,
    test_markers: Vec<String>,
}

impl Default for Crawler {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl Crawler {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            extensions: config.extensions.clone(),
            skip_dirs: SKIP_DIR_SUBSTRINGS.iter().map(|s| s.to_string()).collect(),
            test_markers: TEST_FILE_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Crawl the repository from its root.
    ///
    /// Traversal is all-or-nothing: a listing failure at any node aborts the
    /// whole crawl with that error. Per-file problems are left to the
    /// pipeline, which tolerates them.
    pub async fn crawl<C: RepositoryClient>(
        &self,
        client: &C,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<CodeFile>> {
        let mut files = Vec::new();

        // Explicit work stack instead of recursion, so pathological upstream
        // trees cannot grow the call stack. Each frame carries the depth of
        // the directory node whose listing produced the entry; pushing a
        // listing in reverse keeps pre-order, children-before-siblings.
        let root = client.list_directory(owner, repo, "").await?;
        let mut stack: Vec<(RepositoryEntry, usize)> = Vec::new();
        push_listing(&mut stack, root, 0);

        while let Some((entry, depth)) = stack.pop() {
            match entry.kind {
                EntryKind::File => {
                    if self.is_code_file(&entry.name) {
                        files.push(CodeFile {
                            name: entry.name,
                            path: entry.path,
                            download_url: entry.download_url,
                        });
                    }
                }
                EntryKind::Directory => {
                    if self.is_skipped_dir(&entry.name) {
                        debug!(path = %entry.path, "Pruning skip-listed directory");
                        continue;
                    }
                    if depth < self.max_depth {
                        let children = client.list_directory(owner, repo, &entry.path).await?;
                        push_listing(&mut stack, children, depth + 1);
                    } else {
                        // Depth-limit policy, not an error.
                        debug!(path = %entry.path, depth, "Pruning directory at depth limit");
                    }
                }
            }
        }

        info!(
            owner,
            repo,
            count = files.len(),
            "Crawl finished"
        );
        Ok(files)
    }

    fn is_skipped_dir(&self, name: &str) -> bool {
        self.skip_dirs.iter().any(|s| name.contains(s.as_str()))
    }

    fn is_code_file(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
            && !self.test_markers.iter().any(|m| name.contains(m.as_str()))
    }
}

fn push_listing(
    stack: &mut Vec<(RepositoryEntry, usize)>,
    listing: Vec<RepositoryEntry>,
    depth: usize,
) {
    for entry in listing.into_iter().rev() {
        stack.push((entry, depth));
    }
}
