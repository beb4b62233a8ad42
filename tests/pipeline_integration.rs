use mockall::Sequence;
use serde_json::json;

use docsmith::config::PipelineConfig;
use docsmith::contract::{
    EntryKind, JobStatus, JobStore, MockAnalyzer, MockJobStore, MockRepositoryClient,
    RepositoryEntry, WorkItem,
};
use docsmith::error::PipelineError;
use docsmith::pipeline::process_job;
use docsmith::store::InMemoryJobStore;

fn dir(name: &str, path: &str) -> RepositoryEntry {
    RepositoryEntry {
        name: name.to_string(),
        path: path.to_string(),
        kind: EntryKind::Directory,
        download_url: None,
    }
}

fn file(name: &str, path: &str) -> RepositoryEntry {
    RepositoryEntry {
        name: name.to_string(),
        path: path.to_string(),
        kind: EntryKind::File,
        download_url: Some(format!("https://raw.example.test/{path}")),
    }
}

async fn submit(store: &InMemoryJobStore, url: &str) -> WorkItem {
    let job = store.create_job(url).await.expect("create_job should succeed");
    WorkItem {
        job_id: job.id,
        repository_url: url.to_string(),
    }
}

#[tokio::test]
async fn end_to_end_job_produces_artifact_and_completes() {
    let store = InMemoryJobStore::new();
    let item = submit(&store, "https://github.com/acme/widget").await;

    let mut repo = MockRepositoryClient::new();
    repo.expect_list_directory()
        .returning(|_, _, path| match path {
            "" => Ok(vec![dir("src", "src")]),
            "src" => Ok(vec![file("a.ts", "src/a.ts"), file("b.ts", "src/b.ts")]),
            other => Err(PipelineError::NotFound(other.to_string())),
        });
    repo.expect_fetch_content()
        .returning(|entry| Ok(format!("export const tag = \"{}\";", entry.path).into_bytes()));

    let mut analyzer = MockAnalyzer::new();
    analyzer
        .expect_analyze()
        .times(2)
        .returning(|_, filename| {
            Ok(json!({
                "functions": [],
                "classes": [],
                "exports": [filename],
            }))
        });

    process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .expect("job should complete");

    let job = store.get_job(item.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let artifact = store
        .get_documentation(item.job_id)
        .await
        .unwrap()
        .expect("completed job should have documentation");
    assert_eq!(artifact.repository, "acme/widget");
    assert_eq!(artifact.files_analyzed, 2);
    let files: Vec<&str> = artifact.files.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(files, vec!["src/a.ts", "src/b.ts"]);
    assert_eq!(artifact.files[0].documentation["exports"][0], json!("a.ts"));

    // Wire shape consumers rely on.
    let rendered = serde_json::to_value(&artifact).unwrap();
    assert_eq!(rendered["repository"], json!("acme/widget"));
    assert_eq!(rendered["filesAnalyzed"], json!(2));
    assert_eq!(rendered["files"][1]["file"], json!("src/b.ts"));
}

#[tokio::test]
async fn invalid_url_fails_the_job_without_crawling() {
    let store = InMemoryJobStore::new();
    let item = submit(&store, "not-a-url").await;

    // No expectations: any repository or analyzer call panics the test.
    let repo = MockRepositoryClient::new();
    let analyzer = MockAnalyzer::new();

    let err = process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .unwrap_err();

    assert!(
        matches!(err, PipelineError::InvalidRepositoryUrl(_)),
        "expected InvalidRepositoryUrl, got {err:?}"
    );
    let job = store.get_job(item.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(store.get_documentation(item.job_id).await.unwrap().is_none());
}

#[tokio::test]
async fn crawl_failure_fails_the_job_and_propagates() {
    let store = InMemoryJobStore::new();
    let item = submit(&store, "https://github.com/acme/widget").await;

    let mut repo = MockRepositoryClient::new();
    repo.expect_list_directory()
        .returning(|_, _, _| Err(PipelineError::UpstreamUnavailable("503".to_string())));
    let analyzer = MockAnalyzer::new();

    let err = process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::UpstreamUnavailable(_)));
    let job = store.get_job(item.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(store.get_documentation(item.job_id).await.unwrap().is_none());
}

#[tokio::test]
async fn truncates_to_file_cap_in_crawl_order() {
    let store = InMemoryJobStore::new();
    let item = submit(&store, "https://github.com/acme/widget").await;

    let mut repo = MockRepositoryClient::new();
    repo.expect_list_directory()
        .returning(|_, _, path| match path {
            "" => Ok((0..25)
                .map(|i| file(&format!("f{i:02}.ts"), &format!("f{i:02}.ts")))
                .collect()),
            other => Err(PipelineError::NotFound(other.to_string())),
        });
    // Only the first ten files may cost a fetch and an analyzer call.
    repo.expect_fetch_content()
        .times(10)
        .returning(|_| Ok(b"export {};".to_vec()));

    let mut analyzer = MockAnalyzer::new();
    analyzer
        .expect_analyze()
        .times(10)
        .returning(|_, _| Ok(json!({ "functions": [] })));

    process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .expect("job should complete");

    let artifact = store.get_documentation(item.job_id).await.unwrap().unwrap();
    assert_eq!(artifact.files_analyzed, 10);
    let expected: Vec<String> = (0..10).map(|i| format!("f{i:02}.ts")).collect();
    let actual: Vec<&str> = artifact.files.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(actual, expected);
    assert_eq!(
        store.get_job(item.job_id).await.unwrap().unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn oversized_files_are_skipped_before_the_analyzer_is_called() {
    let store = InMemoryJobStore::new();
    let item = submit(&store, "https://github.com/acme/widget").await;

    let mut repo = MockRepositoryClient::new();
    repo.expect_list_directory()
        .returning(|_, _, path| match path {
            "" => Ok(vec![file("big.ts", "big.ts"), file("ok.ts", "ok.ts")]),
            other => Err(PipelineError::NotFound(other.to_string())),
        });
    repo.expect_fetch_content().returning(|entry| {
        // One character over the cap vs exactly at the cap.
        if entry.name == "big.ts" {
            Ok(vec![b'a'; 10_001])
        } else {
            Ok(vec![b'a'; 10_000])
        }
    });

    let mut analyzer = MockAnalyzer::new();
    analyzer
        .expect_analyze()
        .times(1)
        .returning(|_, filename| {
            assert_eq!(filename, "ok.ts", "oversized file must never reach the analyzer");
            Ok(json!({ "functions": [] }))
        });

    process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .expect("job should complete");

    let artifact = store.get_documentation(item.job_id).await.unwrap().unwrap();
    assert_eq!(artifact.files_analyzed, 1);
    assert_eq!(artifact.files[0].file, "ok.ts");
}

#[tokio::test]
async fn analysis_failures_are_isolated_per_file() {
    let store = InMemoryJobStore::new();
    let item = submit(&store, "https://github.com/acme/widget").await;

    let mut repo = MockRepositoryClient::new();
    repo.expect_list_directory()
        .returning(|_, _, path| match path {
            "" => Ok(vec![
                file("a.ts", "a.ts"),
                file("b.ts", "b.ts"),
                file("c.ts", "c.ts"),
            ]),
            other => Err(PipelineError::NotFound(other.to_string())),
        });
    repo.expect_fetch_content()
        .returning(|_| Ok(b"export {};".to_vec()));

    let mut analyzer = MockAnalyzer::new();
    analyzer.expect_analyze().returning(|_, filename| {
        if filename == "b.ts" {
            Err(PipelineError::AnalysisError {
                file: filename.to_string(),
                reason: "model returned no JSON".to_string(),
            })
        } else {
            Ok(json!({ "functions": [] }))
        }
    });

    process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .expect("a per-file analysis failure must not fail the job");

    let artifact = store.get_documentation(item.job_id).await.unwrap().unwrap();
    assert_eq!(artifact.files_analyzed, 2);
    let files: Vec<&str> = artifact.files.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(files, vec!["a.ts", "c.ts"]);
    assert_eq!(
        store.get_job(item.job_id).await.unwrap().unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn fetch_failures_and_missing_handles_are_isolated_per_file() {
    let store = InMemoryJobStore::new();
    let item = submit(&store, "https://github.com/acme/widget").await;

    let mut repo = MockRepositoryClient::new();
    repo.expect_list_directory()
        .returning(|_, _, path| match path {
            "" => Ok(vec![
                RepositoryEntry {
                    name: "orphan.ts".to_string(),
                    path: "orphan.ts".to_string(),
                    kind: EntryKind::File,
                    download_url: None,
                },
                file("broken.ts", "broken.ts"),
                file("good.ts", "good.ts"),
            ]),
            other => Err(PipelineError::NotFound(other.to_string())),
        });
    repo.expect_fetch_content().returning(|entry| {
        if entry.name == "broken.ts" {
            Err(PipelineError::ContentUnavailable {
                path: entry.path.clone(),
                reason: "410 gone".to_string(),
            })
        } else {
            Ok(b"export {};".to_vec())
        }
    });

    let mut analyzer = MockAnalyzer::new();
    analyzer
        .expect_analyze()
        .times(1)
        .returning(|_, _| Ok(json!({ "functions": [] })));

    process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .expect("per-file fetch problems must not fail the job");

    let artifact = store.get_documentation(item.job_id).await.unwrap().unwrap();
    assert_eq!(artifact.files_analyzed, 1);
    assert_eq!(artifact.files[0].file, "good.ts");
}

#[tokio::test]
async fn empty_crawl_still_completes_with_empty_artifact() {
    let store = InMemoryJobStore::new();
    let item = submit(&store, "https://github.com/acme/widget").await;

    let mut repo = MockRepositoryClient::new();
    repo.expect_list_directory()
        .returning(|_, _, path| match path {
            "" => Ok(vec![file("README.md", "README.md")]),
            other => Err(PipelineError::NotFound(other.to_string())),
        });
    let analyzer = MockAnalyzer::new();

    process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .expect("a repository without code files still completes");

    let artifact = store.get_documentation(item.job_id).await.unwrap().unwrap();
    assert_eq!(artifact.files_analyzed, 0);
    assert!(artifact.files.is_empty());
}

#[tokio::test]
async fn status_transitions_run_in_order_on_success() {
    let item = WorkItem {
        job_id: uuid::Uuid::new_v4(),
        repository_url: "https://github.com/acme/widget".to_string(),
    };

    let mut repo = MockRepositoryClient::new();
    repo.expect_list_directory()
        .returning(|_, _, path| match path {
            "" => Ok(vec![file("a.ts", "a.ts")]),
            other => Err(PipelineError::NotFound(other.to_string())),
        });
    repo.expect_fetch_content()
        .returning(|_| Ok(b"export {};".to_vec()));

    let mut analyzer = MockAnalyzer::new();
    analyzer
        .expect_analyze()
        .returning(|_, _| Ok(json!({ "functions": [] })));

    // pending -> processing exactly once, artifact persisted exactly once,
    // then the terminal transition.
    let mut seq = Sequence::new();
    let mut store = MockJobStore::new();
    store
        .expect_update_job_status()
        .withf(|_, status| *status == JobStatus::Processing)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    store
        .expect_create_documentation()
        .withf(|_, artifact| artifact.repository == "acme/widget")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    store
        .expect_update_job_status()
        .withf(|_, status| *status == JobStatus::Completed)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .expect("job should complete");
}

#[tokio::test]
async fn job_reaches_failed_before_the_error_is_rethrown() {
    let item = WorkItem {
        job_id: uuid::Uuid::new_v4(),
        repository_url: "https://github.com/acme/widget".to_string(),
    };

    let mut repo = MockRepositoryClient::new();
    repo.expect_list_directory()
        .returning(|_, _, _| Err(PipelineError::UpstreamUnavailable("503".to_string())));
    let analyzer = MockAnalyzer::new();

    let mut seq = Sequence::new();
    let mut store = MockJobStore::new();
    store
        .expect_update_job_status()
        .withf(|_, status| *status == JobStatus::Processing)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    store
        .expect_update_job_status()
        .withf(|_, status| *status == JobStatus::Failed)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    let err = process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn persistence_failure_is_fatal_and_surfaced() {
    let item = WorkItem {
        job_id: uuid::Uuid::new_v4(),
        repository_url: "https://github.com/acme/widget".to_string(),
    };

    let mut repo = MockRepositoryClient::new();
    repo.expect_list_directory()
        .returning(|_, _, path| match path {
            "" => Ok(vec![file("a.ts", "a.ts")]),
            other => Err(PipelineError::NotFound(other.to_string())),
        });
    repo.expect_fetch_content()
        .returning(|_| Ok(b"export {};".to_vec()));

    let mut analyzer = MockAnalyzer::new();
    analyzer
        .expect_analyze()
        .returning(|_, _| Ok(json!({ "functions": [] })));

    let mut store = MockJobStore::new();
    store
        .expect_update_job_status()
        .withf(|_, status| *status == JobStatus::Processing)
        .returning(|_, _| Ok(()));
    store
        .expect_create_documentation()
        .returning(|_, _| Err(PipelineError::PersistenceError("disk full".to_string())));
    store
        .expect_update_job_status()
        .withf(|_, status| *status == JobStatus::Failed)
        .times(1)
        .returning(|_, _| Ok(()));

    let err = process_job(&repo, &analyzer, &store, &PipelineConfig::default(), &item)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::PersistenceError(_)));
}
