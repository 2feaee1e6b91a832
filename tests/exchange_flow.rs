//! Exchange Flow Integration Tests
//!
//! Drives every Git operation through `GitProducer` against temporary
//! repositories. Remotes are local bare repositories, so no network is used.

use std::path::Path;

use git2::Repository;
use gitroute_core::endpoint::GitEndpoint;
use gitroute_core::producer::{
    Exchange, GitBody, GitProducer, ProducerError, Processor, HEADER_COMMIT_MESSAGE,
    HEADER_FILENAME, HEADER_OPERATION,
};
use gitroute_core::server::git::{CommitInfo, PullOutcome};
use tempfile::TempDir;

fn endpoint(local: &Path) -> GitEndpoint {
    GitEndpoint {
        local_path: Some(local.display().to_string()),
        ..Default::default()
    }
}

fn on_branch(local: &Path, branch: &str) -> GitEndpoint {
    GitEndpoint {
        branch_name: Some(branch.to_string()),
        ..endpoint(local)
    }
}

fn with_remote(local: &Path, remote: &str) -> GitEndpoint {
    GitEndpoint {
        remote_path: Some(remote.to_string()),
        ..endpoint(local)
    }
}

async fn run(
    endpoint: &GitEndpoint,
    operation: &str,
    headers: &[(&str, &str)],
) -> Result<Exchange, ProducerError> {
    let mut exchange = Exchange::new();
    exchange.set_header(HEADER_OPERATION, operation);
    for (name, value) in headers {
        exchange.set_header(*name, *value);
    }
    GitProducer::new(endpoint.clone()).process(exchange).await
}

fn write(root: &Path, rel: &str, content: &str) {
    std::fs::write(root.join(rel), content).unwrap();
}

async fn log(endpoint: &GitEndpoint) -> Vec<CommitInfo> {
    match run(endpoint, "log", &[]).await.unwrap().body {
        Some(GitBody::Log { commits }) => commits,
        other => panic!("expected log body, got {:?}", other),
    }
}

/// Initialised repository with one committed file
async fn repo_with_commit(dir: &TempDir) -> GitEndpoint {
    let ep = endpoint(dir.path());
    run(&ep, "init", &[]).await.unwrap();
    write(dir.path(), "filetest.txt", "hello");
    run(&ep, "add", &[(HEADER_FILENAME, "filetest.txt")]).await.unwrap();
    run(&ep, "commit", &[(HEADER_COMMIT_MESSAGE, "Test commit")])
        .await
        .unwrap();
    ep
}

fn current_branch(path: &Path) -> String {
    let repo = Repository::open(path).unwrap();
    let head = repo.find_reference("HEAD").unwrap();
    head.symbolic_target()
        .unwrap()
        .trim_start_matches("refs/heads/")
        .to_string()
}

#[tokio::test]
async fn init_creates_repository() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("repo");

    let exchange = run(&endpoint(&local), "init", &[]).await.unwrap();

    assert!(exchange.body.is_none());
    assert!(local.join(".git").is_dir());
}

#[tokio::test]
async fn add_shows_up_in_status() {
    let dir = tempfile::tempdir().unwrap();
    let ep = endpoint(dir.path());
    run(&ep, "init", &[]).await.unwrap();
    write(dir.path(), "filetest.txt", "");

    run(&ep, "add", &[(HEADER_FILENAME, "filetest.txt")]).await.unwrap();

    match run(&ep, "status", &[]).await.unwrap().body {
        Some(GitBody::Status(status)) => {
            assert!(status.added.contains("filetest.txt"));
            assert!(!status.clean);
        }
        other => panic!("expected status body, got {:?}", other),
    }
}

#[tokio::test]
async fn commit_then_log() {
    let dir = tempfile::tempdir().unwrap();
    let ep = repo_with_commit(&dir).await;

    let commits = log(&ep).await;

    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].summary, "Test commit");
}

#[tokio::test]
async fn commit_returns_commit_body() {
    let dir = tempfile::tempdir().unwrap();
    let ep = repo_with_commit(&dir).await;
    write(dir.path(), "second.txt", "2");
    run(&ep, "add", &[(HEADER_FILENAME, ".")]).await.unwrap();

    let exchange = run(&ep, "commit", &[(HEADER_COMMIT_MESSAGE, "Second")])
        .await
        .unwrap();

    match exchange.body {
        Some(GitBody::Commit(info)) => {
            assert_eq!(info.summary, "Second");
            assert_eq!(info.sha.len(), 40);
            assert_eq!(log(&ep).await[0].sha, info.sha);
        }
        other => panic!("expected commit body, got {:?}", other),
    }
}

#[tokio::test]
async fn commit_on_branch() {
    let dir = tempfile::tempdir().unwrap();
    let ep = repo_with_commit(&dir).await;
    let main = current_branch(dir.path());
    let branch_ep = on_branch(dir.path(), "testBranch");

    run(&branch_ep, "createBranch", &[]).await.unwrap();
    write(dir.path(), "filetest2.txt", "two");
    run(&branch_ep, "add", &[(HEADER_FILENAME, "filetest2.txt")])
        .await
        .unwrap();
    run(&branch_ep, "commit", &[(HEADER_COMMIT_MESSAGE, "Test commit 2")])
        .await
        .unwrap();

    let commits = log(&branch_ep).await;
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].summary, "Test commit 2");
    assert_eq!(commits[1].summary, "Test commit");
    assert_eq!(current_branch(dir.path()), "testBranch");

    let main_commits = log(&on_branch(dir.path(), &main)).await;
    assert_eq!(main_commits.len(), 1);
    assert!(!dir.path().join("filetest2.txt").exists());
}

#[tokio::test]
async fn commit_all_stages_tracked_changes() {
    let dir = tempfile::tempdir().unwrap();
    let ep = repo_with_commit(&dir).await;
    write(dir.path(), "filetest.txt", "changed");
    write(dir.path(), "untracked.txt", "left alone");

    run(&ep, "commitAll", &[(HEADER_COMMIT_MESSAGE, "All tracked")])
        .await
        .unwrap();

    match run(&ep, "status", &[]).await.unwrap().body {
        Some(GitBody::Status(status)) => {
            assert!(status.modified.is_empty());
            assert!(status.untracked.contains("untracked.txt"));
        }
        other => panic!("expected status body, got {:?}", other),
    }
    assert_eq!(log(&ep).await.len(), 2);
}

#[tokio::test]
async fn remove_deletes_tracked_file() {
    let dir = tempfile::tempdir().unwrap();
    let ep = repo_with_commit(&dir).await;

    run(&ep, "remove", &[(HEADER_FILENAME, "filetest.txt")])
        .await
        .unwrap();

    assert!(!dir.path().join("filetest.txt").exists());
    match run(&ep, "status", &[]).await.unwrap().body {
        Some(GitBody::Status(status)) => assert!(status.removed.contains("filetest.txt")),
        other => panic!("expected status body, got {:?}", other),
    }
}

#[tokio::test]
async fn delete_branch_rules() {
    let dir = tempfile::tempdir().unwrap();
    let ep = repo_with_commit(&dir).await;
    let old = on_branch(dir.path(), "old");
    run(&old, "createBranch", &[]).await.unwrap();

    run(&old, "deleteBranch", &[]).await.unwrap();
    let repo = Repository::open(dir.path()).unwrap();
    assert!(repo.find_branch("old", git2::BranchType::Local).is_err());

    let current = on_branch(dir.path(), &current_branch(dir.path()));
    let err = run(&current, "deleteBranch", &[]).await.unwrap_err();
    assert_eq!(err.code(), "branch_protected");

    let err = run(&ep, "deleteBranch", &[]).await.unwrap_err();
    assert_eq!(err.to_string(), "Branch name must be specified to execute deleteBranch");
}

#[tokio::test]
async fn checkout_of_missing_branch_fails() {
    let dir = tempfile::tempdir().unwrap();
    repo_with_commit(&dir).await;

    let err = run(&on_branch(dir.path(), "nope"), "status", &[])
        .await
        .unwrap_err();

    assert_eq!(err.code(), "branch_not_found");
}

#[tokio::test]
async fn push_clone_and_pull_round_trip() {
    let source_dir = tempfile::tempdir().unwrap();
    let source = repo_with_commit(&source_dir).await;

    let remote_dir = tempfile::tempdir().unwrap();
    Repository::init_bare(remote_dir.path()).unwrap();
    let remote = remote_dir.path().display().to_string();

    let pushed = run(&with_remote(source_dir.path(), &remote), "push", &[])
        .await
        .unwrap();
    match pushed.body {
        Some(GitBody::Push(result)) => {
            let branch = current_branch(source_dir.path());
            assert_eq!(result.refspecs, vec![format!("refs/heads/{0}:refs/heads/{0}", branch)]);
            assert!(result.updates.iter().all(|u| u.ok));
        }
        other => panic!("expected push body, got {:?}", other),
    }

    let clone_parent = tempfile::tempdir().unwrap();
    let clone_path = clone_parent.path().join("clone");
    run(&with_remote(&clone_path, &remote), "clone", &[])
        .await
        .unwrap();
    assert!(clone_path.join("filetest.txt").exists());

    write(source_dir.path(), "later.txt", "later");
    run(&source, "add", &[(HEADER_FILENAME, "later.txt")]).await.unwrap();
    run(&source, "commit", &[(HEADER_COMMIT_MESSAGE, "Later")])
        .await
        .unwrap();
    run(&with_remote(source_dir.path(), &remote), "push", &[])
        .await
        .unwrap();

    let pulled = run(&with_remote(&clone_path, "origin"), "pull", &[])
        .await
        .unwrap();
    match pulled.body {
        Some(GitBody::Pull(result)) => {
            assert_eq!(result.outcome, PullOutcome::FastForward);
            assert!(result.conflicts.is_empty());
        }
        other => panic!("expected pull body, got {:?}", other),
    }
    assert!(clone_path.join("later.txt").exists());
    assert_eq!(log(&endpoint(&clone_path)).await[0].summary, "Later");
}

#[tokio::test]
async fn clone_into_existing_directory_is_refused() {
    let dir = tempfile::tempdir().unwrap();

    let err = run(&with_remote(dir.path(), "/does/not/matter"), "clone", &[])
        .await
        .unwrap_err();

    assert_eq!(err.code(), "local_path_exists");
}

#[tokio::test]
async fn endpoint_operation_overrides_header() {
    let dir = tempfile::tempdir().unwrap();
    let ep = repo_with_commit(&dir).await;
    let fixed = GitEndpoint {
        operation: Some("log".to_string()),
        ..ep
    };

    let exchange = run(&fixed, "status", &[]).await.unwrap();

    assert!(matches!(exchange.body, Some(GitBody::Log { .. })));
}
