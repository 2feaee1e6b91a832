//! Git utilities - result types, errors and helpers shared by the operations
//!
//! Every operation receives a freshly opened `git2::Repository`; nothing here
//! caches handles between messages.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{FixedOffset, TimeZone};
use git2::{Commit, ErrorCode, Index, Repository, Signature};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity used when neither the repository nor the user config has one
pub const FALLBACK_SIGNATURE_NAME: &str = "gitroute";
pub const FALLBACK_SIGNATURE_EMAIL: &str = "gitroute@localhost";

const SHORT_SHA_LEN: usize = 7;

/// Error type for git operations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotAGitRepo(String),
    #[error("Branch '{0}' not found")]
    BranchNotFound(String),
    #[error("Cannot delete branch '{0}': it is checked out")]
    BranchCheckedOut(String),
    #[error("Branch '{0}' is not fully merged")]
    BranchNotMerged(String),
    #[error("Repository has no commits yet")]
    UnbornHead,
    #[error("HEAD is detached")]
    DetachedHead,
    #[error("Operation not supported in bare repository")]
    BareRepository,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Library(#[from] git2::Error),
}

/// Working tree and index status, one path set per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatusSummary {
    /// New in the index
    pub added: BTreeSet<String>,
    /// Modified in the index
    pub changed: BTreeSet<String>,
    /// Deleted from the index
    pub removed: BTreeSet<String>,
    /// Tracked but deleted from the working tree
    pub missing: BTreeSet<String>,
    /// Modified in the working tree, not staged
    pub modified: BTreeSet<String>,
    pub untracked: BTreeSet<String>,
    pub conflicting: BTreeSet<String>,
    pub clean: bool,
}

/// A single commit as reported by `log` and `commit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub short_sha: String,
    /// First line of the message
    pub summary: String,
    pub message: String,
    pub author: String,
    pub author_email: String,
    /// RFC 3339 author date in the author's offset
    pub date: String,
}

impl CommitInfo {
    pub fn from_commit(commit: &Commit<'_>) -> Self {
        let sha = commit.id().to_string();
        let author = commit.author();
        Self {
            short_sha: short_sha(&sha),
            sha,
            summary: commit.summary().unwrap_or_default().to_string(),
            message: commit.message().unwrap_or_default().to_string(),
            author: author.name().unwrap_or("unknown").to_string(),
            author_email: author.email().unwrap_or_default().to_string(),
            date: format_git_time(commit.time()),
        }
    }
}

/// Per-reference outcome reported by the remote during push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRefUpdate {
    pub reference: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Push result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitPushResult {
    pub remote: String,
    pub refspecs: Vec<String>,
    pub updates: Vec<PushRefUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullOutcome {
    UpToDate,
    FastForward,
    Merged,
    Conflicting,
}

impl PullOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullOutcome::UpToDate => "up_to_date",
            PullOutcome::FastForward => "fast_forward",
            PullOutcome::Merged => "merged",
            PullOutcome::Conflicting => "conflicting",
        }
    }
}

/// Pull result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitPullResult {
    pub remote: String,
    /// Remote branch that was fetched and merged
    pub branch: String,
    pub outcome: PullOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
}

/// Open the repository whose working directory is `local_path`
pub fn open_repo(local_path: &Path) -> Result<Repository, GitError> {
    Repository::open(local_path).map_err(|e| {
        if e.code() == ErrorCode::NotFound {
            GitError::NotAGitRepo(local_path.display().to_string())
        } else {
            GitError::Library(e)
        }
    })
}

/// Commit identity from config, or the service fallback
pub fn signature(repo: &Repository) -> Result<Signature<'static>, GitError> {
    repo.signature()
        .or_else(|_| Signature::now(FALLBACK_SIGNATURE_NAME, FALLBACK_SIGNATURE_EMAIL))
        .map_err(GitError::from)
}

/// HEAD commit, `None` on an unborn branch
pub fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>, GitError> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Short name of the branch HEAD points to (works on unborn branches too)
pub fn current_branch(repo: &Repository) -> Result<String, GitError> {
    let head = repo.find_reference("HEAD")?;
    match head.symbolic_target() {
        Some(target) => Ok(target
            .strip_prefix("refs/heads/")
            .unwrap_or(target)
            .to_string()),
        None => Err(GitError::DetachedHead),
    }
}

/// Sorted, de-duplicated paths of all conflict entries in the index
pub fn conflict_paths(index: &Index) -> Result<Vec<String>, GitError> {
    let mut paths = Vec::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        if let Some(entry) = conflict.our.or(conflict.their).or(conflict.ancestor) {
            paths.push(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

pub fn short_sha(sha: &str) -> String {
    sha.chars().take(SHORT_SHA_LEN).collect()
}

fn format_git_time(time: git2::Time) -> String {
    FixedOffset::east_opt(time.offset_minutes() * 60)
        .and_then(|tz| tz.timestamp_opt(time.seconds(), 0).single())
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
