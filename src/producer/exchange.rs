//! Message exchange carried through a Git endpoint

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::operation::GitOperation;
use crate::server::git::{CommitInfo, GitPullResult, GitPushResult, GitStatusSummary};

/// Operation to run when the endpoint does not fix one
pub const HEADER_OPERATION: &str = "GitOperation";
/// Pathspec for `add` and `remove`
pub const HEADER_FILENAME: &str = "GitFilename";
/// Message for `commit` and `commitAll`
pub const HEADER_COMMIT_MESSAGE: &str = "GitCommitMessage";

/// Result payload placed on the exchange by an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GitBody {
    Status(GitStatusSummary),
    Log { commits: Vec<CommitInfo> },
    Commit(CommitInfo),
    Push(GitPushResult),
    Pull(GitPullResult),
}

/// One inbound message and, after processing, its outbound result
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    pub id: String,
    pub headers: HashMap<String, String>,
    /// Operation that was resolved and run
    pub operation: Option<GitOperation>,
    pub body: Option<GitBody>,
}

impl Exchange {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Header value by case-insensitive name; blank values count as absent
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }
}
