//! Errors raised while dispatching an exchange to Git

use thiserror::Error;

use super::operation::GitOperation;
use crate::server::git::GitError;

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Git operation must be specified by the endpoint or the GitOperation header")]
    MissingOperation,
    #[error("Unknown git operation: {0}")]
    UnknownOperation(String),
    #[error("Local path must be specified to execute {0}")]
    MissingLocalPath(GitOperation),
    #[error("Remote path must be specified to execute {0}")]
    MissingRemotePath(GitOperation),
    #[error("File name must be specified to execute {0}")]
    MissingFileName(GitOperation),
    #[error("Commit message must be specified to execute {0}")]
    MissingCommitMessage(GitOperation),
    #[error("Branch name must be specified to execute {0}")]
    MissingBranchName(GitOperation),
    #[error("Local path already exists: {0}")]
    LocalPathExists(String),
    #[error("{operation} failed: {source}")]
    Git {
        operation: GitOperation,
        #[source]
        source: GitError,
    },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProducerError {
    /// Stable code reported to clients
    pub fn code(&self) -> &'static str {
        match self {
            ProducerError::MissingOperation => "missing_operation",
            ProducerError::UnknownOperation(_) => "unknown_operation",
            ProducerError::MissingLocalPath(_)
            | ProducerError::MissingRemotePath(_)
            | ProducerError::MissingFileName(_)
            | ProducerError::MissingCommitMessage(_)
            | ProducerError::MissingBranchName(_) => "missing_parameter",
            ProducerError::LocalPathExists(_) => "local_path_exists",
            ProducerError::Git { source, .. } => match source {
                GitError::NotAGitRepo(_) => "not_a_git_repo",
                GitError::BranchNotFound(_) => "branch_not_found",
                GitError::BranchCheckedOut(_) | GitError::BranchNotMerged(_) => "branch_protected",
                GitError::UnbornHead => "unborn_head",
                _ => "git_error",
            },
            ProducerError::Internal(_) => "internal_error",
        }
    }

    /// Operation the error belongs to, when one was resolved
    pub fn operation(&self) -> Option<GitOperation> {
        match self {
            ProducerError::MissingLocalPath(op)
            | ProducerError::MissingRemotePath(op)
            | ProducerError::MissingFileName(op)
            | ProducerError::MissingCommitMessage(op)
            | ProducerError::MissingBranchName(op) => Some(*op),
            ProducerError::Git { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for ProducerError {
    fn from(e: tokio::task::JoinError) -> Self {
        ProducerError::Internal(format!("git task failed: {}", e))
    }
}
