//! The operations a Git endpoint can run

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GitOperation {
    Clone,
    Init,
    Add,
    Remove,
    Commit,
    CommitAll,
    CreateBranch,
    DeleteBranch,
    Status,
    Log,
    Push,
    Pull,
}

impl GitOperation {
    pub const ALL: [GitOperation; 12] = [
        GitOperation::Clone,
        GitOperation::Init,
        GitOperation::Add,
        GitOperation::Remove,
        GitOperation::Commit,
        GitOperation::CommitAll,
        GitOperation::CreateBranch,
        GitOperation::DeleteBranch,
        GitOperation::Status,
        GitOperation::Log,
        GitOperation::Push,
        GitOperation::Pull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GitOperation::Clone => "clone",
            GitOperation::Init => "init",
            GitOperation::Add => "add",
            GitOperation::Remove => "remove",
            GitOperation::Commit => "commit",
            GitOperation::CommitAll => "commitAll",
            GitOperation::CreateBranch => "createBranch",
            GitOperation::DeleteBranch => "deleteBranch",
            GitOperation::Status => "status",
            GitOperation::Log => "log",
            GitOperation::Push => "push",
            GitOperation::Pull => "pull",
        }
    }

    /// Operations that work on an existing repository and therefore switch
    /// to the endpoint branch first
    pub fn checks_out_branch(&self) -> bool {
        !matches!(
            self,
            GitOperation::Clone
                | GitOperation::Init
                | GitOperation::CreateBranch
                | GitOperation::DeleteBranch
        )
    }

    /// Whether the operation opens an existing repository at the local path
    pub fn opens_repository(&self) -> bool {
        !matches!(self, GitOperation::Clone | GitOperation::Init)
    }
}

impl fmt::Display for GitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl FromStr for GitOperation {
    type Err = UnknownOperation;

    /// Case-insensitive; `-` and `_` are ignored, so `commit-all` and
    /// `COMMIT_ALL` both name `commitAll`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        GitOperation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| UnknownOperation(s.trim().to_string()))
    }
}
