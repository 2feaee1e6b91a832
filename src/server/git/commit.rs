//! Git commit operations
//!
//! Provides functions for committing the index and committing all tracked
//! changes.

use git2::{Commit, Oid, Repository, RepositoryState};
use tracing::debug;

use super::utils::*;

/// Commit the current index on top of HEAD
///
/// An unborn HEAD produces a root commit. When a merge is in progress the
/// merge heads become additional parents and the merge state is cleared.
pub fn git_commit(repo: &Repository, message: &str) -> Result<CommitInfo, GitError> {
    let mut index = repo.index()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let sig = signature(repo)?;

    let mut merge_heads: Vec<Oid> = Vec::new();
    let merging = repo.state() == RepositoryState::Merge;
    if merging {
        // mergehead_foreach needs a mutable handle
        let mut merge_repo = Repository::open(repo.path())?;
        merge_repo.mergehead_foreach(|oid| {
            merge_heads.push(*oid);
            true
        })?;
    }

    let head = head_commit(repo)?;
    let mut parents: Vec<Commit<'_>> = head.into_iter().collect();
    for oid in merge_heads {
        parents.push(repo.find_commit(oid)?);
    }
    let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();

    let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?;
    if merging {
        repo.cleanup_state()?;
    }

    let commit = repo.find_commit(oid)?;
    debug!("Created commit {} with {} parent(s)", oid, parent_refs.len());
    Ok(CommitInfo::from_commit(&commit))
}

/// Stage modifications and deletions of tracked files, then commit
///
/// Untracked files are left alone, like `git commit -a`.
pub fn git_commit_all(repo: &Repository, message: &str) -> Result<CommitInfo, GitError> {
    if repo.is_bare() {
        return Err(GitError::BareRepository);
    }

    let mut index = repo.index()?;
    index.update_all(["*"].iter(), None)?;
    index.write()?;

    git_commit(repo, message)
}
