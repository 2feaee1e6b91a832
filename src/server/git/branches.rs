//! Git branch management
//!
//! Provides functions for checking out, creating, and deleting local branches.

use git2::{build::CheckoutBuilder, BranchType, ErrorCode, ObjectType, Repository};
use tracing::debug;

use super::utils::*;

/// Switch HEAD to an existing local branch without creating it
///
/// Uses a safe checkout: local modifications that would be overwritten make
/// the checkout fail instead of being discarded.
pub fn git_checkout_branch(repo: &Repository, branch: &str) -> Result<(), GitError> {
    let refname = format!("refs/heads/{}", branch);
    let reference = repo.find_reference(&refname).map_err(|e| {
        if e.code() == ErrorCode::NotFound || e.code() == ErrorCode::InvalidSpec {
            GitError::BranchNotFound(branch.to_string())
        } else {
            GitError::Library(e)
        }
    })?;

    if let Ok(head) = repo.head() {
        if head.name() == Some(refname.as_str()) {
            return Ok(());
        }
    }

    let target = reference.peel(ObjectType::Commit)?;
    let mut opts = CheckoutBuilder::new();
    opts.safe();
    repo.checkout_tree(&target, Some(&mut opts))?;
    repo.set_head(&refname)?;

    debug!("Checked out branch '{}'", branch);
    Ok(())
}

/// Create a local branch at HEAD without switching to it
pub fn git_create_branch(repo: &Repository, branch: &str) -> Result<(), GitError> {
    let head = head_commit(repo)?.ok_or(GitError::UnbornHead)?;
    repo.branch(branch, &head, false)?;

    debug!("Created branch '{}' at {}", branch, head.id());
    Ok(())
}

/// Delete a local branch
///
/// Refuses to delete the checked-out branch, and a branch whose tip is not
/// reachable from HEAD.
pub fn git_delete_branch(repo: &Repository, branch: &str) -> Result<(), GitError> {
    let mut local = repo
        .find_branch(branch, BranchType::Local)
        .map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                GitError::BranchNotFound(branch.to_string())
            } else {
                GitError::Library(e)
            }
        })?;

    if local.is_head() {
        return Err(GitError::BranchCheckedOut(branch.to_string()));
    }

    let tip = local.get().target();
    let head = head_commit(repo)?.map(|c| c.id());
    if let (Some(tip), Some(head)) = (tip, head) {
        if tip != head && !repo.graph_descendant_of(head, tip)? {
            return Err(GitError::BranchNotMerged(branch.to_string()));
        }
    }

    local.delete()?;
    debug!("Deleted branch '{}'", branch);
    Ok(())
}
