//! Git status query functions
//!
//! Provides functions to query working tree status and commit history.

use git2::{Repository, Sort, Status, StatusOptions};

use super::utils::*;

/// Get working tree and index status
///
/// A path can appear in both an index category and a working tree category
/// (staged, then modified again).
pub fn git_status(repo: &Repository) -> Result<GitStatusSummary, GitError> {
    if repo.is_bare() {
        return Err(GitError::BareRepository);
    }

    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(false);

    let statuses = repo.statuses(Some(&mut opts))?;
    let mut summary = GitStatusSummary::default();

    for entry in statuses.iter() {
        let path = match entry.path() {
            Some(p) => p.to_string(),
            None => String::from_utf8_lossy(entry.path_bytes()).into_owned(),
        };
        let status = entry.status();

        if status.is_conflicted() {
            summary.conflicting.insert(path);
            continue;
        }

        if status.is_index_new() {
            summary.added.insert(path.clone());
        }
        if status.intersects(Status::INDEX_MODIFIED | Status::INDEX_RENAMED | Status::INDEX_TYPECHANGE)
        {
            summary.changed.insert(path.clone());
        }
        if status.is_index_deleted() {
            summary.removed.insert(path.clone());
        }

        if status.is_wt_deleted() {
            summary.missing.insert(path.clone());
        }
        if status.intersects(Status::WT_MODIFIED | Status::WT_TYPECHANGE | Status::WT_RENAMED) {
            summary.modified.insert(path.clone());
        }
        if status.is_wt_new() {
            summary.untracked.insert(path);
        }
    }

    summary.clean = summary.added.is_empty()
        && summary.changed.is_empty()
        && summary.removed.is_empty()
        && summary.missing.is_empty()
        && summary.modified.is_empty()
        && summary.untracked.is_empty()
        && summary.conflicting.is_empty();

    Ok(summary)
}

/// Walk history from HEAD, newest first
pub fn git_log(repo: &Repository) -> Result<Vec<CommitInfo>, GitError> {
    if head_commit(repo)?.is_none() {
        return Err(GitError::UnbornHead);
    }

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;
    revwalk.push_head()?;

    let mut commits = Vec::new();
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        commits.push(CommitInfo::from_commit(&commit));
    }
    Ok(commits)
}
