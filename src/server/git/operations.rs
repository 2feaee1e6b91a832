//! Git index operations
//!
//! Provides repository initialisation and functions for adding paths to and
//! removing paths from the index.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, IndexMatchedPath, Repository};
use tracing::debug;

use super::utils::*;

/// Create a non-bare repository at `local_path`, creating missing directories
///
/// Re-initialising an existing repository leaves its history untouched.
pub fn git_init(local_path: &Path) -> Result<Repository, GitError> {
    let repo = Repository::init(local_path)?;
    debug!("Initialized repository at {}", local_path.display());
    Ok(repo)
}

/// Stage every path matching `pattern`
///
/// `.` stages the whole working tree, like `git add .`.
pub fn git_add(repo: &Repository, pattern: &str) -> Result<(), GitError> {
    if repo.is_bare() {
        return Err(GitError::BareRepository);
    }

    let pathspec = normalize_pathspec(pattern);
    let mut index = repo.index()?;
    index.add_all([pathspec].iter(), IndexAddOption::DEFAULT, None)?;
    index.write()?;

    debug!("Staged pathspec '{}'", pathspec);
    Ok(())
}

/// Remove every tracked path matching `pattern` from the index and the
/// working tree, like `git rm`
///
/// Returns the removed paths.
pub fn git_remove(repo: &Repository, pattern: &str) -> Result<Vec<String>, GitError> {
    let workdir = repo.workdir().ok_or(GitError::BareRepository)?.to_path_buf();

    let pathspec = normalize_pathspec(pattern);
    let mut matched: Vec<PathBuf> = Vec::new();
    let mut record = |path: &Path, _spec: &[u8]| -> i32 {
        matched.push(path.to_path_buf());
        0
    };

    let mut index = repo.index()?;
    index.remove_all([pathspec].iter(), Some(&mut record as &mut IndexMatchedPath))?;
    index.write()?;

    let mut removed = Vec::with_capacity(matched.len());
    for path in matched {
        let full_path = workdir.join(&path);
        if full_path.is_file() {
            fs::remove_file(&full_path)?;
            prune_empty_parents(&workdir, &full_path);
        }
        removed.push(path.to_string_lossy().into_owned());
    }

    debug!("Removed {} path(s) for pathspec '{}'", removed.len(), pathspec);
    Ok(removed)
}

/// Remove directories left empty by a deletion, stopping at the workdir
fn prune_empty_parents(workdir: &Path, removed: &Path) {
    let mut dir = removed.parent();
    while let Some(current) = dir {
        if current == workdir || !current.starts_with(workdir) {
            break;
        }
        // remove_dir fails on a non-empty directory, which ends the walk
        if fs::remove_dir(current).is_err() {
            break;
        }
        dir = current.parent();
    }
}

fn normalize_pathspec(pattern: &str) -> &str {
    match pattern.trim() {
        "." | "" => "*",
        other => other,
    }
}
