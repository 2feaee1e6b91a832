//! Git remote operations
//!
//! Provides clone, push and pull against a remote given either as a
//! configured remote name or as a URL/path.

use std::path::Path;

use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    AnnotatedCommit, Cred, FetchOptions, Oid, PushOptions, Remote, RemoteCallbacks, Repository,
};
use tracing::{debug, info, warn};

use super::utils::*;

/// Plaintext user/password credential that is handed out once
///
/// A second request means the remote rejected the first attempt, so it
/// fails instead of letting libgit2 ask forever.
pub struct SingleAttemptCredential<'a> {
    username: &'a str,
    password: &'a str,
    attempted: bool,
}

impl<'a> SingleAttemptCredential<'a> {
    pub fn new(username: &'a str, password: &'a str) -> Self {
        Self {
            username,
            password,
            attempted: false,
        }
    }

    pub fn next(&mut self) -> Result<Cred, git2::Error> {
        if self.attempted {
            return Err(git2::Error::from_str("authentication rejected by remote"));
        }
        self.attempted = true;
        Cred::userpass_plaintext(self.username, self.password)
    }
}

/// Credential source for an endpoint, if it carries both user and password
pub fn credential_source<'a>(
    credentials: Option<(&'a str, &'a str)>,
) -> Option<SingleAttemptCredential<'a>> {
    credentials.map(|(username, password)| SingleAttemptCredential::new(username, password))
}

/// Remote callbacks carrying plaintext credentials
pub fn remote_callbacks<'a>(credentials: Option<(&'a str, &'a str)>) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(mut source) = credential_source(credentials) {
        callbacks.credentials(move |_url, _username_from_url, _allowed| source.next());
    }
    callbacks
}

/// Clone `remote` into `local_path`
pub fn git_clone(
    remote: &str,
    local_path: &Path,
    credentials: Option<(&str, &str)>,
) -> Result<Repository, GitError> {
    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(remote_callbacks(credentials));

    let repo = RepoBuilder::new()
        .fetch_options(fetch_opts)
        .clone(remote, local_path)?;

    info!("Cloned {} into {}", remote, local_path.display());
    Ok(repo)
}

/// Resolve `remote` as a configured remote name, else as an anonymous URL
fn find_or_anonymous<'r>(repo: &'r Repository, remote: &str) -> Result<Remote<'r>, GitError> {
    match repo.find_remote(remote) {
        Ok(found) => Ok(found),
        Err(_) => Ok(repo.remote_anonymous(remote)?),
    }
}

/// Push the current branch to the same-named branch on `remote`
pub fn git_push(
    repo: &Repository,
    remote: &str,
    credentials: Option<(&str, &str)>,
) -> Result<GitPushResult, GitError> {
    let branch = current_branch(repo)?;
    if head_commit(repo)?.is_none() {
        return Err(GitError::UnbornHead);
    }

    let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
    let mut target = find_or_anonymous(repo, remote)?;
    let mut updates: Vec<PushRefUpdate> = Vec::new();

    {
        let mut callbacks = remote_callbacks(credentials);
        callbacks.push_update_reference(|reference, status| {
            updates.push(PushRefUpdate {
                reference: reference.to_string(),
                ok: status.is_none(),
                message: status.map(str::to_string),
            });
            Ok(())
        });
        let mut push_opts = PushOptions::new();
        push_opts.remote_callbacks(callbacks);
        target.push(&[refspec.as_str()], Some(&mut push_opts))?;
    }

    for rejected in updates.iter().filter(|u| !u.ok) {
        warn!(
            "Remote rejected {}: {}",
            rejected.reference,
            rejected.message.as_deref().unwrap_or("unknown reason")
        );
    }

    Ok(GitPushResult {
        remote: target.url().unwrap_or(remote).to_string(),
        refspecs: vec![refspec],
        updates,
    })
}

/// Upstream branch for `branch`: `branch.<name>.merge` if configured,
/// else the same name
fn upstream_branch(repo: &Repository, branch: &str) -> String {
    repo.config()
        .ok()
        .and_then(|config| config.get_string(&format!("branch.{}.merge", branch)).ok())
        .map(|merge| {
            merge
                .strip_prefix("refs/heads/")
                .unwrap_or(merge.as_str())
                .to_string()
        })
        .unwrap_or_else(|| branch.to_string())
}

fn fetched_commit(repo: &Repository) -> Result<Oid, GitError> {
    let mut fetched: Option<Oid> = None;
    repo.fetchhead_foreach(|_ref_name, _url, oid, _is_merge| {
        if fetched.is_none() {
            fetched = Some(*oid);
        }
        true
    })?;
    fetched.ok_or_else(|| GitError::Library(git2::Error::from_str("nothing fetched")))
}

/// Fetch the upstream branch from `remote` and merge it into the current one
pub fn git_pull(
    repo: &Repository,
    remote: &str,
    credentials: Option<(&str, &str)>,
) -> Result<GitPullResult, GitError> {
    if repo.is_bare() {
        return Err(GitError::BareRepository);
    }

    let branch = current_branch(repo)?;
    let upstream = upstream_branch(repo, &branch);
    let mut source = find_or_anonymous(repo, remote)?;
    let remote_label = source.url().unwrap_or(remote).to_string();

    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(remote_callbacks(credentials));
    let fetch_spec = format!("refs/heads/{}", upstream);
    source.fetch(&[fetch_spec.as_str()], Some(&mut fetch_opts), None)?;

    let fetched = fetched_commit(repo)?;
    let annotated = repo.find_annotated_commit(fetched)?;
    let (analysis, _) = repo.merge_analysis(&[&annotated])?;

    let mut result = GitPullResult {
        remote: remote_label,
        branch: upstream.clone(),
        outcome: PullOutcome::UpToDate,
        head: None,
        conflicts: Vec::new(),
    };

    if analysis.is_up_to_date() {
        debug!("Branch '{}' already up to date", branch);
    } else if analysis.is_unborn() {
        let target = repo.find_object(fetched, None)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        repo.checkout_tree(&target, Some(&mut checkout))?;
        repo.reference(
            &format!("refs/heads/{}", branch),
            fetched,
            true,
            &format!("pull: initial branch from {}", upstream),
        )?;
        result.outcome = PullOutcome::FastForward;
    } else if analysis.is_fast_forward() {
        fast_forward(repo, &branch, fetched)?;
        result.outcome = PullOutcome::FastForward;
    } else if analysis.is_normal() {
        merge_fetched(repo, &annotated, &upstream, &mut result)?;
    }

    if result.outcome != PullOutcome::Conflicting {
        result.head = head_commit(repo)?.map(|c| c.id().to_string());
    }

    info!(
        "Pulled {} from {}: {}",
        upstream,
        result.remote,
        result.outcome.as_str()
    );
    Ok(result)
}

fn fast_forward(repo: &Repository, branch: &str, target: Oid) -> Result<(), GitError> {
    let object = repo.find_object(target, None)?;
    let mut checkout = CheckoutBuilder::new();
    checkout.safe();
    repo.checkout_tree(&object, Some(&mut checkout))?;

    let mut reference = repo.find_reference(&format!("refs/heads/{}", branch))?;
    reference.set_target(target, "pull: fast-forward")?;
    Ok(())
}

fn merge_fetched(
    repo: &Repository,
    annotated: &AnnotatedCommit<'_>,
    upstream: &str,
    result: &mut GitPullResult,
) -> Result<(), GitError> {
    repo.merge(&[annotated], None, None)?;

    let mut index = repo.index()?;
    if index.has_conflicts() {
        result.conflicts = conflict_paths(&index)?;
        result.outcome = PullOutcome::Conflicting;
        warn!(
            "Pull of {} left {} conflicting path(s)",
            upstream,
            result.conflicts.len()
        );
        return Ok(());
    }

    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let sig = signature(repo)?;
    let ours = head_commit(repo)?.ok_or(GitError::UnbornHead)?;
    let theirs = repo.find_commit(annotated.id())?;
    let message = format!("Merge branch '{}' of {}", upstream, result.remote);
    repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &[&ours, &theirs])?;
    repo.cleanup_state()?;

    result.outcome = PullOutcome::Merged;
    Ok(())
}
