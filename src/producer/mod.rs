//! Producer - turns an exchange into one Git operation
//!
//! The operation comes from the endpoint when it fixes one, otherwise from the
//! `GitOperation` header. Every message opens its own repository handle and
//! drops it when the message is done.

pub mod error;
pub mod exchange;
pub mod operation;

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::endpoint::GitEndpoint;
use crate::server::git::{self, GitError};

pub use error::ProducerError;
pub use exchange::{
    Exchange, GitBody, HEADER_COMMIT_MESSAGE, HEADER_FILENAME, HEADER_OPERATION,
};
pub use operation::{GitOperation, UnknownOperation};

/// Something that consumes an exchange and hands back the processed one
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, exchange: Exchange) -> Result<Exchange, ProducerError>;
}

/// Dispatches exchanges to the embedded Git library for one endpoint
#[derive(Debug, Clone)]
pub struct GitProducer {
    endpoint: GitEndpoint,
}

impl GitProducer {
    pub fn new(endpoint: GitEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &GitEndpoint {
        &self.endpoint
    }

    /// Endpoint operation if set, else the `GitOperation` header
    pub fn resolve_operation(&self, exchange: &Exchange) -> Result<GitOperation, ProducerError> {
        let name = self
            .endpoint
            .operation()
            .or_else(|| exchange.header(HEADER_OPERATION))
            .ok_or(ProducerError::MissingOperation)?;

        name.parse()
            .map_err(|UnknownOperation(name)| ProducerError::UnknownOperation(name))
    }

    /// Run the exchange synchronously, storing the result body on it
    pub fn execute(&self, exchange: &mut Exchange) -> Result<(), ProducerError> {
        let operation = self.resolve_operation(exchange)?;
        exchange.operation = Some(operation);

        let local_path = self
            .endpoint
            .local_path()
            .ok_or(ProducerError::MissingLocalPath(operation))?;

        match self.run(operation, Path::new(local_path), exchange) {
            Ok(body) => {
                debug!("{} finished on {}", operation, local_path);
                exchange.body = body;
                Ok(())
            }
            Err(e) => {
                if let ProducerError::Git { source, .. } = &e {
                    error!(
                        "There was an error in git {} operation on {}: {}",
                        operation, local_path, source
                    );
                }
                Err(e)
            }
        }
    }

    fn run(
        &self,
        operation: GitOperation,
        local_path: &Path,
        exchange: &Exchange,
    ) -> Result<Option<GitBody>, ProducerError> {
        use GitOperation::*;

        let git_err = |source: GitError| ProducerError::Git { operation, source };
        let credentials = self.endpoint.credentials();

        // Validate inputs before touching the disk.
        let argument = match operation {
            Add | Remove => exchange
                .header(HEADER_FILENAME)
                .ok_or(ProducerError::MissingFileName(operation))?,
            Commit | CommitAll => exchange
                .header(HEADER_COMMIT_MESSAGE)
                .ok_or(ProducerError::MissingCommitMessage(operation))?,
            CreateBranch | DeleteBranch => self
                .endpoint
                .branch_name()
                .ok_or(ProducerError::MissingBranchName(operation))?,
            Clone | Push | Pull => self
                .endpoint
                .remote_path()
                .ok_or(ProducerError::MissingRemotePath(operation))?,
            Init | Status | Log => "",
        };

        if !operation.opens_repository() {
            if matches!(operation, Clone) {
                if local_path.exists() {
                    return Err(ProducerError::LocalPathExists(
                        local_path.display().to_string(),
                    ));
                }
                git::git_clone(argument, local_path, credentials).map_err(git_err)?;
            } else {
                git::git_init(local_path).map_err(git_err)?;
            }
            return Ok(None);
        }

        let repo = git::open_repo(local_path).map_err(git_err)?;
        if operation.checks_out_branch() {
            if let Some(branch) = self.endpoint.branch_name() {
                git::git_checkout_branch(&repo, branch).map_err(git_err)?;
            }
        }

        let body = match operation {
            Add => {
                git::git_add(&repo, argument).map_err(git_err)?;
                None
            }
            Remove => {
                git::git_remove(&repo, argument).map_err(git_err)?;
                None
            }
            Commit => Some(GitBody::Commit(
                git::git_commit(&repo, argument).map_err(git_err)?,
            )),
            CommitAll => Some(GitBody::Commit(
                git::git_commit_all(&repo, argument).map_err(git_err)?,
            )),
            CreateBranch => {
                git::git_create_branch(&repo, argument).map_err(git_err)?;
                None
            }
            DeleteBranch => {
                git::git_delete_branch(&repo, argument).map_err(git_err)?;
                None
            }
            Status => Some(GitBody::Status(git::git_status(&repo).map_err(git_err)?)),
            Log => Some(GitBody::Log {
                commits: git::git_log(&repo).map_err(git_err)?,
            }),
            Push => Some(GitBody::Push(
                git::git_push(&repo, argument, credentials).map_err(git_err)?,
            )),
            Pull => Some(GitBody::Pull(
                git::git_pull(&repo, argument, credentials).map_err(git_err)?,
            )),
            Clone | Init => None,
        };

        Ok(body)
    }
}

#[async_trait]
impl Processor for GitProducer {
    async fn process(&self, mut exchange: Exchange) -> Result<Exchange, ProducerError> {
        let producer = self.clone();
        tokio::task::spawn_blocking(move || -> Result<Exchange, ProducerError> {
            producer.execute(&mut exchange)?;
            Ok(exchange)
        })
        .await?
    }
}
