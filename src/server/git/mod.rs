// Git module - operations backed by libgit2
//
// This module is split into logical submodules:
// - utils: Result types, error type, and repository helpers
// - operations: Index operations (add, remove)
// - commit: Commit and commit-all
// - branches: Branch checkout, creation, and deletion
// - status: Status and log queries
// - remote: Clone, push, and pull

pub mod branches;
pub mod commit;
pub mod operations;
pub mod remote;
pub mod status;
pub mod utils;

pub use branches::*;
pub use commit::*;
pub use operations::*;
pub use remote::*;
pub use status::*;
pub use utils::*;

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::Path;

    use git2::{Oid, Repository, Signature};
    use tempfile::TempDir;

    pub fn init_repo() -> (TempDir, Repository) {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = Repository::init(dir.path()).expect("init repo");
        {
            let mut config = repo.config().expect("repo config");
            config.set_str("user.name", "Test User").expect("user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("user.email");
        }
        (dir, repo)
    }

    pub fn write_file(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write file");
    }

    pub fn commit_file(repo: &Repository, root: &Path, rel: &str, content: &str, msg: &str) -> Oid {
        write_file(root, rel, content);
        let mut index = repo.index().expect("index");
        index.add_path(Path::new(rel)).expect("add path");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("write tree");
        let tree = repo.find_tree(tree_id).expect("find tree");
        let sig = Signature::now("Test User", "test@example.com").expect("signature");
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, msg, &tree, &parents)
            .expect("commit")
    }
}
