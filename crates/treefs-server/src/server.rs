use std::sync::Arc;

use tokio::net::TcpListener;
use treefs::{FileSystem, TreeFs};
use treefs_repo::Repository;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Static file server over one filesystem.
pub struct TreeFsServer {
    config: ServerConfig,
    fs: Arc<dyn FileSystem>,
}

impl TreeFsServer {
    pub fn new(fs: Arc<dyn FileSystem>, config: ServerConfig) -> Self {
        Self { config, fs }
    }

    /// Serve the tree of `config.reference` in `repo`.
    pub fn from_repository(repo: &Repository, config: ServerConfig) -> ServerResult<Self> {
        let reference = repo.find_reference(&config.reference)?;
        let fs = TreeFs::from_reference(repo, &reference)?;
        tracing::debug!(
            reference = %reference.canonical_name(),
            tree = %fs.root_id().short_hex(),
            "serving reference"
        );
        Ok(Self::new(Arc::new(fs), config))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.fs), self.config.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "treefs server listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treefs_repo::{EntryMode, RepoError, Signature, TreeEntry};

    fn repo_with_site() -> Repository {
        let repo = Repository::in_memory().unwrap();
        let page = repo.write_blob(b"<h1>hi</h1>").unwrap();
        let tree = repo
            .write_tree(vec![TreeEntry::new(EntryMode::Regular, "index.html", page)])
            .unwrap();
        let sig = Signature::now("Site Builder", "site@example.com");
        let commit = repo.commit(Some("HEAD"), &sig, &sig, "site\n", tree).unwrap();
        repo.create_tag("v1", commit, &sig, "first release").unwrap();
        repo
    }

    #[test]
    fn server_construction() {
        let repo = repo_with_site();
        let server = TreeFsServer::from_repository(&repo, ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:8080".parse().unwrap());
        let _router = server.router();
    }

    #[test]
    fn serves_short_reference_names() {
        let repo = repo_with_site();
        for reference in ["HEAD", "main", "v1", "refs/tags/v1"] {
            let config = ServerConfig {
                reference: reference.to_string(),
                ..ServerConfig::default()
            };
            assert!(TreeFsServer::from_repository(&repo, config).is_ok(), "{reference}");
        }
    }

    #[test]
    fn unknown_reference_fails() {
        let repo = repo_with_site();
        let config = ServerConfig {
            reference: "gh-pages".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            TreeFsServer::from_repository(&repo, config),
            Err(ServerError::Repo(RepoError::Ref(_)))
        ));
    }
}
