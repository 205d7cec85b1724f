use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Settings for [`TreeFsServer`](crate::TreeFsServer).
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Reference whose tree is served: `HEAD`, a full `refs/...` name, or
    /// a short branch or tag name.
    pub reference: String,
    /// File served in place of a directory listing when present.
    pub index_file: Option<String>,
    /// Render an HTML listing for directories without an index file.
    pub directory_listing: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            reference: "HEAD".to_string(),
            index_file: Some("index.html".to_string()),
            directory_listing: true,
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| ServerError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
