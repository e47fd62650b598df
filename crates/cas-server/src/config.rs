use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::CredentialPair;
use crate::error::{ServerError, ServerResult};

/// Server settings, usually read from a TOML file.
///
/// ```toml
/// bind_addr = "127.0.0.1:8080"
/// data_dir = "./cas-data"
/// access_key = "builder"
/// secret_key = "s3cret"
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub access_key: String,
    pub secret_key: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: PathBuf::from("./cas-data"),
            access_key: String::new(),
            secret_key: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// A server with an empty access or secret key would reject every request.
    pub fn validate(&self) -> ServerResult<()> {
        if self.access_key.is_empty() {
            return Err(ServerError::Config("access_key must not be empty".into()));
        }
        if self.secret_key.is_empty() {
            return Err(ServerError::Config("secret_key must not be empty".into()));
        }
        Ok(())
    }

    pub fn credentials(&self) -> CredentialPair {
        CredentialPair::new(self.access_key.clone(), self.secret_key.clone())
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
