//! Startup configuration

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Where the client finds its coordinator and how it names itself.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Unix socket the coordinator listens on
    pub ipc_path: PathBuf,
    /// Identifier used for observability
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

fn default_client_id() -> String {
    "client".to_string()
}

impl ClientConfig {
    pub const IPC_PATH_VAR: &'static str = "IPC_PATH";
    pub const CLIENT_ID_VAR: &'static str = "CLIENT_ID";

    pub fn new(ipc_path: impl Into<PathBuf>) -> Self {
        Self {
            ipc_path: ipc_path.into(),
            client_id: default_client_id(),
        }
    }

    /// Reads `IPC_PATH` (required) and `CLIENT_ID` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let ipc_path = lookup(Self::IPC_PATH_VAR)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| Error::Config {
                reason: format!("expected the variable \"{}\" to be set", Self::IPC_PATH_VAR),
            })?;
        Ok(Self {
            ipc_path: ipc_path.into(),
            client_id: lookup(Self::CLIENT_ID_VAR).unwrap_or_else(default_client_id),
        })
    }
}
