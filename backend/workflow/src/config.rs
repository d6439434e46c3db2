//! Controller configuration.

use std::time::Duration;

use ide_core::Network;

use crate::errors::{Result, WorkflowError};

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Base URL of the IDE API (e.g. http://localhost:3001)
    pub api_url: String,
    /// Network every deploy targets
    pub network: Network,
    /// Name given to the project created when the store is empty
    pub default_project_name: String,
    /// Limit for project reads and writes
    pub request_timeout: Duration,
    /// Limit for one compile call; longer than the server's own build timeout
    pub compile_timeout: Duration,
    /// Limit for one deploy call
    pub deploy_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001".to_string(),
            network: Network::Testnet,
            default_project_name: "My Soroban Contract".to_string(),
            request_timeout: Duration::from_secs(30),
            compile_timeout: Duration::from_secs(330),
            deploy_timeout: Duration::from_secs(210),
        }
    }
}

impl WorkflowConfig {
    /// Defaults overridden by `IDE_API_URL` and `IDE_NETWORK`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("IDE_API_URL") {
            config.api_url = url;
        }
        if let Ok(network) = std::env::var("IDE_NETWORK") {
            config.network = network.parse().map_err(WorkflowError::Config)?;
        }
        Ok(config)
    }
}
