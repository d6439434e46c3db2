//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ide_core::Network;

use crate::errors::{IdeError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the REST API server
    pub port: u16,
    /// SQLite database holding project documents
    pub database_url: String,
    /// Soroban RPC endpoint used for testnet (other networks use their public defaults)
    pub rpc_url: String,
    /// Maximum attempts for a single RPC call before giving up
    pub rpc_max_attempts: u32,
    /// `stellar` CLI binary used to deploy contracts
    pub stellar_cli: String,
    /// Key alias (or secret) the `stellar` CLI signs deployments with
    pub deployer_identity: String,
    /// `cargo` binary used to build contracts
    pub cargo_bin: String,
    /// Directory holding per-build crates and the shared target dir
    pub build_root: PathBuf,
    /// soroban-sdk version written into generated manifests
    pub soroban_sdk_version: String,
    pub compile_timeout_secs: u64,
    pub deploy_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            port: parse_var("PORT", "3001")?,
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./soroban_ide.db".to_string()),
            rpc_url: env_var("RPC_URL")
                .unwrap_or_else(|_| Network::Testnet.default_rpc_url().to_string()),
            rpc_max_attempts: parse_var("RPC_MAX_ATTEMPTS", "4")?,
            stellar_cli: env_var("STELLAR_CLI").unwrap_or_else(|_| "stellar".to_string()),
            deployer_identity: env_var("DEPLOYER_IDENTITY")
                .unwrap_or_else(|_| "default".to_string()),
            cargo_bin: env_var("CARGO_BIN").unwrap_or_else(|_| "cargo".to_string()),
            build_root: env_var("BUILD_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("soroban-ide")),
            soroban_sdk_version: env_var("SOROBAN_SDK_VERSION")
                .unwrap_or_else(|_| "22.0.0".to_string()),
            compile_timeout_secs: parse_var("COMPILE_TIMEOUT_SECS", "300")?,
            deploy_timeout_secs: parse_var("DEPLOY_TIMEOUT_SECS", "180")?,
        })
    }

    pub fn rpc_url_for(&self, network: Network) -> &str {
        match network {
            Network::Testnet => &self.rpc_url,
            other => other.default_rpc_url(),
        }
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy_timeout_secs)
    }

    /// Offline configuration: in-memory store and toolchain paths that never resolve.
    #[cfg(test)]
    pub(crate) fn for_tests(rpc_url: &str, build_root: &std::path::Path) -> Self {
        Config {
            port: 0,
            database_url: "sqlite::memory:".into(),
            rpc_url: rpc_url.into(),
            rpc_max_attempts: 1,
            stellar_cli: "/nonexistent/stellar-for-tests".into(),
            deployer_identity: "tester".into(),
            cargo_bin: "/nonexistent/cargo-for-tests".into(),
            build_root: build_root.to_path_buf(),
            soroban_sdk_version: "22.0.0".into(),
            compile_timeout_secs: 5,
            deploy_timeout_secs: 5,
        }
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| IdeError::Config(format!("Missing env var: {key}")))
}

fn parse_var<T: FromStr>(key: &str, default: &str) -> Result<T> {
    let raw = env_var(key).unwrap_or_else(|_| default.to_string());
    parse_value(key, &raw)
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| IdeError::Config(format!("Invalid {key}: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_accepts_numbers() {
        let port: u16 = parse_value("PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn parse_value_rejects_garbage() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("Invalid PORT"));
    }
}
