//! Uploads and instantiates a wasm artifact via the
//! `stellar` CLI, after confirming the target network over Soroban RPC.

use std::ffi::OsStr;
use std::io::Write as _;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::{error, info, warn};

use ide_core::{DeployResult, LogEntry, Network};

use crate::config::Config;
use crate::errors::{IdeError, Result};
use crate::rpc;

#[async_trait]
pub trait Deployer: Send + Sync {
    /// Deploy a base64 wasm artifact. Failures are reported in the result.
    async fn deploy(&self, project_id: &str, wasm_base64: &str, network: Network) -> DeployResult;
}

/// Hex sha-256 of a base64 artifact, as recorded in deployment history.
pub fn wasm_hash(wasm_base64: &str) -> Option<String> {
    let wasm = STANDARD.decode(wasm_base64).ok()?;
    Some(hex::encode(Sha256::digest(&wasm)))
}

pub struct StellarCliDeployer {
    config: Config,
    client: Client,
}

impl StellarCliDeployer {
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            config: config.clone(),
            client,
        }
    }

    fn timeout(&self) -> Duration {
        self.config.deploy_timeout()
    }

    async fn run_cli<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.config.stellar_cli);
        cmd.args(args).kill_on_drop(true);
        match tokio::time::timeout(self.timeout(), cmd.output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(IdeError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("{} timed out after {}s", self.config.stellar_cli, self.timeout().as_secs()),
            ))),
        }
    }

    /// Public key of the configured signing identity.
    async fn deployer_address(&self) -> Option<String> {
        match self
            .run_cli(["keys", "address", self.config.deployer_identity.as_str()])
            .await
        {
            Ok(out) if out.status.success() => {
                let address = String::from_utf8_lossy(&out.stdout).trim().to_string();
                (!address.is_empty()).then_some(address)
            }
            Ok(out) => {
                warn!(
                    "Could not resolve deployer address: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                None
            }
            Err(e) => {
                warn!("Could not resolve deployer address: {e}");
                None
            }
        }
    }

    async fn try_deploy(
        &self,
        project_id: &str,
        wasm_base64: &str,
        network: Network,
        logs: &mut Vec<LogEntry>,
    ) -> Result<Option<(String, Option<String>)>> {
        let wasm = match STANDARD.decode(wasm_base64.trim()) {
            Ok(wasm) if !wasm.is_empty() => wasm,
            Ok(_) => {
                logs.push(LogEntry::error("Artifact is empty"));
                return Ok(None);
            }
            Err(e) => {
                logs.push(LogEntry::error(format!("Artifact is not valid base64: {e}")));
                return Ok(None);
            }
        };

        let rpc_url = self.config.rpc_url_for(network);
        logs.push(LogEntry::info(format!("Connecting to {network} RPC at {rpc_url}")));
        let network_info =
            match rpc::get_network(&self.client, rpc_url, self.config.rpc_max_attempts).await {
                Ok(info) => info,
                Err(e) => {
                    logs.push(LogEntry::error(format!("Network unavailable: {e}")));
                    return Ok(None);
                }
            };
        if network_info.passphrase != network.passphrase() {
            logs.push(LogEntry::info(format!(
                "RPC reports network passphrase \"{}\"",
                network_info.passphrase
            )));
        }

        let wallet = self.deployer_address().await;
        if let Some(address) = &wallet {
            logs.push(LogEntry::info(format!("Deploying as {address}")));
        }

        tokio::fs::create_dir_all(&self.config.build_root).await?;
        let mut artifact = tempfile::Builder::new()
            .prefix("deploy-")
            .suffix(".wasm")
            .tempfile_in(&self.config.build_root)?;
        artifact.write_all(&wasm)?;
        artifact.flush()?;

        info!(
            "Deploying project {project_id} ({} bytes) to {network}",
            wasm.len()
        );
        logs.push(LogEntry::info(format!(
            "Uploading {} bytes of wasm to {network}...",
            wasm.len()
        )));

        let output = self
            .run_cli([
                OsStr::new("contract"),
                OsStr::new("deploy"),
                OsStr::new("--wasm"),
                artifact.path().as_os_str(),
                OsStr::new("--source-account"),
                OsStr::new(&self.config.deployer_identity),
                OsStr::new("--rpc-url"),
                OsStr::new(rpc_url),
                OsStr::new("--network-passphrase"),
                OsStr::new(&network_info.passphrase),
            ])
            .await?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            logs.push(if line.starts_with("error") || line.starts_with('❌') {
                LogEntry::error(line)
            } else {
                LogEntry::info(line)
            });
        }

        if !output.status.success() {
            logs.push(LogEntry::error(format!(
                "stellar contract deploy failed ({})",
                output.status
            )));
            return Ok(None);
        }

        match parse_contract_id(&String::from_utf8_lossy(&output.stdout)) {
            Some(contract_id) => {
                logs.push(LogEntry::success(format!("Contract deployed: {contract_id}")));
                Ok(Some((contract_id, wallet)))
            }
            None => {
                logs.push(LogEntry::error("No contract id in deploy output"));
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Deployer for StellarCliDeployer {
    async fn deploy(&self, project_id: &str, wasm_base64: &str, network: Network) -> DeployResult {
        let mut logs = Vec::new();
        match self
            .try_deploy(project_id, wasm_base64, network, &mut logs)
            .await
        {
            Ok(Some((contract_address, wallet_address))) => DeployResult {
                success: true,
                logs,
                contract_address: Some(contract_address),
                network: Some(network),
                wallet_address,
            },
            Ok(None) => DeployResult::failed(logs),
            Err(e) => {
                error!("Deploy of project {project_id} failed: {e}");
                logs.push(LogEntry::error(format!("Deploy service error: {e}")));
                DeployResult::failed(logs)
            }
        }
    }
}

/// Last stdout line that looks like a contract strkey (`C…`, 56 base32 chars).
fn parse_contract_id(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| is_contract_id(line))
        .map(String::from)
}

fn is_contract_id(s: &str) -> bool {
    s.len() == 56
        && s.starts_with('C')
        && s.chars().all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c))
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ide_core::LogLevel;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONTRACT: &str = "CBQHNAXSI55GX2GN6D67GK7BHVPSLJUGZQEU7WJ5LKR5PNUCGLIMAO4K";

    #[test]
    fn contract_id_is_taken_from_last_matching_line() {
        let out = format!("ℹ️ Simulating install\n{CONTRACT}\n");
        assert_eq!(parse_contract_id(&out).as_deref(), Some(CONTRACT));
        assert_eq!(parse_contract_id("GABC\nnot an id"), None);
    }

    #[test]
    fn wasm_hash_is_hex_sha256() {
        let hash = wasm_hash(&STANDARD.encode(b"\0asm")).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(wasm_hash("***").is_none());
    }

    #[tokio::test]
    async fn invalid_artifact_fails_without_network() {
        let tmp = tempfile::tempdir().unwrap();
        let deployer =
            StellarCliDeployer::new(&Config::for_tests("http://127.0.0.1:9", tmp.path()), Client::new());

        let result = deployer.deploy("p1", "not base64!", Network::Testnet).await;
        assert!(!result.success);
        assert!(result.contract_address.is_none());
        assert_eq!(result.logs.len(), 1);
        assert!(result.logs[0].message.contains("not valid base64"));
    }

    #[tokio::test]
    async fn unreachable_network_fails_deploy() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let deployer = StellarCliDeployer::new(&Config::for_tests(&server.uri(), tmp.path()), Client::new());

        let result = deployer
            .deploy("p1", &STANDARD.encode(b"\0asm"), Network::Testnet)
            .await;
        assert!(!result.success);
        let last = result.logs.last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert!(last.message.starts_with("Network unavailable"));
    }

    #[tokio::test]
    async fn missing_cli_is_reported_in_logs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "passphrase": "Test SDF Network ; September 2015" }
            })))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let deployer = StellarCliDeployer::new(&Config::for_tests(&server.uri(), tmp.path()), Client::new());

        let result = deployer
            .deploy("p1", &STANDARD.encode(b"\0asm"), Network::Testnet)
            .await;
        assert!(!result.success);
        assert!(result.wallet_address.is_none());
        assert!(result
            .logs
            .last()
            .unwrap()
            .message
            .starts_with("Deploy service error"));
    }
}
