//! Soroban RPC client — network metadata and health probes.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the RPC returns an error or rate-limit
//!   response, up to [`MAX_BACKOFF_SECS`] seconds between attempts.
//! * Unlike a long-running poller, every call gives up after `max_attempts`
//!   so a request handler never blocks forever.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{IdeError, Result};

const MAX_BACKOFF_SECS: u64 = 30;
const INITIAL_BACKOFF_SECS: u64 = 1;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub passphrase: String,
    pub protocol_version: Option<u32>,
    pub friendbot_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestLedger {
    pub id: Option<String>,
    pub sequence: u64,
    pub protocol_version: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInfo {
    pub status: String,
    pub latest_ledger: Option<u64>,
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

/// `getNetwork`: passphrase and protocol version of the RPC's network.
pub async fn get_network(client: &Client, rpc_url: &str, max_attempts: u32) -> Result<NetworkInfo> {
    call(client, rpc_url, "getNetwork", Value::Null, max_attempts).await
}

/// `getLatestLedger`: most recent ledger known to the RPC.
pub async fn get_latest_ledger(
    client: &Client,
    rpc_url: &str,
    max_attempts: u32,
) -> Result<LatestLedger> {
    call(client, rpc_url, "getLatestLedger", Value::Null, max_attempts).await
}

/// `getHealth`: `status` is `"healthy"` when the node is in sync.
pub async fn get_health(client: &Client, rpc_url: &str, max_attempts: u32) -> Result<HealthInfo> {
    call(client, rpc_url, "getHealth", Value::Null, max_attempts).await
}

/// Issue a single JSON-RPC call, retrying transient failures.
///
/// Codes `-32600` (invalid request) and `-32601` (method not found) are
/// treated as permanent and returned immediately.
pub async fn call<T: DeserializeOwned>(
    client: &Client,
    rpc_url: &str,
    method: &str,
    params: Value,
    max_attempts: u32,
) -> Result<T> {
    let max_attempts = max_attempts.max(1);
    let mut backoff = INITIAL_BACKOFF_SECS;
    let mut attempt = 0;

    let mut body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
    });
    if !params.is_null() {
        body["params"] = params;
    }

    loop {
        attempt += 1;
        let failure = match client.post(rpc_url).json(&body).send().await {
            Err(e) => format!("request failed: {e}"),
            Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                "rate-limited".to_string()
            }
            Ok(resp) if !resp.status().is_success() => format!("HTTP {}", resp.status()),
            Ok(resp) => {
                let parsed: RpcResponse<T> = resp.json().await?;

                if let Some(err) = parsed.error {
                    if err.code == -32600 || err.code == -32601 {
                        return Err(IdeError::Rpc(format!(
                            "{method} hard error {}: {}",
                            err.code, err.message
                        )));
                    }
                    format!("soft error {} {}", err.code, err.message)
                } else {
                    let result = parsed.result.ok_or_else(|| {
                        IdeError::Rpc(format!("Empty result from {method}"))
                    })?;
                    debug!("{method} succeeded on attempt {attempt}");
                    return Ok(result);
                }
            }
        };

        if attempt >= max_attempts {
            return Err(IdeError::Rpc(format!(
                "{method} failed after {attempt} attempt(s): {failure}"
            )));
        }

        warn!("RPC {method} {failure} (will retry in {backoff}s)");
        tokio::time::sleep(Duration::from_secs(backoff)).await;
        backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_network_parses_passphrase() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "getNetwork" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "passphrase": "Test SDF Network ; September 2015",
                    "protocolVersion": 22,
                    "friendbotUrl": "https://friendbot.stellar.org/"
                }
            })))
            .mount(&server)
            .await;

        let info = get_network(&Client::new(), &server.uri(), 1).await.unwrap();
        assert_eq!(info.passphrase, "Test SDF Network ; September 2015");
        assert_eq!(info.protocol_version, Some(22));
    }

    #[tokio::test]
    async fn hard_rpc_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32601, "message": "method not found" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = get_latest_ledger(&Client::new(), &server.uri(), 5)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("hard error -32601"));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = get_health(&Client::new(), &server.uri(), 1).await.unwrap_err();
        assert!(matches!(err, IdeError::Rpc(_)));
        assert!(err.to_string().contains("after 1 attempt"));
    }
}
