//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use ide_core::scaffold::{self, Template};
use ide_core::{
    duplicate_file_name, is_valid_file_name, CompileRequest, CompileResult, CreateProjectRequest,
    DeployRequest, DeployResult, DeploymentRecord, Network, Project, UpdateProjectRequest,
};

use crate::deployer::wasm_hash;
use crate::errors::{IdeError, Result};
use crate::{db, rpc, AppState};

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub network: Network,
    pub rpc_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_ledger: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NetworkQuery {
    #[serde(default)]
    pub network: Network,
}

/// `Json` body extractor whose rejections answer with an `{error}` body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = IdeError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /api/projects`
pub async fn list_projects(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Project>>> {
    Ok(Json(db::list_projects(&state.pool).await?))
}

/// `POST /api/projects`
///
/// New projects start with the default scaffold file, or with the files of
/// the requested template.
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(IdeError::Validation("Project name must not be empty".into()));
    }

    let files = match req.template.as_deref() {
        None => scaffold::default_files(),
        Some(id) => {
            scaffold::template(id)
                .ok_or_else(|| IdeError::Validation(format!("Unknown template: {id}")))?
                .files
        }
    };

    let project = db::insert_project(&state.pool, name, &files).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// `GET /api/projects/:id`
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    db::get_project(&state.pool, &id)
        .await?
        .map(Json)
        .ok_or(IdeError::NotFound(id))
}

/// `PATCH /api/projects/:id` and `PUT /api/projects/:id`
///
/// Replaces only the fields present in the body.
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> Result<Json<Project>> {
    validate_update(&req)?;
    Ok(Json(db::update_project(&state.pool, &id, &req).await?))
}

/// `DELETE /api/projects/:id`
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    if db::delete_project(&state.pool, &id).await? {
        info!("Deleted project {id}");
        Ok(Json(json!({ "id": id, "deleted": true })))
    } else {
        Err(IdeError::NotFound(id))
    }
}

/// `POST /api/compile`
///
/// Always answers `200`; build failures are described by the result itself.
pub async fn compile(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CompileRequest>,
) -> Json<CompileResult> {
    info!(
        "Compile requested for project {} ({} files)",
        req.project_id,
        req.files.len()
    );
    Json(state.compiler.compile(&req.project_id, &req.files).await)
}

/// `POST /api/deploy`
///
/// On success the project is pointed at the new contract. That write is not
/// atomic with the deployment: if it fails the deploy result is still returned.
pub async fn deploy(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<DeployRequest>,
) -> Json<DeployResult> {
    info!(
        "Deploy requested for project {} on {}",
        req.project_id, req.network
    );
    let result = state
        .deployer
        .deploy(&req.project_id, &req.wasm_base64, req.network)
        .await;

    if let (true, Some(address)) = (result.success, result.contract_address.as_ref()) {
        let record = DeploymentRecord {
            contract_address: address.clone(),
            network: req.network,
            wallet_address: result.wallet_address.clone(),
            wasm_hash: wasm_hash(&req.wasm_base64),
            deployed_at: Utc::now(),
        };
        if let Err(e) = db::record_deployment(&state.pool, &req.project_id, &record).await {
            warn!(
                "Deployed {address} but could not update project {}: {e}",
                req.project_id
            );
        }
    }

    Json(result)
}

/// `GET /api/templates`
pub async fn list_templates() -> Json<Vec<Template>> {
    Json(scaffold::templates())
}

/// `GET /api/network/status?network=testnet`
pub async fn network_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NetworkQuery>,
) -> Json<NetworkStatus> {
    let network = query.network;
    let rpc_url = state.config.rpc_url_for(network).to_string();

    let status = match rpc::get_health(&state.client, &rpc_url, 1).await {
        Ok(health) => {
            let passphrase = rpc::get_network(&state.client, &rpc_url, 1)
                .await
                .ok()
                .map(|info| info.passphrase);
            // Older RPC nodes omit the ledger from getHealth.
            let latest_ledger = match health.latest_ledger {
                Some(sequence) => Some(sequence),
                None => rpc::get_latest_ledger(&state.client, &rpc_url, 1)
                    .await
                    .ok()
                    .map(|ledger| ledger.sequence),
            };
            NetworkStatus {
                network,
                rpc_url,
                passphrase,
                healthy: health.status == "healthy",
                latest_ledger,
                error: None,
            }
        }
        Err(e) => NetworkStatus {
            network,
            rpc_url,
            passphrase: None,
            healthy: false,
            latest_ledger: None,
            error: Some(e.to_string()),
        },
    };
    Json(status)
}

// ─────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────

fn validate_update(req: &UpdateProjectRequest) -> Result<()> {
    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(IdeError::Validation("Project name must not be empty".into()));
        }
    }
    if let Some(files) = &req.files {
        if let Some(bad) = files.iter().find(|f| !is_valid_file_name(&f.name)) {
            return Err(IdeError::Validation(format!("Invalid file name: {:?}", bad.name)));
        }
        if let Some(dup) = duplicate_file_name(files) {
            return Err(IdeError::Validation(format!("Duplicate file name: {dup}")));
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
