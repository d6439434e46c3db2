//! Sequencing of the IDE's user actions against the API.
//!
//! Every action catches its own failures: a failed call becomes a log entry
//! and/or a notification on the [`Session`], and the session always ends the
//! action in a stable state. Nothing is retried.

use std::future::Future;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ide_core::{
    is_valid_file_name, scaffold, LogEntry, LogLevel, Project, ProjectFile, UpdateProjectRequest,
};

use crate::client::IdeApi;
use crate::config::WorkflowConfig;
use crate::errors::{Result, WorkflowError};
use crate::session::{Session, WorkflowState};

/// How a deploy action ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Another run was in progress or no project is open.
    NotStarted,
    /// The pre-deploy compile failed; the deploy service was not called.
    CompileFailed,
    /// The deploy service call failed or reported failure.
    Failed,
    /// Deployed, and the project was re-read from the store.
    Refreshed(Project),
    /// Deployed, but the stored project could not be read or does not show
    /// the new contract yet, so the open copy was patched in place.
    LocallyPatched(Project),
}

impl DeployOutcome {
    pub fn is_deployed(&self) -> bool {
        matches!(self, Self::Refreshed(_) | Self::LocallyPatched(_))
    }

    pub fn project(&self) -> Option<&Project> {
        match self {
            Self::Refreshed(p) | Self::LocallyPatched(p) => Some(p),
            _ => None,
        }
    }
}

pub struct Controller<A> {
    api: A,
    config: WorkflowConfig,
}

impl<A: IdeApi> Controller<A> {
    pub fn new(api: A, config: WorkflowConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// A project read or write, bounded by the request timeout.
    async fn request<T>(&self, what: &'static str, call: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = self.config.request_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(res) => res,
            Err(_) => Err(WorkflowError::Timeout(what, limit.as_secs())),
        }
    }

    /// A compile or deploy service call, bounded by `limit` and abandoned as
    /// soon as `cancel` fires.
    async fn run<T>(
        &self,
        what: &'static str,
        limit: Duration,
        cancel: &CancellationToken,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WorkflowError::Cancelled(what)),
            res = tokio::time::timeout(limit, call) => match res {
                Ok(res) => res,
                Err(_) => Err(WorkflowError::Timeout(what, limit.as_secs())),
            },
        }
    }

    // ─────────────────────────────────────────────────────
    // Projects
    // ─────────────────────────────────────────────────────

    /// Open the first stored project, creating a default one when the store
    /// is empty. On failure the session stays without a project and
    /// [`Session::load_error`] is set.
    pub async fn load(&self, session: &mut Session) -> bool {
        session.state = WorkflowState::Loading;
        session.load_error = None;

        let loaded = match self.request("Loading projects", self.api.list_projects()).await {
            Ok(projects) => match projects.into_iter().next() {
                Some(project) => Ok(project),
                None => {
                    info!("No projects stored, creating \"{}\"", self.config.default_project_name);
                    self.request(
                        "Creating project",
                        self.api.create_project(&self.config.default_project_name, None),
                    )
                    .await
                }
            },
            Err(e) => Err(e),
        };

        let ok = match loaded {
            Ok(project) => {
                session.open_project(project);
                true
            }
            Err(e) => {
                warn!("Failed to load initial project: {e}");
                session.load_error = Some(e.to_string());
                session.notify(LogLevel::Error, "Failed to load project");
                false
            }
        };
        session.state = WorkflowState::Idle;
        ok
    }

    pub async fn create_project(
        &self,
        session: &mut Session,
        name: &str,
        template: Option<&str>,
    ) -> bool {
        match self
            .request("Creating project", self.api.create_project(name, template))
            .await
        {
            Ok(project) => {
                session.notify(LogLevel::Success, format!("Project \"{}\" created!", project.name));
                session.open_project(project);
                true
            }
            Err(e) => {
                warn!("Failed to create project: {e}");
                session.notify(LogLevel::Error, "Failed to create project");
                false
            }
        }
    }

    pub fn select_project(&self, session: &mut Session, project: Project) {
        session.open_project(project);
    }

    /// Re-read the open project, dropping any unsaved local divergence.
    pub async fn refresh_project(&self, session: &mut Session) -> bool {
        let Some(id) = session.project.as_ref().map(|p| p.id.clone()) else {
            return false;
        };
        match self.request("Refreshing project", self.api.get_project(&id)).await {
            Ok(project) => {
                session.replace_project(project);
                true
            }
            Err(e) => {
                warn!("Failed to refresh project {id}: {e}");
                session.notify(LogLevel::Error, "Failed to refresh project");
                false
            }
        }
    }

    pub async fn rename_project(&self, session: &mut Session, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            session.notify(LogLevel::Error, "Project name cannot be empty");
            return false;
        }
        let Some(project) = session.project.as_mut() else {
            return false;
        };
        project.name = name.to_string();
        self.persist(
            session,
            UpdateProjectRequest::name(name),
            "Failed to update project name",
        )
        .await
    }

    /// Persist the whole file collection as it is in memory.
    pub async fn save_project(&self, session: &mut Session) -> bool {
        let Some(files) = session.project.as_ref().map(|p| p.files.clone()) else {
            return false;
        };
        let saved = self
            .persist(session, UpdateProjectRequest::files(files), "Failed to save project")
            .await;
        if saved {
            session.notify(LogLevel::Success, "Project saved successfully!");
        }
        saved
    }

    /// Send `update` at the open project's revision and adopt the stored
    /// result. The in-memory project is left as is when the write fails.
    async fn persist(
        &self,
        session: &mut Session,
        update: UpdateProjectRequest,
        failure: &str,
    ) -> bool {
        let Some((id, revision)) = session.project.as_ref().map(|p| (p.id.clone(), p.revision))
        else {
            return false;
        };
        let update = update.at_revision(revision);

        match self
            .request("Saving project", self.api.update_project(&id, &update))
            .await
        {
            Ok(saved) => {
                session.replace_project(saved);
                true
            }
            Err(WorkflowError::Conflict(msg)) => {
                warn!("Save of project {id} rejected: {msg}");
                session.notify(
                    LogLevel::Error,
                    format!("{failure}: project was modified elsewhere, refresh to continue"),
                );
                false
            }
            Err(e) => {
                warn!("Save of project {id} failed: {e}");
                session.notify(LogLevel::Error, failure);
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────

    pub fn select_file(&self, session: &mut Session, name: &str) -> bool {
        session.activate(name)
    }

    /// Replace the active file's content and persist the file collection.
    pub async fn edit_active_file(&self, session: &mut Session, content: &str) -> bool {
        let Some(file) = session.active_file().cloned() else {
            return false;
        };
        let Some(project) = session.project.as_ref() else {
            return false;
        };
        let edited = project.with_file_replaced(ProjectFile {
            content: content.to_string(),
            ..file
        });
        let files = edited.files.clone();
        session.project = Some(edited);

        self.persist(session, UpdateProjectRequest::files(files), "Failed to save file")
            .await
    }

    /// Add a file seeded with the default contract and make it active. An
    /// absent or blank name gets a `contract_<millis>.rs` default.
    pub async fn new_file(&self, session: &mut Session, name: Option<&str>) -> bool {
        let Some(project) = session.project.as_ref() else {
            return false;
        };

        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => {
                let mut at = Utc::now();
                let mut name = scaffold::default_file_name(at);
                while project.has_file(&name) {
                    at += ChronoDuration::milliseconds(1);
                    name = scaffold::default_file_name(at);
                }
                name
            }
        };
        if !is_valid_file_name(&name) {
            session.notify(LogLevel::Error, format!("Invalid file name \"{name}\""));
            return false;
        }
        if project.has_file(&name) {
            session.notify(LogLevel::Error, format!("File \"{name}\" already exists"));
            return false;
        }

        let added = project.with_file_added(ProjectFile::new(
            name.as_str(),
            scaffold::default_contract_source(),
        ));
        let files = added.files.clone();
        session.project = Some(added);
        session.activate(&name);

        let saved = self
            .persist(session, UpdateProjectRequest::files(files), "Failed to create new file")
            .await;
        if saved {
            session.notify(LogLevel::Success, format!("New file \"{name}\" created!"));
        }
        saved
    }

    /// Remove a file. Removing the active file activates the first remaining
    /// one; removing the last file leaves the project empty with no active file.
    pub async fn delete_file(&self, session: &mut Session, name: &str) -> bool {
        let Some(project) = session.project.as_ref().filter(|p| p.has_file(name)) else {
            return false;
        };
        let remaining = project.with_file_removed(name);
        let files = remaining.files.clone();
        session.replace_project(remaining);

        let saved = self
            .persist(session, UpdateProjectRequest::files(files), "Failed to delete file")
            .await;
        if saved {
            session.notify(LogLevel::Success, format!("File \"{name}\" deleted successfully!"));
        }
        saved
    }

    // ─────────────────────────────────────────────────────
    // Runs
    // ─────────────────────────────────────────────────────

    pub fn clear_logs(&self, session: &mut Session) {
        session.logs.clear();
    }

    /// Compile the in-memory file set. Only starts from `Idle`; always ends
    /// in `Idle`. Returns whether the build succeeded.
    pub async fn compile(&self, session: &mut Session, cancel: &CancellationToken) -> bool {
        if session.state != WorkflowState::Idle {
            return false;
        }
        let Some((id, files)) = session.project.as_ref().map(|p| (p.id.clone(), p.files.clone()))
        else {
            return false;
        };

        session.state = WorkflowState::Compiling;
        session.restart_logs(LogEntry::info("Starting compilation..."));

        let compiled = self
            .run(
                "Compilation",
                self.config.compile_timeout,
                cancel,
                self.api.compile(&id, &files),
            )
            .await;

        let ok = match compiled {
            Ok(result) => {
                session.logs.extend(result.logs.iter().cloned());
                if result.success {
                    session.log(LogEntry::success("Compilation successful! WASM file generated."));
                    if let Some(size) = result.wasm_size_estimate() {
                        session.log(LogEntry::info(format!("WASM file size: ~{size} bytes")));
                    }
                    session.notify(LogLevel::Success, "Compilation successful!");
                } else {
                    session.log(LogEntry::error("Compilation failed"));
                    session.notify(LogLevel::Error, "Compilation failed");
                }
                result.success
            }
            Err(e) => {
                warn!("Compile of project {id} failed: {e}");
                session.log(LogEntry::error(format!("Compilation failed: {e}")));
                session.notify(LogLevel::Error, "Compilation failed");
                false
            }
        };

        session.state = WorkflowState::Idle;
        ok
    }

    /// Recompile, then deploy the fresh artifact to the configured network.
    /// Only starts from `Idle`; always ends in `Idle`.
    pub async fn deploy(&self, session: &mut Session, cancel: &CancellationToken) -> DeployOutcome {
        if session.state != WorkflowState::Idle || session.project.is_none() {
            return DeployOutcome::NotStarted;
        }
        session.state = WorkflowState::Deploying;
        session.restart_logs(LogEntry::info("Starting deployment process..."));

        let outcome = self.compile_and_deploy(session, cancel).await;

        session.state = WorkflowState::Idle;
        outcome
    }

    async fn compile_and_deploy(
        &self,
        session: &mut Session,
        cancel: &CancellationToken,
    ) -> DeployOutcome {
        let Some((id, files)) = session.project.as_ref().map(|p| (p.id.clone(), p.files.clone()))
        else {
            return DeployOutcome::NotStarted;
        };
        let network = self.config.network;

        let compiled = self
            .run(
                "Compilation",
                self.config.compile_timeout,
                cancel,
                self.api.compile(&id, &files),
            )
            .await;
        let wasm = match compiled {
            Ok(result) => {
                session.logs.extend(result.logs.iter().cloned());
                match result.wasm_base64 {
                    Some(wasm) if result.success => wasm,
                    _ => {
                        session.log(LogEntry::error("Compilation failed, cannot deploy"));
                        session.notify(LogLevel::Error, "Compilation failed, cannot deploy");
                        return DeployOutcome::CompileFailed;
                    }
                }
            }
            Err(e) => {
                warn!("Pre-deploy compile of project {id} failed: {e}");
                session.log(LogEntry::error(format!("Compilation failed: {e}")));
                session.log(LogEntry::error("Compilation failed, cannot deploy"));
                session.notify(LogLevel::Error, "Compilation failed, cannot deploy");
                return DeployOutcome::CompileFailed;
            }
        };
        session.log(LogEntry::success("Compilation successful! WASM generated."));
        session.log(LogEntry::info(format!("Deploying to Stellar {network}...")));

        let deployed = self
            .run(
                "Deployment",
                self.config.deploy_timeout,
                cancel,
                self.api.deploy(&id, &wasm, network),
            )
            .await;
        let result = match deployed {
            Ok(result) => result,
            Err(e) => {
                warn!("Deploy of project {id} failed: {e}");
                session.log(LogEntry::error(format!("Deployment failed: {e}")));
                session.notify(LogLevel::Error, "Deployment failed");
                return DeployOutcome::Failed;
            }
        };
        session.logs.extend(result.logs.iter().cloned());

        let contract = match result.contract_address {
            Some(address) if result.success => address,
            _ => {
                session.log(LogEntry::error("Deployment failed"));
                session.notify(LogLevel::Error, "Deployment failed");
                return DeployOutcome::Failed;
            }
        };

        let outcome = match self.request("Refreshing project", self.api.get_project(&id)).await {
            Ok(project) if project.contract_address.as_deref() == Some(contract.as_str()) => {
                session.replace_project(project.clone());
                DeployOutcome::Refreshed(project)
            }
            Ok(project) => {
                warn!("Stored project {id} does not point at {contract}, patching locally");
                let patched = project.with_deployment(&contract, Utc::now());
                session.replace_project(patched.clone());
                DeployOutcome::LocallyPatched(patched)
            }
            Err(e) => {
                warn!("Deployed project {id} could not be re-read, patching locally: {e}");
                let Some(open) = session.project.as_ref() else {
                    return DeployOutcome::Failed;
                };
                let patched = open.with_deployment(&contract, Utc::now());
                session.replace_project(patched.clone());
                DeployOutcome::LocallyPatched(patched)
            }
        };

        session.log(LogEntry::success(format!(
            "Deployment successful! Contract deployed at: {contract}"
        )));
        let deployed_to = result.network.unwrap_or(network);
        if let Some(n) = result.network {
            session.log(LogEntry::info(format!("Network: {n}")));
        }
        if let Some(wallet) = &result.wallet_address {
            session.log(LogEntry::info(format!("Deployed by: {wallet}")));
        }
        if let Some(url) = deployed_to.explorer_url(&contract) {
            session.log(LogEntry::info(format!("View on Stellar Expert: {url}")));
        }
        session.notify(
            LogLevel::Success,
            format!("Deployment successful! Contract: {contract}"),
        );
        info!("Project {id} deployed to {deployed_to} as {contract}");

        outcome
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
