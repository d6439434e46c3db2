//! Project, file and run-result types shared by the API layer and the
//! workflow controller.
//!
//! Field names follow the JSON contract consumed by the browser IDE
//! (`camelCase`, project identifier serialised as `_id`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::network::Network;

// ─────────────────────────────────────────────────────────
// Files
// ─────────────────────────────────────────────────────────

/// Language tag of a project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Rust,
    Toml,
    Markdown,
    Json,
    #[serde(other)]
    Text,
}

impl FileKind {
    /// Infer the kind from a file name's extension.
    pub fn from_name(name: &str) -> Self {
        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("rs") => Self::Rust,
            Some("toml") => Self::Toml,
            Some("md") => Self::Markdown,
            Some("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// A named unit of editable source text. Names are unique within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    #[serde(default)]
    pub content: String,
}

impl ProjectFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: FileKind::from_name(&name),
            name,
            content: content.into(),
        }
    }
}

/// A file name must be a single plain path component.
pub fn is_valid_file_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Return the first file name that appears more than once, if any.
pub fn duplicate_file_name(files: &[ProjectFile]) -> Option<&str> {
    files.iter().enumerate().find_map(|(i, f)| {
        files[..i]
            .iter()
            .any(|earlier| earlier.name == f.name)
            .then_some(f.name.as_str())
    })
}

// ─────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────

/// One past deployment of a project's contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub contract_address: String,
    pub network: Network,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Hex sha-256 of the deployed wasm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wasm_hash: Option<String>,
    pub deployed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub files: Vec<ProjectFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deployed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deployment_history: Vec<DeploymentRecord>,
    /// Incremented on every effective write; clients echo it back to
    /// detect concurrent modification.
    #[serde(default)]
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn file(&self, name: &str) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.file(name).is_some()
    }

    /// Copy of this project with the file sharing `file.name` replaced.
    /// Files are matched by name, never by position.
    pub fn with_file_replaced(&self, file: ProjectFile) -> Project {
        let files = self
            .files
            .iter()
            .map(|f| if f.name == file.name { file.clone() } else { f.clone() })
            .collect();
        Project {
            files,
            ..self.clone()
        }
    }

    pub fn with_file_added(&self, file: ProjectFile) -> Project {
        let mut files = self.files.clone();
        files.push(file);
        Project {
            files,
            ..self.clone()
        }
    }

    pub fn with_file_removed(&self, name: &str) -> Project {
        Project {
            files: self.files.iter().filter(|f| f.name != name).cloned().collect(),
            ..self.clone()
        }
    }

    /// Copy of this project pointing at a freshly deployed contract.
    pub fn with_deployment(&self, contract_address: &str, at: DateTime<Utc>) -> Project {
        Project {
            contract_address: Some(contract_address.to_string()),
            last_deployed: Some(at),
            ..self.clone()
        }
    }
}

// ─────────────────────────────────────────────────────────
// Logs and run results
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

/// A timestamped message describing one step of a compile or deploy run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub success: bool,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wasm_base64: Option<String>,
}

impl CompileResult {
    pub fn failed(logs: Vec<LogEntry>) -> Self {
        Self {
            success: false,
            logs,
            wasm_base64: None,
        }
    }

    /// Approximate decoded artifact size in bytes (base64 carries 3 bytes per 4 chars).
    pub fn wasm_size_estimate(&self) -> Option<u64> {
        self.wasm_base64
            .as_ref()
            .map(|b64| (b64.len() as f64 * 0.75).round() as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub success: bool,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

impl DeployResult {
    pub fn failed(logs: Vec<LogEntry>) -> Self {
        Self {
            success: false,
            logs,
            contract_address: None,
            network: None,
            wallet_address: None,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Request bodies
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    /// Starter template id; the default scaffold when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Partial replacement of a project's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<ProjectFile>>,
    /// Expected current revision; the write is rejected when it differs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
}

impl UpdateProjectRequest {
    pub fn files(files: Vec<ProjectFile>) -> Self {
        Self {
            files: Some(files),
            ..Default::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn at_revision(mut self, revision: i64) -> Self {
        self.revision = Some(revision);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    pub project_id: String,
    #[serde(default)]
    pub files: Vec<ProjectFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub project_id: String,
    pub wasm_base64: String,
    #[serde(default)]
    pub network: Network,
}
