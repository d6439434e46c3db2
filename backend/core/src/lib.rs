//! Data model shared by the Soroban IDE backend and its workflow controller.

pub mod models;
pub mod network;
pub mod scaffold;

pub use models::{
    duplicate_file_name, is_valid_file_name, CompileRequest, CompileResult, CreateProjectRequest,
    DeployRequest, DeployResult, DeploymentRecord, FileKind, LogEntry, LogLevel, Project,
    ProjectFile, UpdateProjectRequest,
};
pub use network::Network;
