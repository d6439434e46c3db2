//! Builds a project's files into a Soroban wasm artifact.
//!
//! Each build gets its own throwaway crate under `build_root`, while the
//! target directory is shared so dependencies (`soroban-sdk` and friends) are
//! only compiled once. Crate names are unique per build, so concurrent builds
//! never read each other's artifacts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::process::Command;
use tracing::{error, info};
use uuid::Uuid;

use ide_core::{is_valid_file_name, CompileResult, FileKind, LogEntry, ProjectFile};

use crate::config::Config;
use crate::errors::Result;

const WASM_TARGET: &str = "wasm32-unknown-unknown";

#[async_trait]
pub trait Compiler: Send + Sync {
    /// Build `files`. Failures are reported in the result, never as an error.
    async fn compile(&self, project_id: &str, files: &[ProjectFile]) -> CompileResult;
}

pub struct CargoCompiler {
    cargo_bin: String,
    build_root: PathBuf,
    soroban_sdk_version: String,
    timeout: Duration,
}

impl CargoCompiler {
    pub fn new(
        cargo_bin: impl Into<String>,
        build_root: impl Into<PathBuf>,
        soroban_sdk_version: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            cargo_bin: cargo_bin.into(),
            build_root: build_root.into(),
            soroban_sdk_version: soroban_sdk_version.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.cargo_bin,
            &config.build_root,
            &config.soroban_sdk_version,
            config.compile_timeout(),
        )
    }

    /// Returns the base64 artifact, or `None` when the build failed and the
    /// reason has been logged.
    async fn build(
        &self,
        project_id: &str,
        files: &[ProjectFile],
        logs: &mut Vec<LogEntry>,
    ) -> Result<Option<String>> {
        if files.is_empty() {
            logs.push(LogEntry::error("No source files to compile"));
            return Ok(None);
        }
        if let Some(bad) = files.iter().find(|f| !is_valid_file_name(&f.name)) {
            logs.push(LogEntry::error(format!("Invalid file name: {:?}", bad.name)));
            return Ok(None);
        }
        if !files.iter().any(|f| f.kind == FileKind::Rust || f.name.ends_with(".rs")) {
            logs.push(LogEntry::error("No Rust source file (.rs) in project"));
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.build_root).await?;
        let workspace = tempfile::Builder::new()
            .prefix("build-")
            .tempdir_in(&self.build_root)?;
        let crate_name = format!("ide_{}", &Uuid::new_v4().simple().to_string()[..12]);

        write_crate(
            workspace.path(),
            &crate_name,
            &self.soroban_sdk_version,
            files,
            logs,
        )
        .await?;

        info!("Compiling project {project_id} as {crate_name}");
        logs.push(LogEntry::info(format!(
            "Building {} file(s) for {WASM_TARGET}...",
            files.len()
        )));

        let target_dir = self.build_root.join("target");
        let mut cmd = Command::new(&self.cargo_bin);
        cmd.args(["build", "--release", "--target", WASM_TARGET, "--color", "never"])
            .current_dir(workspace.path())
            .env("CARGO_TARGET_DIR", &target_dir)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(output) => output?,
            Err(_) => {
                logs.push(LogEntry::error(format!(
                    "Compilation timed out after {}s",
                    self.timeout.as_secs()
                )));
                return Ok(None);
            }
        };

        logs.extend(
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .filter_map(diagnostic_entry),
        );

        if !output.status.success() {
            logs.push(LogEntry::error(format!("cargo build failed ({})", output.status)));
            return Ok(None);
        }

        let wasm_path = target_dir
            .join(WASM_TARGET)
            .join("release")
            .join(format!("{crate_name}.wasm"));
        let wasm = tokio::fs::read(&wasm_path).await?;
        // Artifacts are returned inline; keep the shared target dir from growing.
        let _ = tokio::fs::remove_file(&wasm_path).await;

        logs.push(LogEntry::info(format!("Produced {} bytes of wasm", wasm.len())));
        Ok(Some(STANDARD.encode(wasm)))
    }
}

#[async_trait]
impl Compiler for CargoCompiler {
    async fn compile(&self, project_id: &str, files: &[ProjectFile]) -> CompileResult {
        let mut logs = Vec::new();
        match self.build(project_id, files, &mut logs).await {
            Ok(Some(wasm)) => CompileResult {
                success: true,
                logs,
                wasm_base64: Some(wasm),
            },
            Ok(None) => CompileResult::failed(logs),
            Err(e) => {
                error!("Compile of project {project_id} failed: {e}");
                logs.push(LogEntry::error(format!("Build service error: {e}")));
                CompileResult::failed(logs)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────
// Crate layout
// ─────────────────────────────────────────────────────────

fn manifest(crate_name: &str, soroban_sdk_version: &str) -> String {
    format!(
        r#"[package]
name = "{crate_name}"
version = "0.1.0"
edition = "2021"
publish = false

[lib]
crate-type = ["cdylib"]
path = "src/lib.rs"

[dependencies]
soroban-sdk = "{soroban_sdk_version}"

[profile.release]
opt-level = "z"
overflow-checks = true
debug = 0
strip = "symbols"
debug-assertions = false
panic = "abort"
codegen-units = 1
lto = true

[workspace]
"#
    )
}

/// Lay out `files` as a library crate in `dir`.
///
/// `lib.rs` is the crate root when present, otherwise the first `.rs` file
/// takes its place. Other `.rs` files sit next to it in `src/` so `mod`
/// declarations resolve; everything else goes to the crate directory.
async fn write_crate(
    dir: &Path,
    crate_name: &str,
    soroban_sdk_version: &str,
    files: &[ProjectFile],
    logs: &mut Vec<LogEntry>,
) -> Result<()> {
    let src = dir.join("src");
    tokio::fs::create_dir_all(&src).await?;
    tokio::fs::write(dir.join("Cargo.toml"), manifest(crate_name, soroban_sdk_version)).await?;

    let root = files
        .iter()
        .find(|f| f.name == "lib.rs")
        .or_else(|| files.iter().find(|f| f.name.ends_with(".rs")))
        .map(|f| f.name.as_str());

    for file in files {
        let path = if Some(file.name.as_str()) == root {
            src.join("lib.rs")
        } else if file.name == "Cargo.toml" {
            logs.push(LogEntry::info(
                "Ignoring project Cargo.toml; using the generated manifest",
            ));
            continue;
        } else if file.name.ends_with(".rs") {
            src.join(&file.name)
        } else {
            dir.join(&file.name)
        };
        tokio::fs::write(path, &file.content).await?;
    }
    Ok(())
}

/// Turn one line of cargo's stderr into a log entry.
fn diagnostic_entry(line: &str) -> Option<LogEntry> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return None;
    }
    if line.starts_with("error") {
        Some(LogEntry::error(line))
    } else {
        Some(LogEntry::info(line))
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ide_core::{scaffold, LogLevel};

    fn compiler_in(root: &Path, cargo_bin: &str) -> CargoCompiler {
        CargoCompiler::new(cargo_bin, root, "22.0.0", Duration::from_secs(30))
    }

    #[tokio::test]
    async fn empty_file_set_yields_failed_result() {
        let tmp = tempfile::tempdir().unwrap();
        let result = compiler_in(tmp.path(), "cargo").compile("p1", &[]).await;
        assert!(!result.success);
        assert!(result.wasm_base64.is_none());
        assert_eq!(result.logs.len(), 1);
        assert_eq!(result.logs[0].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn path_like_file_names_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let files = vec![ProjectFile::new("../evil.rs", "")];
        let result = compiler_in(tmp.path(), "cargo").compile("p1", &files).await;
        assert!(!result.success);
        assert!(result.logs[0].message.contains("Invalid file name"));
    }

    #[tokio::test]
    async fn missing_toolchain_is_reported_not_raised() {
        let tmp = tempfile::tempdir().unwrap();
        let compiler = compiler_in(tmp.path(), "/nonexistent/cargo-for-tests");
        let result = compiler.compile("p1", &scaffold::default_files()).await;
        assert!(!result.success);
        let last = result.logs.last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert!(last.message.starts_with("Build service error"));
    }

    #[tokio::test]
    async fn crate_layout_uses_lib_rs_as_root() {
        let tmp = tempfile::tempdir().unwrap();
        let files = vec![
            ProjectFile::new("helpers.rs", "pub fn h() {}"),
            ProjectFile::new("lib.rs", "mod helpers;"),
            ProjectFile::new("README.md", "# readme"),
            ProjectFile::new("Cargo.toml", "[package]"),
        ];
        let mut logs = Vec::new();
        write_crate(tmp.path(), "ide_test", "22.0.0", &files, &mut logs)
            .await
            .unwrap();

        let lib = std::fs::read_to_string(tmp.path().join("src/lib.rs")).unwrap();
        assert_eq!(lib, "mod helpers;");
        assert!(tmp.path().join("src/helpers.rs").exists());
        assert!(tmp.path().join("README.md").exists());

        let manifest = std::fs::read_to_string(tmp.path().join("Cargo.toml")).unwrap();
        assert!(manifest.contains(r#"name = "ide_test""#));
        assert!(manifest.contains(r#"soroban-sdk = "22.0.0""#));
        assert_eq!(logs.len(), 1, "user manifest is skipped with a note");
    }

    #[tokio::test]
    async fn first_rust_file_becomes_root_without_lib_rs() {
        let tmp = tempfile::tempdir().unwrap();
        let files = vec![
            ProjectFile::new("contract_1.rs", "// root"),
            ProjectFile::new("util.rs", "// util"),
        ];
        write_crate(tmp.path(), "ide_test", "22.0.0", &files, &mut Vec::new())
            .await
            .unwrap();

        let lib = std::fs::read_to_string(tmp.path().join("src/lib.rs")).unwrap();
        assert_eq!(lib, "// root");
        assert!(!tmp.path().join("src/contract_1.rs").exists());
        assert!(tmp.path().join("src/util.rs").exists());
    }

    #[test]
    fn cargo_error_lines_are_error_level() {
        let err = diagnostic_entry("error[E0425]: cannot find value `x`").unwrap();
        assert_eq!(err.level, LogLevel::Error);
        let info = diagnostic_entry("   Compiling soroban-sdk v22.0.0").unwrap();
        assert_eq!(info.level, LogLevel::Info);
        assert!(diagnostic_entry("   ").is_none());
    }
}
