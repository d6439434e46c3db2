//! Per-session IDE state: the open project, the active file, run logs and
//! pending notifications.
//!
//! The active file is tracked by name and resolved against the open project
//! on every read, so it can never point at a file the project no longer has.

use ide_core::{LogEntry, LogLevel, Project, ProjectFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Loading,
    Idle,
    Compiling,
    Deploying,
}

/// A transient, toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug)]
pub struct Session {
    pub(crate) state: WorkflowState,
    pub(crate) project: Option<Project>,
    pub(crate) active_file: Option<String>,
    pub(crate) logs: Vec<LogEntry>,
    pub(crate) notifications: Vec<Notification>,
    pub(crate) load_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: WorkflowState::Loading,
            project: None,
            active_file: None,
            logs: Vec::new(),
            notifications: Vec::new(),
            load_error: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn active_file(&self) -> Option<&ProjectFile> {
        let name = self.active_file.as_deref()?;
        self.project.as_ref()?.file(name)
    }

    pub fn active_file_name(&self) -> Option<&str> {
        self.active_file().map(|f| f.name.as_str())
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Drain notifications once they have been shown.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Set when the initial load failed; the workspace should not render.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.state != WorkflowState::Loading && self.project.is_some()
    }

    // ─────────────────────────────────────────────────────
    // Mutations used by the controller
    // ─────────────────────────────────────────────────────

    /// Open `project` with its first file active.
    pub(crate) fn open_project(&mut self, project: Project) {
        self.active_file = project.files.first().map(|f| f.name.clone());
        self.project = Some(project);
    }

    /// Replace the open project with a newer version of it. The active file
    /// is kept when it still exists, otherwise the first file (if any) takes over.
    pub(crate) fn replace_project(&mut self, project: Project) {
        let keep = self
            .active_file
            .as_deref()
            .is_some_and(|name| project.has_file(name));
        if !keep {
            self.active_file = project.files.first().map(|f| f.name.clone());
        }
        self.project = Some(project);
    }

    /// Returns `false` when the open project has no such file.
    pub(crate) fn activate(&mut self, name: &str) -> bool {
        match &self.project {
            Some(project) if project.has_file(name) => {
                self.active_file = Some(name.to_string());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn restart_logs(&mut self, first: LogEntry) {
        self.logs.clear();
        self.logs.push(first);
    }

    pub(crate) fn log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    pub(crate) fn notify(&mut self, level: LogLevel, message: impl Into<String>) {
        self.notifications.push(Notification {
            level,
            message: message.into(),
        });
    }
}
