//! Default file content and starter templates for new projects.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::ProjectFile;

/// Name of the file synthesised for every new project.
pub const DEFAULT_FILE_NAME: &str = "lib.rs";

const HELLO_WORLD_SOURCE: &str = include_str!("../../../contracts/hello_world/src/lib.rs");
const COUNTER_SOURCE: &str = include_str!("../../../contracts/counter/src/lib.rs");

/// Contract source up to its `#[cfg(test)]` module declaration.
fn template_source(source: &'static str) -> &'static str {
    match source.find("\n\n#[cfg(test)]") {
        Some(end) => &source[..=end],
        None => source,
    }
}

/// Source seeded into new projects and new files.
pub fn default_contract_source() -> &'static str {
    template_source(HELLO_WORLD_SOURCE)
}

pub fn default_files() -> Vec<ProjectFile> {
    vec![ProjectFile::new(DEFAULT_FILE_NAME, default_contract_source())]
}

/// `contract_<unix-millis>.rs`, the name given to unnamed new files.
pub fn default_file_name(now: DateTime<Utc>) -> String {
    format!("contract_{}.rs", now.timestamp_millis())
}

#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub files: Vec<ProjectFile>,
}

pub fn templates() -> Vec<Template> {
    vec![
        Template {
            id: "hello_world",
            name: "Hello World",
            description: "Minimal contract returning a greeting",
            files: default_files(),
        },
        Template {
            id: "counter",
            name: "Counter",
            description: "Instance-storage counter with increment, get and reset",
            files: vec![ProjectFile::new(DEFAULT_FILE_NAME, template_source(COUNTER_SOURCE))],
        },
    ]
}

pub fn template(id: &str) -> Option<Template> {
    templates().into_iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileKind;

    #[test]
    fn default_files_hold_one_rust_scaffold() {
        let files = default_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, DEFAULT_FILE_NAME);
        assert_eq!(files[0].kind, FileKind::Rust);
        assert!(files[0].content.contains("#[contractimpl]"));
    }

    #[test]
    fn template_sources_leave_out_test_modules() {
        for t in templates() {
            let content = &t.files[0].content;
            assert!(!content.contains("cfg(test)"), "{} carries its test module", t.id);
            assert!(content.ends_with("}\n"));
        }
    }

    #[test]
    fn default_file_name_embeds_millis() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(default_file_name(at), "contract_1700000000123.rs");
    }

    #[test]
    fn templates_lookup() {
        assert!(template("counter").unwrap().files[0].content.contains("increment"));
        assert!(template("nope").is_none());
    }
}
