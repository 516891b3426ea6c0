use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_PROGRAM_NAME: &str = "BuildVersion";
pub const DEFAULT_DECLARATION_FILE: &str = "Variables.var";
pub const DEFAULT_GLOBAL_FILE: &str = "Global.var";
pub const DEFAULT_TYPE_NAME: &str = "BuildVersionType";

/// Which failure categories abort the run instead of only warning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub error_on_missing_arguments: bool,
    pub error_on_repository_check_failure: bool,
    pub error_on_uncommitted_changes: bool,
    pub error_if_no_initialization_target: bool,
}

/// Contents of the optional JSON options file. Absent keys fall back to the
/// built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FileOptions {
    pub error_on_missing_arguments: Option<bool>,
    pub error_on_repository_check_failure: Option<bool>,
    pub error_on_uncommitted_changes: Option<bool>,
    pub error_if_no_initialization_target: Option<bool>,
    pub program_name: Option<String>,
    pub declaration_file: Option<String>,
    pub global_file: Option<String>,
    pub type_name: Option<String>,
}

impl FileOptions {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read options file {}", path.display()))?;
        let options = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse options file {}", path.display()))?;
        log::debug!("loaded options from {}", path.display());
        Ok(options)
    }
}

/// Everything one run needs to know.
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_root: PathBuf,
    pub build_args: Vec<String>,
    pub policy: Policy,
    pub program_name: String,
    pub declaration_file: String,
    pub global_file: String,
    pub type_name: String,
    /// Skip discovery and write the declaration here.
    pub declaration_path: Option<PathBuf>,
    /// Skip discovery and patch this shared declarations file.
    pub global_path: Option<PathBuf>,
}

impl Settings {
    pub fn new(project_root: impl Into<PathBuf>, build_args: Vec<String>) -> Self {
        Settings {
            project_root: project_root.into(),
            build_args,
            policy: Policy::default(),
            program_name: DEFAULT_PROGRAM_NAME.to_string(),
            declaration_file: DEFAULT_DECLARATION_FILE.to_string(),
            global_file: DEFAULT_GLOBAL_FILE.to_string(),
            type_name: DEFAULT_TYPE_NAME.to_string(),
            declaration_path: None,
            global_path: None,
        }
    }

    /// Fill in whatever the options file sets. Policy switches already turned
    /// on stay on.
    pub fn merge(mut self, file: FileOptions) -> Self {
        let p = &mut self.policy;
        p.error_on_missing_arguments |= file.error_on_missing_arguments.unwrap_or(false);
        p.error_on_repository_check_failure |=
            file.error_on_repository_check_failure.unwrap_or(false);
        p.error_on_uncommitted_changes |= file.error_on_uncommitted_changes.unwrap_or(false);
        p.error_if_no_initialization_target |=
            file.error_if_no_initialization_target.unwrap_or(false);
        if let Some(v) = file.program_name {
            self.program_name = v;
        }
        if let Some(v) = file.declaration_file {
            self.declaration_file = v;
        }
        if let Some(v) = file.global_file {
            self.global_file = v;
        }
        if let Some(v) = file.type_name {
            self.type_name = v;
        }
        self
    }
}
