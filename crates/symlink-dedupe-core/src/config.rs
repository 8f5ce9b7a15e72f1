use crate::platform;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Name of the package manager's module directory inside a package.
    pub modules_dir: String,
    /// Directory names starting with this prefix are scopes.
    pub scope_prefix: String,
    /// Dependency descriptor copied into each staged module.
    pub descriptor_file: String,
    /// Raw shell text, so it may carry its own flags or a full path.
    pub dedupe_program: String,
    /// Each argument is quoted and reaches the program as one word.
    pub dedupe_args: Vec<String>,
    /// Upper bound on threads used inside a single phase. `None` uses the
    /// global rayon pool.
    pub concurrency: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            modules_dir: "node_modules".to_string(),
            scope_prefix: "@".to_string(),
            descriptor_file: "package.json".to_string(),
            dedupe_program: "npm".to_string(),
            dedupe_args: vec!["dedupe".to_string()],
            concurrency: None,
        }
    }
}

impl AppConfig {
    pub fn module_dir(&self, package_dir: &Path) -> PathBuf {
        package_dir.join(&self.modules_dir)
    }

    /// The full command line handed to the shell.
    pub fn dedupe_command(&self) -> String {
        std::iter::once(self.dedupe_program.clone())
            .chain(self.dedupe_args.iter().map(|arg| platform::quote_arg(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Loads `SymlinkDedupe.*` from the working directory if present, then
/// applies `SYMLINK_DEDUPE_*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("SymlinkDedupe").required(false))
        .add_source(Environment::with_prefix("SYMLINK_DEDUPE"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
