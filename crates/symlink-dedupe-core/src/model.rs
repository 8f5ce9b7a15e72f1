use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

/// Names found directly inside one directory, sorted. Names are kept as the
/// filesystem returned them; they need not be valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    pub path: PathBuf,
    pub entries: Vec<OsString>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Display name, lossily converted.
    pub name: String,
    pub file_name: OsString,
    pub path: PathBuf,
    pub is_symlink: bool,
    /// Whether the entry is, or links to, a directory. Loose files and
    /// dotfiles next to modules are not modules.
    pub is_dir: bool,
    /// Real path behind the link. `None` for anything that is not a symlink.
    pub resolved_target: Option<PathBuf>,
}

/// A namespace directory (`@scope`) and the modules directly inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub entry: Entry,
    pub modules: Vec<Entry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub module_dir: PathBuf,
    pub scopes: Vec<Scope>,
    pub modules: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymlinkedScope {
    pub path: PathBuf,
    pub target: PathBuf,
}

/// A module the pipeline stages. `path` is where the link lives inside the
/// module directory, `target` the real directory behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkedModule {
    pub name: String,
    pub path: PathBuf,
    pub target: PathBuf,
    /// Set when the parent scope, not the module, is the link.
    pub scope: Option<SymlinkedScope>,
}

impl SymlinkedModule {
    pub fn has_symlinked_scope(&self) -> bool {
        self.scope.is_some()
    }
}

/// A link removed in the unlink phase and recreated in the relink phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symlink {
    pub path: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub modules: Vec<SymlinkedModule>,
    pub symlinks: Vec<Symlink>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
