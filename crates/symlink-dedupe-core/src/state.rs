//! On-disk marker for a staging run that has started mutating the tree.
//!
//! The marker is written before every phase and removed once links are
//! restored. A marker left behind means the module directory is partially
//! staged; it records which phase stopped and which links have to exist
//! again for the tree to be back in its original shape.

use crate::error::{Error, Result};
use crate::model::Symlink;
use crate::pipeline::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const STATE_FILE_NAME: &str = ".symlink-dedupe-state.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingState {
    pub started_at: DateTime<Utc>,
    pub phase: Phase,
    /// Error message of the phase that stopped the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub symlinks: Vec<Symlink>,
}

impl StagingState {
    pub fn new(symlinks: &[Symlink]) -> Self {
        Self {
            started_at: Utc::now(),
            phase: Phase::Unlink,
            failure: None,
            symlinks: symlinks.to_vec(),
        }
    }

    pub fn path_in(package_dir: &Path) -> PathBuf {
        package_dir.join(STATE_FILE_NAME)
    }

    /// Reads the marker of `package_dir`, `None` when the directory is idle.
    pub fn load(package_dir: &Path) -> Result<Option<StagingState>> {
        let path = Self::path_in(package_dir);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(state_err(&path, err)),
        };
        toml::from_str(&contents)
            .map(Some)
            .map_err(|e| state_err(&path, e))
    }

    /// Writes the marker and syncs it, so a crash in the following phase
    /// still leaves a readable record behind.
    pub fn store(&self, package_dir: &Path) -> Result<()> {
        let path = Self::path_in(package_dir);
        let contents = toml::to_string_pretty(self).map_err(|e| state_err(&path, e))?;

        let mut file = File::create(&path).map_err(|e| state_err(&path, e))?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| state_err(&path, e))
    }

    pub fn clear(package_dir: &Path) -> Result<()> {
        let path = Self::path_in(package_dir);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(state_err(&path, err)),
        }
    }
}

fn state_err(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::StateFile {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
