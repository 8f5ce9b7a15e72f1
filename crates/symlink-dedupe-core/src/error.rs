use crate::pipeline::Phase;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "Symlinked modules not allowed inside symlinked scopes ({} inside {})",
        module_path.display(),
        scope_path.display()
    )]
    ConflictingSymlink {
        scope_path: PathBuf,
        module_path: PathBuf,
    },

    #[error("{phase} failed at {}: {source}", path.display())]
    Staging {
        phase: Phase,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Dedupe process exited with code {code}")]
    DedupeProcess { code: i32 },

    #[error("Failed to spawn '{command}': {source}")]
    DedupeSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed waiting for '{command}': {source}")]
    DedupeWait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "A previous run stopped during the {phase} phase (marker: {}); restore the links listed there before running again",
        marker.display()
    )]
    StagingInProgress { marker: PathBuf, phase: Phase },

    #[error("State file {}: {message}", path.display())]
    StateFile { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// The phase a mutating failure happened in, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::Staging { phase, .. } => Some(*phase),
            Error::DedupeProcess { .. }
            | Error::DedupeSpawn { .. }
            | Error::DedupeWait { .. } => Some(Phase::Dedupe),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
