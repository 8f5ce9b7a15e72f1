pub mod classify;
pub mod config;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod fs_ops;
pub mod model;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod scanner;
pub mod state;

pub use config::AppConfig;
pub use engine::DedupeEngine;
pub use error::{Error, Result};
pub use model::{Classification, Symlink, SymlinkedModule};
pub use pipeline::{Phase, RunSummary, StagingPipeline};
pub use progress::{OutputStream, ProgressReporter, SilentReporter};
pub use state::StagingState;
