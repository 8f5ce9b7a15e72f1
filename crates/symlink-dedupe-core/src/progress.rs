use crate::error::Error;
use crate::model::{Symlink, SymlinkedModule};
use crate::pipeline::{Phase, RunSummary};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Trait for reporting pipeline progress.
///
/// CLI implements it with indicatif spinners. Per-element callbacks may fire
/// from several worker threads at once. All methods have default no-op
/// implementations and nothing they do can affect the run.
pub trait ProgressReporter: Send + Sync {
    fn on_phase_start(&self, _phase: Phase, _items: usize) {}
    fn on_unlink(&self, _link: &Symlink) {}
    fn on_stage(&self, _module: &SymlinkedModule) {}
    fn on_dedupe_start(&self, _dir: &Path) {}
    fn on_dedupe_output(&self, _stream: OutputStream, _line: &str) {}
    fn on_dedupe_exit(&self, _code: i32) {}
    fn on_unstage(&self, _module: &SymlinkedModule) {}
    fn on_remove(&self, _link: &Symlink) {}
    fn on_relink(&self, _link: &Symlink) {}
    fn on_phase_complete(&self, _phase: Phase, _duration_secs: f64) {}
    fn on_phase_failed(&self, _phase: Phase, _error: &Error) {}
    fn on_done(&self, _summary: &RunSummary) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
