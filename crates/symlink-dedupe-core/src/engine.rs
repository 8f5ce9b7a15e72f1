use crate::classify;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::model::Classification;
use crate::pipeline::{RunSummary, StagingPipeline};
use crate::progress::ProgressReporter;
use crate::scanner;
use crate::state::StagingState;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

pub struct DedupeEngine {
    config: AppConfig,
}

impl DedupeEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Finds every linked module of `package_dir` without touching the tree.
    pub fn discover(&self, package_dir: &Path) -> Result<Classification> {
        let module_dir = self.config.module_dir(package_dir);
        info!("Scanning {}", module_dir.display());

        let scan_start = Instant::now();
        let scan = scanner::scan_module_dir(&module_dir, &self.config.scope_prefix)?;
        let classification = classify::classify(&scan)?;
        debug!(
            "Scan completed in {:.2}s: {} scopes, {} modules, {} linked modules, {} links",
            scan_start.elapsed().as_secs_f64(),
            scan.scopes.len(),
            scan.modules.len(),
            classification.modules.len(),
            classification.symlinks.len(),
        );

        Ok(classification)
    }

    /// Run the full pipeline for a package directory:
    /// 1. Refuse if an earlier run left the tree staged
    /// 2. Scan and classify linked modules
    /// 3. Stage, dedupe, restore
    pub fn run(&self, package_dir: &Path, reporter: &dyn ProgressReporter) -> Result<RunSummary> {
        self.ensure_idle(package_dir)?;
        let classification = self.discover(package_dir)?;
        info!(
            "Staging {} linked module(s) behind {} link(s)",
            classification.modules.len(),
            classification.symlinks.len()
        );

        StagingPipeline::new(package_dir, &self.config).run(&classification, reporter)
    }

    /// Errors when a staging marker from an unfinished run is present.
    pub fn ensure_idle(&self, package_dir: &Path) -> Result<()> {
        match StagingState::load(package_dir)? {
            Some(state) => Err(Error::StagingInProgress {
                marker: StagingState::path_in(package_dir),
                phase: state.phase,
            }),
            None => Ok(()),
        }
    }
}
