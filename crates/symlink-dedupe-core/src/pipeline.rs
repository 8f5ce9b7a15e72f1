use crate::config::AppConfig;
use crate::dedupe::{Deduper, ShellDeduper};
use crate::error::{Error, Result};
use crate::fs_ops::{RealFs, StagingFs};
use crate::model::{Classification, Symlink, SymlinkedModule};
use crate::progress::ProgressReporter;
use crate::state::StagingState;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Unlink,
    Stage,
    Dedupe,
    Unstage,
    RemoveScaffolding,
    Relink,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Unlink,
        Phase::Stage,
        Phase::Dedupe,
        Phase::Unstage,
        Phase::RemoveScaffolding,
        Phase::Relink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Unlink => "unlink",
            Phase::Stage => "stage",
            Phase::Dedupe => "dedupe",
            Phase::Unstage => "unstage",
            Phase::RemoveScaffolding => "remove-scaffolding",
            Phase::Relink => "relink",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub modules: usize,
    pub symlinks: usize,
    pub phase_durations: Vec<(Phase, Duration)>,
    pub total_duration: Duration,
}

/// Stages linked modules as real directories, runs the deduper over the
/// whole package once, then puts every link back.
///
/// Phases run one after another; elements inside a phase run in parallel.
/// The first failing element stops the run and no later phase starts.
/// Nothing already done is undone: the staging marker is left in the
/// package directory with the failing phase recorded.
pub struct StagingPipeline {
    package_dir: PathBuf,
    nested_modules_dir: String,
    descriptor_file: String,
    concurrency: Option<usize>,
    fs: Arc<dyn StagingFs>,
    deduper: Arc<dyn Deduper>,
}

impl StagingPipeline {
    pub fn new(package_dir: impl Into<PathBuf>, config: &AppConfig) -> Self {
        Self {
            package_dir: package_dir.into(),
            nested_modules_dir: config.modules_dir.clone(),
            descriptor_file: config.descriptor_file.clone(),
            concurrency: config.concurrency,
            fs: Arc::new(RealFs),
            deduper: Arc::new(ShellDeduper::new(config.dedupe_command())),
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn StagingFs>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_deduper(mut self, deduper: Arc<dyn Deduper>) -> Self {
        self.deduper = deduper;
        self
    }

    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    pub fn run(
        &self,
        classification: &Classification,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunSummary> {
        let pool = match self.concurrency {
            Some(threads) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))?,
            ),
            None => None,
        };

        let run_start = Instant::now();
        let mut state = StagingState::new(&classification.symlinks);
        let mut phase_durations = Vec::with_capacity(Phase::ALL.len());

        for phase in Phase::ALL {
            state.phase = phase;
            state.store(&self.package_dir)?;

            let items = match phase {
                Phase::Stage | Phase::Unstage => classification.modules.len(),
                Phase::Dedupe => 1,
                _ => classification.symlinks.len(),
            };
            info!("Phase {}: {} item(s)", phase, items);
            reporter.on_phase_start(phase, items);

            let phase_start = Instant::now();
            if let Err(err) = self.run_phase(phase, classification, pool.as_ref(), reporter) {
                error!("Phase {} failed: {}", phase, err);
                reporter.on_phase_failed(phase, &err);
                state.failure = Some(err.to_string());
                if let Err(store_err) = state.store(&self.package_dir) {
                    warn!("Could not record failure in staging marker: {}", store_err);
                }
                return Err(err);
            }

            let elapsed = phase_start.elapsed();
            debug!("Phase {} completed in {:.2}s", phase, elapsed.as_secs_f64());
            reporter.on_phase_complete(phase, elapsed.as_secs_f64());
            phase_durations.push((phase, elapsed));
        }

        StagingState::clear(&self.package_dir)?;

        let summary = RunSummary {
            modules: classification.modules.len(),
            symlinks: classification.symlinks.len(),
            phase_durations,
            total_duration: run_start.elapsed(),
        };
        reporter.on_done(&summary);
        Ok(summary)
    }

    fn run_phase(
        &self,
        phase: Phase,
        classification: &Classification,
        pool: Option<&ThreadPool>,
        reporter: &dyn ProgressReporter,
    ) -> Result<()> {
        let modules = &classification.modules;
        let symlinks = &classification.symlinks;

        match phase {
            Phase::Unlink => fan_out(pool, symlinks, |link| self.unlink(link, reporter)),
            Phase::Stage => fan_out(pool, modules, |module| self.stage(module, reporter)),
            Phase::Dedupe => self.deduper.dedupe(&self.package_dir, reporter),
            Phase::Unstage => fan_out(pool, modules, |module| self.unstage(module, reporter)),
            Phase::RemoveScaffolding => {
                fan_out(pool, symlinks, |link| self.remove_scaffolding(link, reporter))
            }
            Phase::Relink => fan_out(pool, symlinks, |link| self.relink(link, reporter)),
        }
    }

    fn unlink(&self, link: &Symlink, reporter: &dyn ProgressReporter) -> Result<()> {
        debug!(
            "Unlinking '{}' from '{}'",
            link.path.display(),
            link.target.display()
        );
        reporter.on_unlink(link);
        self.fs
            .unlink(&link.path)
            .map_err(staging_err(Phase::Unlink, &link.path))
    }

    fn stage(&self, module: &SymlinkedModule, reporter: &dyn ProgressReporter) -> Result<()> {
        debug!(
            "Staging {} from '{}' into '{}'",
            module.name,
            module.target.display(),
            module.path.display()
        );
        reporter.on_stage(module);
        let err = |path: &Path| staging_err(Phase::Stage, path);

        self.fs.ensure_dir(&module.path).map_err(err(&module.path))?;

        let descriptor = module.target.join(&self.descriptor_file);
        if self.fs.exists(&descriptor).map_err(err(&descriptor))? {
            self.fs
                .copy_file(&descriptor, &module.path.join(&self.descriptor_file))
                .map_err(err(&descriptor))?;
        }

        let dependencies = module.target.join(&self.nested_modules_dir);
        if self.fs.exists(&dependencies).map_err(err(&dependencies))? {
            self.fs
                .move_dir(&dependencies, &module.path.join(&self.nested_modules_dir))
                .map_err(err(&dependencies))?;
        }
        Ok(())
    }

    fn unstage(&self, module: &SymlinkedModule, reporter: &dyn ProgressReporter) -> Result<()> {
        debug!(
            "Moving {} dependencies from '{}' back to '{}'",
            module.name,
            module.path.display(),
            module.target.display()
        );
        reporter.on_unstage(module);
        let staged = module.path.join(&self.nested_modules_dir);
        let err = staging_err(Phase::Unstage, &staged);

        if !self.fs.exists(&staged).map_err(&err)? {
            return Ok(());
        }
        self.fs
            .move_dir(&staged, &module.target.join(&self.nested_modules_dir))
            .map_err(&err)?;

        // the scaffolding is deleted next, so its content must be gone
        if self.fs.exists(&staged).map_err(&err)? {
            return Err(err(io::Error::new(
                io::ErrorKind::Other,
                "dependency directory still present after moving it back",
            )));
        }
        Ok(())
    }

    fn remove_scaffolding(&self, link: &Symlink, reporter: &dyn ProgressReporter) -> Result<()> {
        debug!("Removing directory '{}'", link.path.display());
        reporter.on_remove(link);
        self.fs
            .remove_dir_all(&link.path)
            .map_err(staging_err(Phase::RemoveScaffolding, &link.path))
    }

    fn relink(&self, link: &Symlink, reporter: &dyn ProgressReporter) -> Result<()> {
        debug!(
            "Relinking '{}' to '{}'",
            link.path.display(),
            link.target.display()
        );
        reporter.on_relink(link);
        self.fs
            .symlink_dir(&link.target, &link.path)
            .map_err(staging_err(Phase::Relink, &link.path))
    }
}

/// Runs `op` over every item and returns once all started items finished.
/// After the first error no further items are started.
fn fan_out<T, F>(pool: Option<&ThreadPool>, items: &[T], op: F) -> Result<()>
where
    T: Sync,
    F: Fn(&T) -> Result<()> + Sync + Send,
{
    match pool {
        Some(pool) => pool.install(|| items.par_iter().try_for_each(&op)),
        None => items.par_iter().try_for_each(&op),
    }
}

fn staging_err(phase: Phase, path: &Path) -> impl Fn(io::Error) -> Error {
    let path = path.to_path_buf();
    move |source| Error::Staging {
        phase,
        path: path.clone(),
        source,
    }
}
