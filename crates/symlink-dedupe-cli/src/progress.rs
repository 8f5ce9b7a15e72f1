use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;
use symlink_dedupe_core::{
    Error, OutputStream, Phase, ProgressReporter, Symlink, SymlinkedModule,
};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif.
///
/// - Filesystem phases: progress bar over links or modules
/// - Dedupe phase: spinner, with the tool's output printed above it
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    fn step(&self, message: String) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_message(message);
            pb.inc(1);
        }
    }

    fn println(&self, line: String) {
        let guard = self.bar.lock().unwrap();
        match guard.as_ref() {
            Some(pb) => pb.println(line),
            None => eprintln!("{}", line),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_phase_start(&self, phase: Phase, items: usize) {
        let pb = if phase == Phase::Dedupe {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}")
                    .unwrap()
                    .tick_chars(TICK_CHARS),
            );
            pb
        } else {
            let pb = ProgressBar::new(items as u64);
            pb.set_style(
                ProgressStyle::with_template(
                    "  {spinner:.cyan} {prefix:<18} [{bar:30.cyan/dim}] {pos}/{len} {wide_msg}",
                )
                .unwrap()
                .progress_chars("━╸─")
                .tick_chars(TICK_CHARS),
            );
            pb
        };
        pb.set_prefix(phase.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_unlink(&self, link: &Symlink) {
        self.step(format!("unlinking '{}'", link.path.display()));
    }

    fn on_stage(&self, module: &SymlinkedModule) {
        self.step(format!("staging {}", module.name));
    }

    fn on_dedupe_start(&self, dir: &Path) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_message(format!("deduping {}", dir.display()));
        }
    }

    fn on_dedupe_output(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => self.println(format!("    {}", line)),
            OutputStream::Stderr => self.println(format!("  \x1b[33m!\x1b[0m {}", line)),
        }
    }

    fn on_unstage(&self, module: &SymlinkedModule) {
        self.step(format!("restoring {}", module.name));
    }

    fn on_remove(&self, link: &Symlink) {
        self.step(format!("removing '{}'", link.path.display()));
    }

    fn on_relink(&self, link: &Symlink) {
        self.step(format!(
            "relinking '{}' to '{}'",
            link.path.display(),
            link.target.display()
        ));
    }

    fn on_phase_complete(&self, phase: Phase, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m {} complete in {:.2}s",
            phase, duration_secs
        );
    }

    fn on_phase_failed(&self, phase: Phase, _error: &Error) {
        self.finish_bar();
        eprintln!("  \x1b[31m✗\x1b[0m {} failed", phase);
    }
}
