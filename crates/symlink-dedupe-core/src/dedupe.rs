use crate::error::{Error, Result};
use crate::platform;
use crate::progress::{OutputStream, ProgressReporter};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, info, warn};

/// The external tool that flattens a real dependency tree.
pub trait Deduper: Send + Sync {
    fn dedupe(&self, dir: &Path, reporter: &dyn ProgressReporter) -> Result<()>;
}

/// Runs a command line through the platform shell. Going through the shell
/// lets Windows find `npm.cmd` on the search path.
#[derive(Debug, Clone)]
pub struct ShellDeduper {
    command: String,
}

impl ShellDeduper {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Deduper for ShellDeduper {
    fn dedupe(&self, dir: &Path, reporter: &dyn ProgressReporter) -> Result<()> {
        let (shell, flag) = platform::shell();
        info!("Running '{}' in {}", self.command, dir.display());
        reporter.on_dedupe_start(dir);

        let mut child = Command::new(shell)
            .arg(flag)
            .arg(&self.command)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::DedupeSpawn {
                command: self.command.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Both pipes are drained concurrently so a chatty stderr cannot
        // block the child while stdout is being read.
        thread::scope(|s| {
            if let Some(out) = stdout {
                s.spawn(|| forward_lines(out, OutputStream::Stdout, reporter));
            }
            if let Some(err) = stderr {
                s.spawn(|| forward_lines(err, OutputStream::Stderr, reporter));
            }
        });

        let status = child.wait().map_err(|source| Error::DedupeWait {
            command: self.command.clone(),
            source,
        })?;
        let code = status.code().unwrap_or(-1);
        info!("'{}' exited with code {}", self.command, code);
        reporter.on_dedupe_exit(code);

        if status.success() {
            Ok(())
        } else {
            Err(Error::DedupeProcess { code })
        }
    }
}

fn forward_lines<R: Read>(pipe: R, stream: OutputStream, reporter: &dyn ProgressReporter) {
    for line in BufReader::new(pipe).lines() {
        match line {
            Ok(line) => {
                match stream {
                    OutputStream::Stdout => debug!("[dedupe] {}", line),
                    OutputStream::Stderr => warn!("[dedupe] {}", line),
                }
                reporter.on_dedupe_output(stream, &line);
            }
            Err(e) => {
                debug!("Stopped reading dedupe {:?}: {}", stream, e);
                break;
            }
        }
    }
}
