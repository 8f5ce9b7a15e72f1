use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

pub const ERROR_NOT_SAME_DEVICE: i32 = 17;
pub const ERROR_DIRECTORY: i32 = 267;

/// Junctions need no special privilege, so `mklink /J` is tried first.
/// Falls back to a directory symlink when the junction cannot be made
/// (e.g. the target is on a network share).
pub fn junction_or_symlink(target: &Path, link: &Path) -> io::Result<()> {
    let status = Command::new("cmd")
        .arg("/C")
        .arg("mklink")
        .arg("/J")
        .arg(link)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;

    if status.success() {
        return Ok(());
    }

    debug!(
        "mklink /J {} failed ({}), creating directory symlink",
        link.display(),
        status
    );
    std::os::windows::fs::symlink_dir(target, link)
}
