#[cfg(target_os = "windows")]
pub mod windows;

use std::io;
use std::path::Path;

/// Creates a directory link at `link` pointing to `target`.
#[cfg(target_os = "windows")]
pub fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    windows::junction_or_symlink(target, link)
}

#[cfg(unix)]
pub fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Removes a directory link without touching what it points to.
#[cfg(target_os = "windows")]
pub fn remove_dir_link(link: &Path) -> io::Result<()> {
    // junctions and directory symlinks are directories to the Win32 API
    std::fs::remove_dir(link)
}

#[cfg(unix)]
pub fn remove_dir_link(link: &Path) -> io::Result<()> {
    std::fs::remove_file(link)
}

/// True when a rename failed because source and destination live on
/// different filesystems.
#[cfg(unix)]
pub fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(target_os = "windows")]
pub fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(windows::ERROR_NOT_SAME_DEVICE)
}

/// The shell and its "run this string" flag.
#[cfg(target_os = "windows")]
pub fn shell() -> (&'static str, &'static str) {
    ("cmd", "/C")
}

#[cfg(unix)]
pub fn shell() -> (&'static str, &'static str) {
    ("sh", "-c")
}

/// True when a path component that should be a directory is a file, as in
/// `README.md/package.json`.
#[cfg(unix)]
pub fn is_not_a_directory(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ENOTDIR)
}

#[cfg(target_os = "windows")]
pub fn is_not_a_directory(err: &io::Error) -> bool {
    err.raw_os_error() == Some(windows::ERROR_DIRECTORY)
}

/// Quotes one argument so the shell passes it through as a single word.
#[cfg(unix)]
pub fn quote_arg(arg: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c);
    if !arg.is_empty() && arg.chars().all(safe) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(target_os = "windows")]
pub fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '"']) {
        return arg.to_string();
    }
    format!("\"{}\"", arg.replace('"', "\\\""))
}
