use crate::platform;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// The filesystem primitives the staging pipeline sequences. Each call is
/// expected to be individually reliable; the pipeline decides the order.
pub trait StagingFs: Send + Sync {
    /// Removes a directory link. Must refuse anything that is not a link.
    fn unlink(&self, link: &Path) -> io::Result<()>;
    fn ensure_dir(&self, dir: &Path) -> io::Result<()>;
    /// Whether anything (including a dangling link) exists at `path`.
    fn exists(&self, path: &Path) -> io::Result<bool>;
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn move_dir(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, dir: &Path) -> io::Result<()>;
    fn symlink_dir(&self, target: &Path, link: &Path) -> io::Result<()>;
}

/// `StagingFs` backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl StagingFs for RealFs {
    fn unlink(&self, link: &Path) -> io::Result<()> {
        let metadata = fs::symlink_metadata(link)?;
        if !metadata.file_type().is_symlink() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a symbolic link", link.display()),
            ));
        }
        platform::remove_dir_link(link)
    }

    fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            // a file where a directory was expected leaves nothing below it
            Err(err) if platform::is_not_a_directory(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(from, to).map(|_| ())
    }

    fn move_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err) if platform::is_cross_device(&err) => {
                debug!(
                    "Cross-filesystem move detected ({} -> {}), using copy fallback",
                    from.display(),
                    to.display()
                );
                copy_tree(from, to)?;
                // source goes only after every entry landed
                fs::remove_dir_all(from)
            }
            Err(err) => Err(err),
        }
    }

    fn remove_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::remove_dir_all(dir)
    }

    fn symlink_dir(&self, target: &Path, link: &Path) -> io::Result<()> {
        platform::symlink_dir(target, link)
    }
}

/// Copies a directory tree, recreating symlinks as links rather than
/// following them.
fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let dest = to.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else if file_type.is_symlink() {
            let link_target = fs::read_link(entry.path())?;
            copy_link(&link_target, &dest, entry.path())?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(link_target: &Path, dest: &Path, _source: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link_target, dest)
}

#[cfg(target_os = "windows")]
fn copy_link(link_target: &Path, dest: &Path, source: &Path) -> io::Result<()> {
    if fs::metadata(source).map(|m| m.is_dir()).unwrap_or(false) {
        std::os::windows::fs::symlink_dir(link_target, dest)
    } else {
        std::os::windows::fs::symlink_file(link_target, dest)
    }
}
