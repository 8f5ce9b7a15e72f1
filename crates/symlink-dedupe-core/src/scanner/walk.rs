use crate::error::{Error, Result};
use crate::model::{DirectoryListing, Entry, ScanResult, Scope};
use rayon::prelude::*;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Reads the names directly inside `dir`, sorted so scan output is stable.
pub fn list_directory(dir: &Path) -> Result<DirectoryListing> {
    let scan_err = |source| Error::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        entries.push(entry.file_name());
    }
    entries.sort();

    Ok(DirectoryListing {
        path: dir.to_path_buf(),
        entries,
    })
}

/// Scans a module directory one level deep, plus the immediate children of
/// every scope. Nothing below that is visited.
pub fn scan_module_dir(module_dir: &Path, scope_prefix: &str) -> Result<ScanResult> {
    let listing = list_directory(module_dir)?;
    debug!(
        "Scanning {} ({} entries)",
        module_dir.display(),
        listing.entries.len()
    );

    let (scope_names, module_names): (Vec<&OsStr>, Vec<&OsStr>) = listing
        .entries
        .iter()
        .map(|name| name.as_os_str())
        .partition(|name| name.to_string_lossy().starts_with(scope_prefix));

    let scopes = scope_names
        .par_iter()
        .map(|name| scan_scope(&listing.path, name))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    let modules = module_names
        .par_iter()
        .map(|name| inspect_entry(&listing.path, name))
        .collect::<Result<Vec<_>>>()?;

    Ok(ScanResult {
        module_dir: module_dir.to_path_buf(),
        scopes,
        modules,
    })
}

/// `None` when the prefixed name is a loose file rather than a scope.
fn scan_scope(parent: &Path, name: &OsStr) -> Result<Option<Scope>> {
    let entry = inspect_entry(parent, name)?;
    if !entry.is_dir {
        trace!("Skipping {}: not a directory", entry.path.display());
        return Ok(None);
    }

    // read_dir follows a symlinked scope, so its modules are listed either way
    let listing = list_directory(&entry.path)?;

    let modules = listing
        .entries
        .par_iter()
        .map(|module_name| inspect_entry(&listing.path, module_name))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(Scope { entry, modules }))
}

/// lstat the entry and, for symlinks, resolve the real path behind it.
fn inspect_entry(parent: &Path, name: &OsStr) -> Result<Entry> {
    let path = parent.join(name);
    let scan_err = |source| Error::Scan {
        path: path.clone(),
        source,
    };

    let metadata = fs::symlink_metadata(&path).map_err(scan_err)?;
    let is_symlink = metadata.file_type().is_symlink();

    let (resolved_target, is_dir) = if is_symlink {
        let target = fs::canonicalize(&path).map_err(scan_err)?;
        let is_dir = fs::metadata(&target).map_err(scan_err)?.is_dir();
        trace!("{} -> {}", path.display(), target.display());
        (Some(target), is_dir)
    } else {
        (None, metadata.is_dir())
    };

    Ok(Entry {
        name: name.to_string_lossy().into_owned(),
        file_name: name.to_os_string(),
        path,
        is_symlink,
        is_dir,
        resolved_target,
    })
}
