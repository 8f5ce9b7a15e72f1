#![cfg(unix)]

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use symlink_dedupe_core::{AppConfig, DedupeEngine, Error, Phase, SilentReporter, StagingState};

/// Same layout as the scan tests, inside `root`:
///   real/foo, real/bar, real/libs/{baz,qux}
///   app/node_modules/{foo ->, @scope/bar ->, @libs ->, lodash/}
fn create_linked_tree(root: &Path) {
    let real = root.join("real");
    for dir in ["foo/node_modules/left-pad", "bar", "libs/baz/node_modules/left-pad", "libs/qux"] {
        fs::create_dir_all(real.join(dir)).unwrap();
    }
    for pkg in ["foo", "bar", "libs/baz", "libs/qux"] {
        fs::write(real.join(pkg).join("package.json"), format!("{{\"name\":\"{pkg}\"}}")).unwrap();
    }
    fs::write(real.join("foo/node_modules/left-pad/index.js"), "module.exports = 1;").unwrap();

    let modules = root.join("app/node_modules");
    fs::create_dir_all(modules.join("lodash")).unwrap();
    fs::create_dir_all(modules.join("@scope")).unwrap();
    fs::write(root.join("app/package.json"), "{}").unwrap();
    symlink(real.join("foo"), modules.join("foo")).unwrap();
    symlink(real.join("bar"), modules.join("@scope/bar")).unwrap();
    symlink(real.join("libs"), modules.join("@libs")).unwrap();
}

/// Every link below the module directory (one scope level deep) and what it
/// resolves to.
fn link_topology(module_dir: &Path) -> BTreeMap<PathBuf, PathBuf> {
    let mut links = BTreeMap::new();
    for entry in fs::read_dir(module_dir).unwrap().flatten() {
        let path = entry.path();
        let is_link = fs::symlink_metadata(&path).unwrap().file_type().is_symlink();
        if is_link {
            links.insert(path.clone(), fs::canonicalize(&path).unwrap());
        }
        if !is_link && path.is_dir() && entry.file_name().to_string_lossy().starts_with('@') {
            for nested in fs::read_dir(&path).unwrap().flatten() {
                let nested = nested.path();
                if fs::symlink_metadata(&nested).unwrap().file_type().is_symlink() {
                    links.insert(nested.clone(), fs::canonicalize(&nested).unwrap());
                }
            }
        }
    }
    links
}

fn config_with_dedupe(command: &str) -> AppConfig {
    AppConfig {
        dedupe_program: command.to_string(),
        dedupe_args: vec![],
        ..AppConfig::default()
    }
}

#[test]
fn test_full_run_restores_link_topology() {
    let tmp = tempdir().unwrap();
    create_linked_tree(tmp.path());
    let package = tmp.path().join("app");
    let module_dir = package.join("node_modules");
    let before = link_topology(&module_dir);
    assert_eq!(before.len(), 3);

    // Fails unless the staged tree is real while the deduper runs
    let check = "test ! -L node_modules/foo \
        && test -f node_modules/foo/package.json \
        && test -f node_modules/foo/node_modules/left-pad/index.js \
        && test ! -L node_modules/@libs \
        && test -d node_modules/@libs/baz/node_modules/left-pad \
        && test -f node_modules/@libs/qux/package.json \
        && test -f node_modules/@scope/bar/package.json";
    let engine = DedupeEngine::new(config_with_dedupe(check));

    let summary = engine.run(&package, &SilentReporter).unwrap();
    assert_eq!(summary.modules, 4);
    assert_eq!(summary.symlinks, 3);

    assert_eq!(link_topology(&module_dir), before);

    // dependencies are back in their real homes
    let real = tmp.path().join("real");
    assert!(real.join("foo/node_modules/left-pad/index.js").is_file());
    assert!(real.join("libs/baz/node_modules/left-pad").is_dir());
    assert!(!real.join("bar/node_modules").exists());
    assert!(real.join("foo/package.json").is_file());

    assert_eq!(StagingState::load(&package).unwrap(), None);
}

#[test]
fn test_failed_dedupe_leaves_marker_and_blocks_next_run() {
    let tmp = tempdir().unwrap();
    create_linked_tree(tmp.path());
    let package = tmp.path().join("app");
    let engine = DedupeEngine::new(config_with_dedupe("exit 3"));

    match engine.run(&package, &SilentReporter) {
        Err(Error::DedupeProcess { code }) => assert_eq!(code, 3),
        other => panic!("expected DedupeProcess, got {:?}", other),
    }

    // staged state is distinguishable from idle
    let state = StagingState::load(&package).unwrap().unwrap();
    assert_eq!(state.phase, Phase::Dedupe);
    assert_eq!(state.symlinks.len(), 3);
    assert!(!fs::symlink_metadata(package.join("node_modules/foo"))
        .unwrap()
        .file_type()
        .is_symlink());

    match engine.run(&package, &SilentReporter) {
        Err(Error::StagingInProgress { phase, .. }) => assert_eq!(phase, Phase::Dedupe),
        other => panic!("expected StagingInProgress, got {:?}", other),
    }
}

#[test]
fn test_conflicting_topology_mutates_nothing() {
    let tmp = tempdir().unwrap();
    create_linked_tree(tmp.path());
    fs::create_dir_all(tmp.path().join("elsewhere/evil")).unwrap();
    symlink(tmp.path().join("elsewhere/evil"), tmp.path().join("real/libs/evil")).unwrap();
    let package = tmp.path().join("app");
    let before = link_topology(&package.join("node_modules"));

    let engine = DedupeEngine::new(config_with_dedupe("true"));
    assert!(matches!(
        engine.run(&package, &SilentReporter),
        Err(Error::ConflictingSymlink { .. })
    ));

    assert_eq!(link_topology(&package.join("node_modules")), before);
    assert_eq!(StagingState::load(&package).unwrap(), None);
}

#[test]
fn test_loose_files_in_linked_scope_survive_a_run() {
    let tmp = tempdir().unwrap();
    create_linked_tree(tmp.path());
    let real = tmp.path().join("real");
    fs::write(real.join("libs/README.md"), "# libs").unwrap();
    fs::write(real.join("libs/.DS_Store"), "").unwrap();
    let package = tmp.path().join("app");
    let module_dir = package.join("node_modules");
    fs::write(module_dir.join(".package-lock.json"), "{}").unwrap();
    let before = link_topology(&module_dir);

    let engine = DedupeEngine::new(config_with_dedupe(
        "test -d node_modules/@libs/baz && test ! -e node_modules/@libs/README.md",
    ));
    let summary = engine.run(&package, &SilentReporter).unwrap();
    assert_eq!(summary.modules, 4);
    assert_eq!(summary.symlinks, 3);

    assert_eq!(link_topology(&module_dir), before);
    assert_eq!(fs::read_to_string(real.join("libs/README.md")).unwrap(), "# libs");
    assert!(real.join("libs/.DS_Store").is_file());
    assert!(module_dir.join(".package-lock.json").is_file());
    assert!(module_dir.join("@libs/README.md").is_file());
    assert_eq!(StagingState::load(&package).unwrap(), None);
}
