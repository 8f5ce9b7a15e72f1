use crate::error::{Error, Result};
use crate::model::{Classification, Entry, ScanResult, Symlink, SymlinkedModule, SymlinkedScope};
use std::collections::HashSet;
use std::path::PathBuf;

/// Turns a scan into the modules to stage and the links to restore.
///
/// Three topologies are recognised:
///
///  - `node_modules/linked-module`
///  - `node_modules/@linked-scope/module`
///  - `node_modules/@scope/linked-module`
///
/// A linked module inside a linked scope is rejected rather than resolved.
pub fn classify(scan: &ScanResult) -> Result<Classification> {
    let mut modules = Vec::new();

    for scope in &scan.scopes {
        let scope_entry = &scope.entry;

        match &scope_entry.resolved_target {
            Some(scope_target) if scope_entry.is_symlink => {
                if let Some(linked) = scope.modules.iter().find(|m| m.is_symlink) {
                    return Err(Error::ConflictingSymlink {
                        scope_path: scope_entry.path.clone(),
                        module_path: linked.path.clone(),
                    });
                }

                // README.md, .DS_Store and friends live next to the modules
                let nested = scope.modules.iter().filter(|module| module.is_dir);
                modules.extend(nested.map(|module| SymlinkedModule {
                    name: qualified_name(scope_entry, module),
                    path: module.path.clone(),
                    target: scope_target.join(&module.file_name),
                    scope: Some(SymlinkedScope {
                        path: scope_entry.path.clone(),
                        target: scope_target.clone(),
                    }),
                }));
            }
            _ => {
                modules.extend(scope.modules.iter().filter_map(|module| {
                    linked_target(module).map(|target| SymlinkedModule {
                        name: qualified_name(scope_entry, module),
                        path: module.path.clone(),
                        target,
                        scope: None,
                    })
                }));
            }
        }
    }

    modules.extend(scan.modules.iter().filter_map(|module| {
        linked_target(module).map(|target| SymlinkedModule {
            name: module.name.clone(),
            path: module.path.clone(),
            target,
            scope: None,
        })
    }));

    let symlinks = collect_symlinks(&modules);
    Ok(Classification { modules, symlinks })
}

/// One link per directly linked module, and one per linked scope no matter
/// how many modules sit beneath it. The first module seen for a scope wins.
pub fn collect_symlinks(modules: &[SymlinkedModule]) -> Vec<Symlink> {
    let mut seen_scopes: HashSet<&PathBuf> = HashSet::new();
    let mut symlinks = Vec::new();

    for module in modules {
        match &module.scope {
            Some(scope) => {
                if seen_scopes.insert(&scope.path) {
                    symlinks.push(Symlink {
                        path: scope.path.clone(),
                        target: scope.target.clone(),
                    });
                }
            }
            None => symlinks.push(Symlink {
                path: module.path.clone(),
                target: module.target.clone(),
            }),
        }
    }

    symlinks
}

/// Links to files are not modules and are left alone.
fn linked_target(entry: &Entry) -> Option<PathBuf> {
    if entry.is_symlink && entry.is_dir {
        entry.resolved_target.clone()
    } else {
        None
    }
}

fn qualified_name(scope: &Entry, module: &Entry) -> String {
    format!("{}/{}", scope.name, module.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scope;
    use std::path::Path;

    const MODULE_DIR: &str = "/app/node_modules";

    fn plain(parent: &Path, name: &str) -> Entry {
        Entry {
            name: name.to_string(),
            file_name: name.into(),
            path: parent.join(name),
            is_symlink: false,
            is_dir: true,
            resolved_target: None,
        }
    }

    fn linked(parent: &Path, name: &str, target: &str) -> Entry {
        Entry {
            name: name.to_string(),
            file_name: name.into(),
            path: parent.join(name),
            is_symlink: true,
            is_dir: true,
            resolved_target: Some(PathBuf::from(target)),
        }
    }

    fn file(parent: &Path, name: &str) -> Entry {
        Entry {
            is_dir: false,
            ..plain(parent, name)
        }
    }

    fn scope(entry: Entry, children: &[(&str, Option<&str>)]) -> Scope {
        let modules = children
            .iter()
            .map(|(name, target)| match target {
                Some(target) => linked(&entry.path, name, target),
                None => plain(&entry.path, name),
            })
            .collect();
        Scope { entry, modules }
    }

    fn scenario() -> ScanResult {
        let root = Path::new(MODULE_DIR);
        ScanResult {
            module_dir: root.to_path_buf(),
            scopes: vec![
                scope(plain(root, "@scope"), &[("bar", Some("/real/bar")), ("local", None)]),
                scope(
                    linked(root, "@libs", "/real/libs"),
                    &[("baz", None), ("qux", None)],
                ),
            ],
            modules: vec![linked(root, "foo", "/real/foo"), plain(root, "lodash")],
        }
    }

    #[test]
    fn test_scenario_classification() {
        let result = classify(&scenario()).unwrap();

        let mut names: Vec<&str> = result.modules.iter().map(|m| m.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["@libs/baz", "@libs/qux", "@scope/bar", "foo"]);

        assert_eq!(result.symlinks.len(), 3);
        let mut link_paths: Vec<&Path> =
            result.symlinks.iter().map(|l| l.path.as_path()).collect();
        link_paths.sort();
        assert_eq!(
            link_paths,
            vec![
                Path::new("/app/node_modules/@libs"),
                Path::new("/app/node_modules/@scope/bar"),
                Path::new("/app/node_modules/foo"),
            ]
        );
    }

    #[test]
    fn test_linked_scope_modules_inherit_scope_target() {
        let result = classify(&scenario()).unwrap();
        let baz = result
            .modules
            .iter()
            .find(|m| m.name == "@libs/baz")
            .unwrap();

        assert!(baz.has_symlinked_scope());
        assert_eq!(baz.path, PathBuf::from("/app/node_modules/@libs/baz"));
        assert_eq!(baz.target, PathBuf::from("/real/libs/baz"));
        let scope = baz.scope.as_ref().unwrap();
        assert_eq!(scope.path, PathBuf::from("/app/node_modules/@libs"));
        assert_eq!(scope.target, PathBuf::from("/real/libs"));

        let bar = result
            .modules
            .iter()
            .find(|m| m.name == "@scope/bar")
            .unwrap();
        assert!(!bar.has_symlinked_scope());
        assert_eq!(bar.target, PathBuf::from("/real/bar"));
    }

    #[test]
    fn test_counts_follow_scope_dedup_law() {
        let root = Path::new(MODULE_DIR);
        let (n, m, k_per_scope, linked_scopes) = (3, 2, 4, 2);

        let mut scan = ScanResult {
            module_dir: root.to_path_buf(),
            ..Default::default()
        };
        for i in 0..n {
            scan.modules
                .push(linked(root, &format!("plain{i}"), &format!("/real/plain{i}")));
        }
        let scoped: Vec<(String, String)> = (0..m)
            .map(|i| (format!("mod{i}"), format!("/real/mod{i}")))
            .collect();
        let children: Vec<(&str, Option<&str>)> = scoped
            .iter()
            .map(|(name, target)| (name.as_str(), Some(target.as_str())))
            .collect();
        scan.scopes.push(scope(plain(root, "@plain"), &children));

        let names: Vec<String> = (0..k_per_scope).map(|i| format!("inner{i}")).collect();
        let inner: Vec<(&str, Option<&str>)> =
            names.iter().map(|name| (name.as_str(), None)).collect();
        for s in 0..linked_scopes {
            scan.scopes.push(scope(
                linked(root, &format!("@linked{s}"), &format!("/real/linked{s}")),
                &inner,
            ));
        }

        let result = classify(&scan).unwrap();
        assert_eq!(result.modules.len(), n + m + k_per_scope * linked_scopes);
        assert_eq!(result.symlinks.len(), n + m + linked_scopes);
    }

    #[test]
    fn test_linked_module_inside_linked_scope_is_rejected() {
        let root = Path::new(MODULE_DIR);
        let scan = ScanResult {
            module_dir: root.to_path_buf(),
            scopes: vec![scope(
                linked(root, "@libs", "/real/libs"),
                &[("baz", None), ("evil", Some("/elsewhere/evil"))],
            )],
            modules: vec![linked(root, "foo", "/real/foo")],
        };

        match classify(&scan) {
            Err(Error::ConflictingSymlink {
                scope_path,
                module_path,
            }) => {
                assert_eq!(scope_path, PathBuf::from("/app/node_modules/@libs"));
                assert_eq!(module_path, PathBuf::from("/app/node_modules/@libs/evil"));
            }
            other => panic!("expected ConflictingSymlink, got {:?}", other),
        }
    }

    #[test]
    fn test_no_links_means_nothing_to_stage() {
        let root = Path::new(MODULE_DIR);
        let scan = ScanResult {
            module_dir: root.to_path_buf(),
            scopes: vec![scope(plain(root, "@types"), &[("node", None)])],
            modules: vec![plain(root, "lodash")],
        };
        let result = classify(&scan).unwrap();
        assert!(result.is_empty());
        assert!(result.symlinks.is_empty());
    }

    #[test]
    fn test_files_are_not_modules() {
        let root = Path::new(MODULE_DIR);
        let libs = linked(root, "@libs", "/real/libs");
        let mut linked_scope = scope(libs, &[("baz", None)]);
        linked_scope.modules.push(file(&linked_scope.entry.path, "README.md"));
        linked_scope.modules.push(file(&linked_scope.entry.path, ".DS_Store"));

        let mut plain_scope = scope(plain(root, "@scope"), &[("bar", Some("/real/bar"))]);
        plain_scope.modules.push(Entry {
            is_dir: false,
            ..linked(&plain_scope.entry.path, "notes.txt", "/real/notes.txt")
        });

        let scan = ScanResult {
            module_dir: root.to_path_buf(),
            scopes: vec![linked_scope, plain_scope],
            modules: vec![
                linked(root, "foo", "/real/foo"),
                file(root, ".package-lock.json"),
                Entry {
                    is_dir: false,
                    ..linked(root, "LICENSE", "/real/LICENSE")
                },
            ],
        };

        let result = classify(&scan).unwrap();
        let mut names: Vec<&str> = result.modules.iter().map(|m| m.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["@libs/baz", "@scope/bar", "foo"]);
        assert_eq!(result.symlinks.len(), 3);
    }
}
