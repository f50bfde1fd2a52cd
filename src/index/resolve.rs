//! Ordered on-disk probing for `include` directive paths.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Where an include path was found, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Found under the workspace root or a configured search directory.
    Found(PathBuf),
    /// Found only relative to the including file's own directory. Kept for
    /// backward compatibility; callers surface a warning recommending the
    /// directory be added to the configured search paths.
    FoundViaOriginDir(PathBuf),
    NotFound,
}

/// Probes, in order: the workspace root, each configured search directory,
/// then the originating file's directory. Candidates must exist on disk and
/// not be directories.
pub struct IncludeResolver<'a> {
    workspace_root: Option<&'a Path>,
    search_paths: &'a [PathBuf],
}

impl<'a> IncludeResolver<'a> {
    pub fn new(workspace_root: Option<&'a Path>, search_paths: &'a [PathBuf]) -> Self {
        Self {
            workspace_root,
            search_paths,
        }
    }

    pub fn resolve(&self, raw: &str, origin_dir: &Path) -> Resolution {
        if let Some(root) = self.workspace_root {
            let candidate = root.join(raw);
            if candidate.is_file() {
                return Resolution::Found(candidate);
            }
        }
        for search_dir in self.search_paths {
            let Some(base) = self.absolute_search_dir(search_dir) else {
                debug!(
                    dir = %search_dir.display(),
                    "skipping relative include search directory without a workspace root"
                );
                continue;
            };
            let candidate = base.join(raw);
            if candidate.is_file() {
                return Resolution::Found(candidate);
            }
        }
        let fallback = origin_dir.join(raw);
        if fallback.is_file() {
            return Resolution::FoundViaOriginDir(fallback);
        }
        Resolution::NotFound
    }

    fn absolute_search_dir(&self, dir: &Path) -> Option<PathBuf> {
        if dir.is_absolute() {
            Some(dir.to_path_buf())
        } else {
            self.workspace_root.map(|root| root.join(dir))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, "").expect("write file");
        path
    }

    #[test]
    fn workspace_root_wins_over_search_paths() {
        let root = tempdir().expect("tempdir");
        let extra = tempdir().expect("tempdir");
        let in_root = write_file(root.path(), "hardware.inc");
        write_file(extra.path(), "hardware.inc");
        let search = [extra.path().to_path_buf()];
        let resolver = IncludeResolver::new(Some(root.path()), &search);
        assert_eq!(
            resolver.resolve("hardware.inc", root.path()),
            Resolution::Found(in_root)
        );
    }

    #[test]
    fn search_paths_probe_in_declared_order() {
        let root = tempdir().expect("tempdir");
        let first = tempdir().expect("tempdir");
        let second = tempdir().expect("tempdir");
        write_file(second.path(), "macros.inc");
        let expected = write_file(first.path(), "macros.inc");
        let search = [first.path().to_path_buf(), second.path().to_path_buf()];
        let resolver = IncludeResolver::new(Some(root.path()), &search);
        assert_eq!(
            resolver.resolve("macros.inc", root.path()),
            Resolution::Found(expected)
        );
    }

    #[test]
    fn relative_search_dirs_resolve_against_the_workspace_root() {
        let root = tempdir().expect("tempdir");
        let expected = write_file(&root.path().join("lib"), "tiles.inc");
        let search = [PathBuf::from("lib")];
        let resolver = IncludeResolver::new(Some(root.path()), &search);
        assert_eq!(
            resolver.resolve("tiles.inc", root.path()),
            Resolution::Found(expected)
        );
    }

    #[test]
    fn origin_directory_is_a_flagged_fallback() {
        let root = tempdir().expect("tempdir");
        let nested = root.path().join("src");
        let expected = write_file(&nested, "local.inc");
        let resolver = IncludeResolver::new(Some(root.path()), &[]);
        assert_eq!(
            resolver.resolve("local.inc", &nested),
            Resolution::FoundViaOriginDir(expected)
        );
    }

    #[test]
    fn directories_are_never_accepted() {
        let root = tempdir().expect("tempdir");
        fs::create_dir_all(root.path().join("gfx")).expect("mkdir");
        let resolver = IncludeResolver::new(Some(root.path()), &[]);
        assert_eq!(resolver.resolve("gfx", root.path()), Resolution::NotFound);
    }

    #[test]
    fn missing_files_report_not_found() {
        let root = tempdir().expect("tempdir");
        let resolver = IncludeResolver::new(Some(root.path()), &[]);
        assert_eq!(
            resolver.resolve("ghost.inc", root.path()),
            Resolution::NotFound
        );
    }
}
