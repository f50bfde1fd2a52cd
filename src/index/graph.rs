//! Multi-directional graph search over the file-table collection.
//!
//! Visibility for a file is the union of three passes: every exported symbol
//! workspace-wide, everything reachable through the file's transitive
//! includes, and everything reachable through the files that transitively
//! include it. The first writer of a name wins across all three passes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ahash::{AHashMap, AHashSet};

use super::table::{FileTable, SymbolDescriptor};

/// A symbol produced by visibility resolution, with the file it came from.
///
/// Candidates are unfiltered: a local symbol still needs scope-containment
/// filtering against the query position by the consumer.
#[derive(Debug, Clone, Copy)]
pub struct Visible<'a> {
    pub descriptor: &'a SymbolDescriptor,
    pub origin: &'a Path,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SearchMode {
    Globals,
    Includes,
    Parents,
}

pub(crate) struct VisibilityResolver<'a> {
    files: &'a BTreeMap<PathBuf, FileTable>,
}

impl<'a> VisibilityResolver<'a> {
    pub fn new(files: &'a BTreeMap<PathBuf, FileTable>) -> Self {
        Self { files }
    }

    /// Candidate symbols by name for `target`. A name already present is
    /// never overwritten by a later pass or file.
    pub fn resolve(&self, target: &Path) -> AHashMap<String, Visible<'a>> {
        let mut output = AHashMap::new();

        let mut scratch = AHashSet::new();
        for path in self.files.keys() {
            self.seek(path, &mut output, &mut scratch, SearchMode::Globals);
        }

        let mut searched = AHashSet::new();
        self.seek(target, &mut output, &mut searched, SearchMode::Includes);
        self.seek(target, &mut output, &mut searched, SearchMode::Parents);
        output
    }

    fn seek(
        &self,
        path: &Path,
        output: &mut AHashMap<String, Visible<'a>>,
        searched: &mut AHashSet<PathBuf>,
        mode: SearchMode,
    ) {
        let Some((origin, table)) = self.files.get_key_value(path) else {
            return;
        };
        searched.insert(origin.clone());

        for (name, descriptor) in &table.symbols {
            if output.contains_key(name) {
                continue;
            }
            if mode != SearchMode::Globals || descriptor.is_exported() {
                output.insert(
                    name.clone(),
                    Visible {
                        descriptor,
                        origin: origin.as_path(),
                    },
                );
            }
        }

        if mode == SearchMode::Includes {
            for include in &table.includes {
                let Some(resolved) = include.resolved.as_deref() else {
                    continue;
                };
                if !searched.contains(resolved) {
                    self.seek(resolved, output, searched, SearchMode::Includes);
                }
            }
        }

        if mode == SearchMode::Parents {
            self.seek_up(origin, output, searched);
        }
    }

    /// Walks every known file that includes `target`, pulling in each
    /// parent's full include closure and recursing upward.
    fn seek_up(
        &self,
        target: &Path,
        output: &mut AHashMap<String, Visible<'a>>,
        searched: &mut AHashSet<PathBuf>,
    ) {
        for (path, table) in self.files {
            if searched.contains(path.as_path()) {
                continue;
            }
            let includes_target = table
                .includes
                .iter()
                .any(|include| include.resolved.as_deref() == Some(target));
            if includes_target {
                self.seek(path, output, searched, SearchMode::Includes);
                self.seek(path, output, searched, SearchMode::Parents);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::diagnostic::{SourcePosition, SourceSpan};
    use crate::index::table::{IncludeDescriptor, SymbolFlags, SymbolKind};

    fn descriptor(path: &str, flags: SymbolFlags) -> SymbolDescriptor {
        SymbolDescriptor {
            location: SourceSpan::point(PathBuf::from(path), SourcePosition::new(1, 1)),
            kind: SymbolKind::Function,
            flags,
            scope: None,
            documentation: None,
        }
    }

    fn include(from: &str, to: Option<&str>) -> IncludeDescriptor {
        IncludeDescriptor {
            range: SourceSpan::point(PathBuf::from(from), SourcePosition::new(1, 1)),
            raw: to.unwrap_or("missing.inc").to_string(),
            resolved: to.map(PathBuf::from),
        }
    }

    fn table(symbols: &[(&str, SymbolFlags)], includes: Vec<IncludeDescriptor>) -> FileTable {
        let mut table = FileTable::new();
        for (name, flags) in symbols {
            table.symbols.insert(
                name.to_string(),
                descriptor("x", *flags),
            );
        }
        table.includes = includes;
        table
    }

    #[test]
    fn exports_are_visible_without_any_include_relationship() {
        let mut files = BTreeMap::new();
        files.insert(
            PathBuf::from("/ws/far.z80"),
            table(
                &[("Shared", SymbolFlags::EXPORTED), ("Hidden", SymbolFlags::empty())],
                Vec::new(),
            ),
        );
        files.insert(PathBuf::from("/ws/main.z80"), table(&[], Vec::new()));

        let resolver = VisibilityResolver::new(&files);
        let visible = resolver.resolve(Path::new("/ws/main.z80"));
        assert!(visible.contains_key("Shared"), "Exported symbols reach every file");
        assert!(
            !visible.contains_key("Hidden"),
            "Unexported symbols stay invisible without an include path"
        );
    }

    #[test]
    fn include_closure_is_transitively_visible() {
        let mut files = BTreeMap::new();
        files.insert(
            PathBuf::from("/ws/a.z80"),
            table(&[("A", SymbolFlags::empty())], vec![include("/ws/a.z80", Some("/ws/b.inc"))]),
        );
        files.insert(
            PathBuf::from("/ws/b.inc"),
            table(&[("B", SymbolFlags::empty())], vec![include("/ws/b.inc", Some("/ws/c.inc"))]),
        );
        files.insert(
            PathBuf::from("/ws/c.inc"),
            table(&[("C", SymbolFlags::empty())], Vec::new()),
        );

        let resolver = VisibilityResolver::new(&files);
        let visible = resolver.resolve(Path::new("/ws/a.z80"));
        for name in ["A", "B", "C"] {
            assert!(visible.contains_key(name), "{name} should be visible from a.z80");
        }
    }

    #[test]
    fn parents_and_their_other_includes_are_visible() {
        let mut files = BTreeMap::new();
        files.insert(
            PathBuf::from("/ws/game.z80"),
            table(
                &[("Main", SymbolFlags::empty())],
                vec![
                    include("/ws/game.z80", Some("/ws/shared.inc")),
                    include("/ws/game.z80", Some("/ws/sibling.inc")),
                ],
            ),
        );
        files.insert(
            PathBuf::from("/ws/shared.inc"),
            table(&[("Helper", SymbolFlags::empty())], Vec::new()),
        );
        files.insert(
            PathBuf::from("/ws/sibling.inc"),
            table(&[("Sibling", SymbolFlags::empty())], Vec::new()),
        );

        let resolver = VisibilityResolver::new(&files);
        let visible = resolver.resolve(Path::new("/ws/shared.inc"));
        assert!(visible.contains_key("Main"), "Symbols of the including file are visible");
        assert!(
            visible.contains_key("Sibling"),
            "The parent's other includes are visible too"
        );
    }

    #[test]
    fn include_cycles_terminate() {
        let mut files = BTreeMap::new();
        files.insert(
            PathBuf::from("/ws/a.inc"),
            table(&[("A", SymbolFlags::empty())], vec![include("/ws/a.inc", Some("/ws/b.inc"))]),
        );
        files.insert(
            PathBuf::from("/ws/b.inc"),
            table(&[("B", SymbolFlags::empty())], vec![include("/ws/b.inc", Some("/ws/a.inc"))]),
        );

        let resolver = VisibilityResolver::new(&files);
        let visible = resolver.resolve(Path::new("/ws/a.inc"));
        assert!(visible.contains_key("A"));
        assert!(visible.contains_key("B"));
        assert_eq!(visible.len(), 2, "Each symbol appears exactly once");
    }

    #[test]
    fn unresolved_includes_are_excluded_from_traversal() {
        let mut files = BTreeMap::new();
        files.insert(
            PathBuf::from("/ws/a.z80"),
            table(&[], vec![include("/ws/a.z80", None)]),
        );
        files.insert(
            PathBuf::from("/ws/missing.inc"),
            table(&[("Ghost", SymbolFlags::empty())], Vec::new()),
        );

        let resolver = VisibilityResolver::new(&files);
        let visible = resolver.resolve(Path::new("/ws/a.z80"));
        assert!(
            !visible.contains_key("Ghost"),
            "An unresolved include contributes no edge"
        );
    }

    #[test]
    fn duplicate_exports_yield_exactly_one_entry() {
        let mut files = BTreeMap::new();
        files.insert(
            PathBuf::from("/ws/a.z80"),
            table(&[("X", SymbolFlags::EXPORTED)], Vec::new()),
        );
        files.insert(
            PathBuf::from("/ws/b.z80"),
            table(&[("X", SymbolFlags::EXPORTED)], Vec::new()),
        );
        files.insert(PathBuf::from("/ws/c.z80"), table(&[], Vec::new()));

        let resolver = VisibilityResolver::new(&files);
        let visible = resolver.resolve(Path::new("/ws/c.z80"));
        let winner = visible.get("X").expect("X is visible");
        assert_eq!(
            winner.origin,
            Path::new("/ws/a.z80"),
            "The lexicographically first table wins deterministically"
        );
    }

    #[test]
    fn globals_pass_shadows_later_include_pass_entries() {
        let mut files = BTreeMap::new();
        files.insert(
            PathBuf::from("/ws/exported.z80"),
            table(&[("Name", SymbolFlags::EXPORTED)], Vec::new()),
        );
        files.insert(
            PathBuf::from("/ws/main.z80"),
            table(&[("Name", SymbolFlags::empty())], Vec::new()),
        );

        let resolver = VisibilityResolver::new(&files);
        let visible = resolver.resolve(Path::new("/ws/main.z80"));
        assert_eq!(
            visible.get("Name").expect("present").origin,
            Path::new("/ws/exported.z80"),
            "The globals pass writes first and is never overwritten"
        );
    }
}
