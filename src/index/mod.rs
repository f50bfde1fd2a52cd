//! Incremental cross-file symbol index for assembly workspaces.
//!
//! Each tracked file owns a [`FileTable`] rebuilt whole on every change;
//! visibility queries run a three-pass graph search over the collection
//! (workspace-wide exports, transitive includes, transitive includers).

mod classify;
mod docs;
mod graph;
mod resolve;
mod scan;
mod table;

pub mod diagnostic;
pub mod error;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::WorkspaceConfig;

pub use diagnostic::{AsmDiagnostic, DiagnosticLevel, SourcePosition, SourceSpan};
pub use error::AsmError;
pub use graph::Visible;
pub use table::{
    FileTable, IncludeDescriptor, ScopeDescriptor, ScopeId, SymbolDescriptor, SymbolFlags,
    SymbolKind,
};

use graph::VisibilityResolver;
use resolve::IncludeResolver;
use scan::FileScanner;

/// The process-wide file-table collection and the operations on it.
///
/// Explicitly owned and injectable: hosts construct one, feed it change
/// notifications, and query it. Tables are replaced as whole units, so a
/// cooperative reader sees either the old table or the new one, never a
/// half-built state.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    files: BTreeMap<PathBuf, FileTable>,
    config: WorkspaceConfig,
    workspace_root: Option<PathBuf>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub fn set_workspace_root(&mut self, root: Option<PathBuf>) {
        self.workspace_root = root;
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Installs a new configuration snapshot. Include resolution depends on
    /// it, so callers should follow up with [`SymbolIndex::rescan`].
    pub fn set_config(&mut self, config: WorkspaceConfig) {
        self.config = config;
    }

    /// Parses `text` and replaces the file's table.
    pub fn document(&mut self, path: impl Into<PathBuf>, text: &str) {
        let path = path.into();
        let resolver = IncludeResolver::new(
            self.workspace_root.as_deref(),
            self.config.include_paths.as_slice(),
        );
        let scanner = FileScanner::new(resolver, self.config.preserve_doc_newlines);
        let table = scanner.scan(&path, text);
        self.files.insert(path, table);
    }

    /// Drops a deleted file's table.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.files.remove(path).is_some()
    }

    pub fn file_table(&self, path: &Path) -> Option<&FileTable> {
        self.files.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &FileTable)> {
        self.files.iter().map(|(path, table)| (path.as_path(), table))
    }

    /// The file's current diagnostics (unresolved or fallback-resolved
    /// includes). Empty for unknown files.
    pub fn diagnostics(&self, path: &Path) -> &[AsmDiagnostic] {
        self.files
            .get(path)
            .map(|table| table.diagnostics.as_slice())
            .unwrap_or(&[])
    }

    /// Candidate symbols by name visible to `path`. Local symbols still need
    /// [`SymbolIndex::symbol_visible_at`] filtering against the query
    /// position.
    pub fn visible_symbols(&self, path: &Path) -> AHashMap<String, Visible<'_>> {
        VisibilityResolver::new(&self.files).resolve(path)
    }

    /// The descriptor `name` resolves to from `path`, if any.
    pub fn lookup(&self, name: &str, path: &Path) -> Option<Visible<'_>> {
        self.visible_symbols(path).remove(name)
    }

    /// Position filter for local symbols: a local candidate is only visible
    /// when the query sits inside its scope, in its own file.
    pub fn symbol_visible_at(
        &self,
        visible: &Visible<'_>,
        query_file: &Path,
        position: SourcePosition,
    ) -> bool {
        if !visible.descriptor.is_local() {
            return true;
        }
        if visible.origin != query_file {
            return false;
        }
        self.files
            .get(visible.origin)
            .map(|table| table.visible_at(visible.descriptor, position))
            .unwrap_or(false)
    }

    /// Walks the workspace root and indexes every tracked file. Returns the
    /// number of files indexed.
    pub fn scan_workspace(&mut self) -> Result<usize, AsmError> {
        let Some(root) = self.workspace_root.clone() else {
            return Ok(0);
        };
        let mut indexed = 0;
        for entry in WalkDir::new(&root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !self.config.is_tracked(path) {
                continue;
            }
            match fs::read_to_string(path) {
                Ok(text) => {
                    self.document(path.to_path_buf(), &text);
                    indexed += 1;
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable file");
                }
            }
        }
        info!(root = %root.display(), indexed, "workspace scan complete");
        Ok(indexed)
    }

    /// Re-reads and re-indexes every known file, picking up configuration
    /// changes that affect include resolution. Failures are local: a file
    /// that can no longer be read keeps its previous table.
    pub fn rescan(&mut self) -> usize {
        let paths: Vec<PathBuf> = self.files.keys().cloned().collect();
        let mut rescanned = 0;
        for path in paths {
            match fs::read_to_string(&path) {
                Ok(text) => {
                    self.document(path, &text);
                    rescanned += 1;
                }
                Err(err) => {
                    debug!(path = %path.display(), %err, "keeping stale table for unreadable file");
                }
            }
        }
        rescanned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).expect("write file");
        path
    }

    #[test]
    fn workspace_scan_indexes_tracked_files_only() {
        let dir = tempdir().expect("tempdir");
        write_file(dir.path(), "main.z80", "Start::\n");
        write_file(dir.path(), "notes.txt", "not assembly");
        let mut index = SymbolIndex::new();
        index.set_workspace_root(Some(dir.path().to_path_buf()));
        let indexed = index.scan_workspace().expect("scan");
        assert_eq!(indexed, 1);
        assert!(index.file_table(&dir.path().join("main.z80")).is_some());
        assert!(index.file_table(&dir.path().join("notes.txt")).is_none());
    }

    #[test]
    fn document_replaces_the_whole_table() {
        let mut index = SymbolIndex::new();
        let path = Path::new("/ws/a.z80");
        index.document(path.to_path_buf(), "Old::\n");
        index.document(path.to_path_buf(), "New::\n");
        let table = index.file_table(path).expect("table");
        assert!(table.symbol("Old").is_none(), "Replaced tables keep no stale symbols");
        assert!(table.symbol("New").is_some());
    }

    #[test]
    fn remove_forgets_the_file_and_its_exports() {
        let mut index = SymbolIndex::new();
        index.document(PathBuf::from("/ws/a.z80"), "Gone::\n");
        index.document(PathBuf::from("/ws/b.z80"), "");
        assert!(index.remove(Path::new("/ws/a.z80")));
        assert!(
            index.lookup("Gone", Path::new("/ws/b.z80")).is_none(),
            "Exports of removed files must disappear"
        );
        assert!(!index.remove(Path::new("/ws/a.z80")), "Double removal is a no-op");
    }

    #[test]
    fn rescan_picks_up_new_include_search_paths() {
        let dir = tempdir().expect("tempdir");
        let lib = dir.path().join("lib");
        fs::create_dir_all(&lib).expect("mkdir");
        write_file(&lib, "helpers.inc", "Helper:\n");
        write_file(dir.path(), "main.z80", "include \"helpers.inc\"\n");

        let mut index = SymbolIndex::new();
        index.set_workspace_root(Some(dir.path().to_path_buf()));
        index.scan_workspace().expect("scan");
        let main = dir.path().join("main.z80");
        assert_eq!(
            index.diagnostics(&main).len(),
            1,
            "Unconfigured include should fail first"
        );

        let mut config = WorkspaceConfig::default();
        config.include_paths = vec![PathBuf::from("lib")].into();
        index.set_config(config);
        index.rescan();
        assert!(index.diagnostics(&main).is_empty(), "Rescan must re-resolve includes");
        assert!(
            index.lookup("Helper", &main).is_some(),
            "The resolved include contributes its symbols"
        );
    }

    #[test]
    fn local_symbols_filter_by_position() {
        let mut index = SymbolIndex::new();
        let path = Path::new("/ws/a.z80");
        index.document(
            path.to_path_buf(),
            "First:\n.loop:\nSecond:\n",
        );
        let visible = index.visible_symbols(path);
        let local = visible.get(".loop").expect("local is a candidate");
        assert!(index.symbol_visible_at(local, path, SourcePosition::new(2, 4)));
        assert!(
            !index.symbol_visible_at(local, path, SourcePosition::new(3, 1)),
            "Past the next non-local label the local is out of scope"
        );
        assert!(
            !index.symbol_visible_at(local, Path::new("/ws/b.z80"), SourcePosition::new(2, 4)),
            "Locals never apply to positions in other files"
        );
    }
}
