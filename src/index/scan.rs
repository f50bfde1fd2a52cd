//! Single forward pass over a file's lines, producing its `FileTable`.

use std::path::Path;

use crate::syntax;

use super::classify::{classify_line, trailing_comment, BlockCommentState, LineClass};
use super::diagnostic::{AsmDiagnostic, DiagnosticLevel, SourcePosition, SourceSpan};
use super::docs::DocAccumulator;
use super::resolve::{IncludeResolver, Resolution};
use super::table::{
    FileTable, IncludeDescriptor, ScopeDescriptor, ScopeId, SymbolDescriptor, SymbolFlags,
    SymbolKind,
};

enum DeclShape {
    Macro,
    Define,
    Label { terminator: usize },
}

/// Drives the line classifier and documentation accumulator over one file.
///
/// The scan never fails: malformed lines are plain code, unresolved includes
/// become diagnostics on the produced table.
pub(crate) struct FileScanner<'a> {
    resolver: IncludeResolver<'a>,
    preserve_newlines: bool,
}

impl<'a> FileScanner<'a> {
    pub fn new(resolver: IncludeResolver<'a>, preserve_newlines: bool) -> Self {
        Self {
            resolver,
            preserve_newlines,
        }
    }

    pub fn scan(&self, path: &Path, text: &str) -> FileTable {
        let mut table = FileTable::new();
        let mut docs = DocAccumulator::new(self.preserve_newlines);
        let mut state = BlockCommentState::default();
        let mut open_scope: Option<ScopeId> = None;
        let origin_dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let mut line_count = 0;
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            line_count = line_no;
            let (class, next_state) = classify_line(line, state);
            state = next_state;
            match class {
                LineClass::Comment { text } | LineClass::BlockCommentLine { text } => {
                    docs.push_comment(&text);
                }
                LineClass::BlockCommentOpen { text }
                | LineClass::BlockCommentBody { text }
                | LineClass::BlockCommentClose { text } => {
                    if !text.trim().is_empty() {
                        docs.push_comment(&text);
                    }
                }
                LineClass::Include {
                    raw,
                    name_start,
                    name_end,
                } => {
                    let range = name_span(path, line_no, name_start, name_end);
                    self.record_include(&mut table, raw, range, &origin_dir);
                    docs.clear();
                }
                LineClass::MacroDef {
                    name,
                    forced,
                    name_start,
                    name_end,
                } => {
                    let range = name_span(path, line_no, name_start, name_end);
                    declare(
                        &mut table,
                        &mut docs,
                        line,
                        name,
                        DeclShape::Macro,
                        forced,
                        range,
                        open_scope,
                    );
                }
                LineClass::Export { names } => {
                    let location =
                        SourceSpan::point(path.to_path_buf(), SourcePosition::new(line_no, 1));
                    for name in names {
                        table.mark_exported(&name, location.clone());
                    }
                    docs.clear();
                }
                LineClass::Define {
                    name,
                    forced,
                    name_start,
                    name_end,
                } => {
                    let range = name_span(path, line_no, name_start, name_end);
                    declare(
                        &mut table,
                        &mut docs,
                        line,
                        name,
                        DeclShape::Define,
                        forced,
                        range,
                        open_scope,
                    );
                }
                LineClass::Label {
                    name,
                    terminator,
                    forced,
                    name_start,
                    name_end,
                } => {
                    if !name.contains('.') {
                        boundary(&mut table, &mut open_scope, SourcePosition::new(line_no, 1));
                    }
                    let range = name_span(path, line_no, name_start, name_end);
                    declare(
                        &mut table,
                        &mut docs,
                        line,
                        name,
                        DeclShape::Label { terminator },
                        forced,
                        range,
                        open_scope,
                    );
                }
                LineClass::Code => docs.clear(),
            }
        }

        if let Some(id) = open_scope {
            table.scopes[id.index()].end = SourcePosition::new(line_count + 1, 1);
        }
        table
    }

    fn record_include(
        &self,
        table: &mut FileTable,
        raw: String,
        range: SourceSpan,
        origin_dir: &Path,
    ) {
        let resolved = match self.resolver.resolve(&raw, origin_dir) {
            Resolution::Found(path) => Some(path),
            Resolution::FoundViaOriginDir(path) => {
                table.diagnostics.push(AsmDiagnostic::new(
                    DiagnosticLevel::Warning,
                    "include.fallback-dir",
                    format!(
                        "'{raw}' was only found next to the including file; add '{}' to the include search paths",
                        origin_dir.display()
                    ),
                    Some(range.clone()),
                ));
                Some(path)
            }
            Resolution::NotFound => {
                table.diagnostics.push(AsmDiagnostic::new(
                    DiagnosticLevel::Error,
                    "include.not-found",
                    format!("cannot find included file '{raw}'"),
                    Some(range.clone()),
                ));
                None
            }
        };
        table.includes.push(IncludeDescriptor {
            range,
            raw,
            resolved,
        });
    }
}

fn name_span(path: &Path, line_no: usize, start: usize, end: usize) -> SourceSpan {
    SourceSpan::new(
        path.to_path_buf(),
        SourcePosition::new(line_no, start + 1),
        SourcePosition::new(line_no, end + 1),
    )
}

/// Closes the open scope (if any) and opens the next one at `at`.
fn boundary(table: &mut FileTable, open_scope: &mut Option<ScopeId>, at: SourcePosition) {
    if let Some(id) = open_scope.take() {
        table.scopes[id.index()].end = at;
    }
    let id = ScopeId::from_index(table.scopes.len());
    table.scopes.push(ScopeDescriptor { start: at, end: at });
    *open_scope = Some(id);
}

#[allow(clippy::too_many_arguments)]
fn declare(
    table: &mut FileTable,
    docs: &mut DocAccumulator,
    line: &str,
    name: String,
    shape: DeclShape,
    forced: bool,
    location: SourceSpan,
    open_scope: Option<ScopeId>,
) {
    if syntax::is_reserved_word(&name) && !forced {
        docs.clear();
        return;
    }
    let is_local = name.contains('.');
    let (kind, exported) = match shape {
        DeclShape::Macro => (SymbolKind::Function, false),
        DeclShape::Define => (SymbolKind::Constant, false),
        DeclShape::Label { terminator } => (
            if terminator > 0 {
                SymbolKind::Function
            } else {
                SymbolKind::Constant
            },
            terminator == 2,
        ),
    };
    let mut flags = SymbolFlags::empty();
    if exported {
        flags |= SymbolFlags::EXPORTED;
    }
    if is_local {
        flags |= SymbolFlags::LOCAL;
    }
    if forced && syntax::is_reserved_word(&name) {
        flags |= SymbolFlags::RESERVED;
    }
    if let Some(text) = trailing_comment(line) {
        docs.push_trailing(text);
    }
    let define_line = matches!(shape, DeclShape::Define).then_some(line);
    let documentation = docs.attach(define_line);
    table.declare(
        name,
        SymbolDescriptor {
            location,
            kind,
            flags,
            scope: if is_local { open_scope } else { None },
            documentation,
        },
    );
}
