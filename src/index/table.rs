//! Per-file symbol, include, and scope tables.

use std::path::PathBuf;

use ahash::AHashMap;
use bitflags::bitflags;

use super::diagnostic::{AsmDiagnostic, SourcePosition, SourceSpan};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SymbolFlags: u8 {
        /// Visible workspace-wide regardless of include relationships.
        const EXPORTED = 0b001;
        /// Scoped to the nearest enclosing non-local label.
        const LOCAL = 0b010;
        /// Collides with a reserved token but was force-declared anyway.
        const RESERVED = 0b100;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// Callable or jump target (declaration carried a label terminator).
    Function,
    /// A defined value.
    Constant,
}

/// Index of a `ScopeDescriptor` within its owning `FileTable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub(crate) fn from_index(index: usize) -> Self {
        assert!(index < u32::MAX as usize, "ScopeId index exceeded u32::MAX range");
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One assembly-level named entity: label, macro name, constant, or exported
/// alias.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolDescriptor {
    pub location: SourceSpan,
    pub kind: SymbolKind,
    pub flags: SymbolFlags,
    pub scope: Option<ScopeId>,
    pub documentation: Option<String>,
}

impl SymbolDescriptor {
    pub fn is_exported(&self) -> bool {
        self.flags.contains(SymbolFlags::EXPORTED)
    }

    pub fn is_local(&self) -> bool {
        self.flags.contains(SymbolFlags::LOCAL)
    }

    pub fn is_reserved_word(&self) -> bool {
        self.flags.contains(SymbolFlags::RESERVED)
    }
}

/// A contiguous [start, end) line span bounded by non-local label
/// declarations, used to test whether a local symbol is in scope at a query
/// position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeDescriptor {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl ScopeDescriptor {
    pub fn contains(&self, position: SourcePosition) -> bool {
        self.start <= position && position < self.end
    }
}

/// One include directive occurrence. `resolved` is absent when resolution
/// failed; the failure is recorded on the table's diagnostics instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncludeDescriptor {
    pub range: SourceSpan,
    pub raw: String,
    pub resolved: Option<PathBuf>,
}

/// Everything the index knows about one file. Rebuilt whole on every parse;
/// identical input yields an equal table.
#[derive(Debug, Default, PartialEq)]
pub struct FileTable {
    pub symbols: AHashMap<String, SymbolDescriptor>,
    pub includes: Vec<IncludeDescriptor>,
    pub scopes: Vec<ScopeDescriptor>,
    pub diagnostics: Vec<AsmDiagnostic>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(&self, name: &str) -> Option<&SymbolDescriptor> {
        self.symbols.get(name)
    }

    pub fn scope(&self, id: ScopeId) -> &ScopeDescriptor {
        &self.scopes[id.index()]
    }

    /// Whether `descriptor` is visible at `position` in its own file. Only
    /// local symbols are scope-constrained.
    pub fn visible_at(&self, descriptor: &SymbolDescriptor, position: SourcePosition) -> bool {
        if !descriptor.is_local() {
            return true;
        }
        match descriptor.scope {
            Some(id) => self.scope(id).contains(position),
            None => true,
        }
    }

    /// Records a declaration, replacing any previous descriptor for `name`.
    pub(crate) fn declare(&mut self, name: String, descriptor: SymbolDescriptor) {
        self.symbols.insert(name, descriptor);
    }

    /// An export-only statement for `name`: sets the exported flag on an
    /// existing descriptor without discarding it, or records a fresh
    /// constant-kind descriptor when the name has no declaration yet.
    pub(crate) fn mark_exported(&mut self, name: &str, location: SourceSpan) {
        if let Some(existing) = self.symbols.get_mut(name) {
            existing.flags |= SymbolFlags::EXPORTED;
            return;
        }
        let mut flags = SymbolFlags::EXPORTED;
        if name.contains('.') {
            flags |= SymbolFlags::LOCAL;
        }
        self.symbols.insert(
            name.to_string(),
            SymbolDescriptor {
                location,
                kind: SymbolKind::Constant,
                flags,
                scope: None,
                documentation: None,
            },
        );
    }
}
