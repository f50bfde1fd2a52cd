//! Cross-file symbol indexing and editor intelligence for SM83/Z80-family
//! assembly workspaces.
//!
//! The core is the [`index::SymbolIndex`]: a line-oriented scanner extracts
//! labels, macros, exports, local symbols, include edges, and documentation
//! comments into per-file tables, and a three-pass graph search resolves the
//! symbol set visible to any file. The optional `language-server` feature
//! wraps the index in a stdio LSP backend.

pub mod config;
pub mod format;
pub mod index;
pub mod syntax;

#[cfg(feature = "language-server")]
pub mod server;
