//! Editor integration: a stdio language server backed by the symbol index.

mod language_server;

pub use language_server::{run_stdio_language_server, AsmLanguageServer};
