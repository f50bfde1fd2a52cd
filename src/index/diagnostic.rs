use std::path::PathBuf;

/// Severity of an index diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// A precise source position (1-indexed line/column) inside a tracked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A half-open [start, end) span referencing a specific source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub path: PathBuf,
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    pub fn new(path: PathBuf, start: SourcePosition, end: SourcePosition) -> Self {
        Self { path, start, end }
    }

    pub fn point(path: PathBuf, position: SourcePosition) -> Self {
        Self {
            path,
            start: position,
            end: position,
        }
    }
}

/// Structured diagnostic suitable for tooling integration.
///
/// Diagnostics are data, not errors: a failed include resolution is recorded
/// here and the scan continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmDiagnostic {
    pub level: DiagnosticLevel,
    pub code: &'static str,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl AsmDiagnostic {
    pub fn new(
        level: DiagnosticLevel,
        code: &'static str,
        message: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Self {
        Self {
            level,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn format_human(&self) -> String {
        let location = self
            .span
            .as_ref()
            .map(|span| format!("{}:{}:{}", span.path.display(), span.start.line, span.start.column))
            .unwrap_or_else(|| "<unknown>".to_string());
        format!(
            "{level:?} {code}: {message} @ {location}",
            level = self.level,
            code = self.code,
            message = self.message,
            location = location
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_human_includes_location() {
        let span = SourceSpan::point(PathBuf::from("main.z80"), SourcePosition::new(4, 9));
        let diag = AsmDiagnostic::new(
            DiagnosticLevel::Warning,
            "include.fallback-dir",
            "resolved via the including file's directory",
            Some(span),
        );
        let rendered = diag.format_human();
        assert!(
            rendered.contains("main.z80:4:9"),
            "Human rendering should carry the file, line, and column"
        );
        assert!(
            rendered.contains("include.fallback-dir"),
            "Human rendering should carry the stable diagnostic code"
        );
    }

    #[test]
    fn format_human_tolerates_missing_span() {
        let diag = AsmDiagnostic::new(DiagnosticLevel::Error, "include.not-found", "no such file", None);
        assert!(
            diag.format_human().contains("<unknown>"),
            "Spanless diagnostics should render a placeholder location"
        );
    }
}
