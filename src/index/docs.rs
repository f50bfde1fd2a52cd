//! Accumulates the comment lines preceding a declaration and normalizes them
//! into the declaration's documentation text.

use smallvec::SmallVec;

use super::classify::is_spacer;

/// Buffers pending documentation lines between declarations.
///
/// Lines join with a single newline on attachment, so Markdown renderers
/// soft-wrap them; a forced structural break (annotation lines, or the
/// preserve-all-newlines configuration) appends an extra newline to the
/// previous line instead.
#[derive(Debug, Default)]
pub struct DocAccumulator {
    buffer: SmallVec<[String; 4]>,
    preserve_newlines: bool,
}

impl DocAccumulator {
    pub fn new(preserve_newlines: bool) -> Self {
        Self {
            buffer: SmallVec::new(),
            preserve_newlines,
        }
    }

    /// Adds one comment line to the pending buffer. Spacer runs are dropped.
    pub fn push_comment(&mut self, text: &str) {
        let text = text.trim();
        if is_spacer(text) {
            return;
        }
        if (self.preserve_newlines || text.starts_with('@')) && !self.buffer.is_empty() {
            if let Some(last) = self.buffer.last_mut() {
                last.push('\n');
            }
        }
        self.buffer.push(text.to_string());
    }

    /// Adds a declaration line's inline trailing comment, after any buffered
    /// preceding lines.
    pub fn push_trailing(&mut self, text: &str) {
        self.push_comment(text);
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drains the buffer into a documentation string for a declaration.
    ///
    /// A shared literal prefix across all buffered lines (box-comment
    /// decoration such as `-- `) is stripped before joining. For define
    /// declarations, `define_line` is rendered as a fenced literal ahead of
    /// the buffered text.
    pub fn attach(&mut self, define_line: Option<&str>) -> Option<String> {
        self.strip_common_prefix();
        if let Some(line) = define_line {
            self.buffer.insert(0, fenced_snippet(line));
        }
        let documentation = if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.join("\n"))
        };
        self.buffer.clear();
        documentation
    }

    fn strip_common_prefix(&mut self) {
        if self.buffer.len() < 2 {
            return;
        }
        let prefix_len = {
            let mut sorted: SmallVec<[&str; 4]> = self.buffer.iter().map(String::as_str).collect();
            sorted.sort_unstable();
            let first = sorted[0];
            let last = sorted[sorted.len() - 1];
            first
                .char_indices()
                .zip(last.chars())
                .take_while(|((_, a), b)| a == b)
                .map(|((idx, a), _)| idx + a.len_utf8())
                .last()
                .unwrap_or(0)
        };
        if prefix_len == 0 {
            return;
        }
        for line in self.buffer.iter_mut() {
            *line = line[prefix_len..].to_string();
        }
    }
}

/// `\`Name equ 1\`` rendering of a define line: comment stripped, whitespace
/// runs collapsed.
fn fenced_snippet(line: &str) -> String {
    let without_comment = match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let collapsed = without_comment.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("`{collapsed}`\n")
}
