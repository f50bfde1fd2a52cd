//! Ordered, regex-driven classification of one physical source line.
//!
//! Patterns are tested in a fixed priority order and the first match wins;
//! reordering them changes classification outcomes, so each pattern's
//! precedence is covered by a test below.

use once_cell::sync::Lazy;
use regex::Regex;

/// Carried-over state for `/* ... */` comments spanning multiple lines.
///
/// The JavaDoc variant is chosen at open time from the marker shape (`/**`);
/// it strips one leading `*` from every continuation line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockCommentState {
    #[default]
    Normal,
    InBlock,
    InJavaDoc,
}

/// What one line of source contains. Name offsets are 0-based byte offsets
/// into the line, used to anchor declaration and include-link ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Comment {
        text: String,
    },
    BlockCommentLine {
        text: String,
    },
    BlockCommentOpen {
        text: String,
    },
    BlockCommentBody {
        text: String,
    },
    BlockCommentClose {
        text: String,
    },
    Include {
        raw: String,
        name_start: usize,
        name_end: usize,
    },
    MacroDef {
        name: String,
        forced: bool,
        name_start: usize,
        name_end: usize,
    },
    Export {
        names: Vec<String>,
    },
    Define {
        name: String,
        forced: bool,
        name_start: usize,
        name_end: usize,
    },
    Label {
        name: String,
        terminator: usize,
        forced: bool,
        name_start: usize,
        name_end: usize,
    },
    Code,
}

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*;(.*)$").expect("comment pattern"));
static BLOCK_SINGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*/\*\*?(.*?)\*/").expect("single-line block pattern"));
static BLOCK_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*/\*(\*?)(.*)$").expect("block open pattern"));
static BLOCK_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\*/").expect("block close pattern"));
static JAVADOC_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\*\s?").expect("javadoc prefix pattern"));
static INCLUDE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^\s*include\s+"([^"]+)""#).expect("include pattern"));
static MACRO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*macro\s+(!?)([a-z_][a-z0-9_#@]*)").expect("macro pattern"));
static EXPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:export|global)\s+(\S.*)$").expect("export pattern"));
static EXPORT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z_.][a-z0-9_#@.]*$").expect("export name pattern"));
static DEFINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(!?)([a-z_][a-z0-9_#@]*)\s+(?:equ|equs|set|rb|rw|rl)\s+")
        .expect("define pattern")
});
static LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(!?)((?:[A-Za-z_][A-Za-z_0-9#@]*)?\.[A-Za-z_0-9#@]+|[A-Za-z_][A-Za-z_0-9#@]*)(:{0,2})")
        .expect("label pattern")
});
static END_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^;]+;(.*)$").expect("trailing comment pattern"));

/// A decorative run like `-----` or `=====`: one character repeated at least
/// four times, optionally whitespace-padded. Never documentation content.
pub fn is_spacer(text: &str) -> bool {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    trimmed.chars().count() >= 4 && chars.all(|ch| ch == first)
}

/// The inline comment trailing a code line, if any.
pub fn trailing_comment(line: &str) -> Option<&str> {
    END_COMMENT_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Classifies one line, producing the construct present and the block-comment
/// state to carry into the next line.
pub fn classify_line(line: &str, state: BlockCommentState) -> (LineClass, BlockCommentState) {
    match state {
        BlockCommentState::Normal => classify_normal(line),
        BlockCommentState::InBlock | BlockCommentState::InJavaDoc => {
            classify_in_block(line, state)
        }
    }
}

fn classify_normal(line: &str) -> (LineClass, BlockCommentState) {
    if let Some(caps) = COMMENT_RE.captures(line) {
        return (
            LineClass::Comment {
                text: caps[1].to_string(),
            },
            BlockCommentState::Normal,
        );
    }
    if let Some(caps) = BLOCK_SINGLE_RE.captures(line) {
        return (
            LineClass::BlockCommentLine {
                text: caps[1].to_string(),
            },
            BlockCommentState::Normal,
        );
    }
    if let Some(caps) = BLOCK_OPEN_RE.captures(line) {
        let next = if caps[1].is_empty() {
            BlockCommentState::InBlock
        } else {
            BlockCommentState::InJavaDoc
        };
        return (
            LineClass::BlockCommentOpen {
                text: caps[2].to_string(),
            },
            next,
        );
    }
    if let Some(caps) = INCLUDE_RE.captures(line) {
        let name = caps.get(1).expect("include capture");
        return (
            LineClass::Include {
                raw: name.as_str().to_string(),
                name_start: name.start(),
                name_end: name.end(),
            },
            BlockCommentState::Normal,
        );
    }
    if let Some(caps) = MACRO_RE.captures(line) {
        let name = caps.get(2).expect("macro name capture");
        return (
            LineClass::MacroDef {
                name: name.as_str().to_string(),
                forced: !caps[1].is_empty(),
                name_start: name.start(),
                name_end: name.end(),
            },
            BlockCommentState::Normal,
        );
    }
    if let Some(caps) = EXPORT_RE.captures(line) {
        let list = strip_comment(&caps[1]);
        let names: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|name| EXPORT_NAME_RE.is_match(name))
            .map(str::to_string)
            .collect();
        if !names.is_empty() {
            return (LineClass::Export { names }, BlockCommentState::Normal);
        }
    }
    if let Some(caps) = DEFINE_RE.captures(line) {
        let name = caps.get(2).expect("define name capture");
        return (
            LineClass::Define {
                name: name.as_str().to_string(),
                forced: !caps[1].is_empty(),
                name_start: name.start(),
                name_end: name.end(),
            },
            BlockCommentState::Normal,
        );
    }
    if let Some(caps) = LABEL_RE.captures(line) {
        let name = caps.get(2).expect("label name capture");
        return (
            LineClass::Label {
                name: name.as_str().to_string(),
                terminator: caps[3].len(),
                forced: !caps[1].is_empty(),
                name_start: name.start(),
                name_end: name.end(),
            },
            BlockCommentState::Normal,
        );
    }
    (LineClass::Code, BlockCommentState::Normal)
}

fn classify_in_block(line: &str, state: BlockCommentState) -> (LineClass, BlockCommentState) {
    let strip = |text: &str| -> String {
        if state == BlockCommentState::InJavaDoc {
            JAVADOC_PREFIX_RE.replace(text, "").into_owned()
        } else {
            text.to_string()
        }
    };
    if let Some(caps) = BLOCK_CLOSE_RE.captures(line) {
        return (
            LineClass::BlockCommentClose {
                text: strip(&caps[1]),
            },
            BlockCommentState::Normal,
        );
    }
    (LineClass::BlockCommentBody { text: strip(line) }, state)
}

fn strip_comment(text: &str) -> &str {
    match text.find(';') {
        Some(pos) => &text[..pos],
        None => text,
    }
}
