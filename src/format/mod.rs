//! Capitalization formatter driven by hierarchical token-family rules.
//!
//! Rule lookup walks a dotted path from most to least specific:
//! `language.instruction.set` falls back to `language.instruction`, then
//! `language`. Token families come from the declarative tables in
//! [`crate::syntax`].

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::CaseRule;
use crate::syntax::TOKEN_FAMILIES;

/// One single-line replacement. The replaced region starts at `column`
/// (1-indexed byte offset) and has the same byte length as `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub line: usize,
    pub column: usize,
    pub replacement: String,
}

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+").expect("whitespace pattern"));
static STRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"(?:\\.|[^"])*""#).expect("string pattern"));
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^;.*$").expect("comment pattern"));
static INSTRUCTION_SET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\s*)(set)\b").expect("instruction set pattern"));
static SET_EXPRESSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\s*[a-z_][a-z0-9_#@]*\s+)(set)\b").expect("set expression pattern")
});
static SET_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^set\b").expect("set token pattern"));
static C_CONDITION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(call|jp|jr|ret)(\s+)(c)\b").expect("c condition pattern"));
static BANK_SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(bank)\s*\[").expect("bank section pattern"));
static HEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\$[0-9a-f]+\b").expect("hex literal pattern"));
static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z_0-9#@]*:{0,2}").expect("identifier pattern"));

static FAMILY_MATCHERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    TOKEN_FAMILIES
        .iter()
        .map(|family| {
            let alternation = family.members.join("|");
            let pattern = format!(r"(?i)^({alternation})\b");
            (
                family.rule_path,
                Regex::new(&pattern).expect("family pattern"),
            )
        })
        .collect()
});

pub struct Formatter<'a> {
    rules: &'a BTreeMap<String, CaseRule>,
}

impl<'a> Formatter<'a> {
    pub fn new(rules: &'a BTreeMap<String, CaseRule>) -> Self {
        Self { rules }
    }

    /// The rule for a dotted path, falling back to parent paths.
    pub fn rule(&self, path: &str) -> Option<CaseRule> {
        let lower = path.to_ascii_lowercase();
        let mut components: Vec<&str> = lower.split('.').collect();
        while !components.is_empty() {
            if let Some(rule) = self.rules.get(&components.join(".")) {
                return Some(*rule);
            }
            components.pop();
        }
        None
    }

    pub fn format(&self, text: &str) -> Vec<TextEdit> {
        let mut edits = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            self.format_line(idx + 1, line, &mut edits);
        }
        edits
    }

    /// Formats the 1-indexed inclusive line range.
    pub fn format_range(&self, text: &str, start_line: usize, end_line: usize) -> Vec<TextEdit> {
        let mut edits = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            if line_no < start_line || line_no > end_line {
                continue;
            }
            self.format_line(line_no, line, &mut edits);
        }
        edits
    }

    fn format_line(&self, line_no: usize, line: &str, edits: &mut Vec<TextEdit>) {
        // `set` doubles as a mnemonic and an assignment operator; which rule
        // family applies depends on what precedes it on the line.
        if let Some(caps) = INSTRUCTION_SET_RE.captures(line) {
            let token = caps.get(2).expect("set capture");
            self.push_edit(
                edits,
                line_no,
                token.start(),
                token.as_str(),
                "language.instruction.set",
            );
        } else if let Some(caps) = SET_EXPRESSION_RE.captures(line) {
            let token = caps.get(2).expect("set capture");
            self.push_edit(
                edits,
                line_no,
                token.start(),
                token.as_str(),
                "language.keyword.preprocessor.set",
            );
        }

        let mut offset = 0;
        let mut rest = line;
        while !rest.is_empty() {
            if let Some(m) = WS_RE
                .find(rest)
                .or_else(|| STRING_RE.find(rest))
                .or_else(|| COMMENT_RE.find(rest))
            {
                offset += m.end();
                rest = &rest[m.end()..];
                continue;
            }
            if let Some(m) = SET_TOKEN_RE.find(rest) {
                offset += m.end();
                rest = &rest[m.end()..];
                continue;
            }
            if let Some(caps) = C_CONDITION_RE.captures(rest) {
                let mnemonic = caps.get(1).expect("mnemonic capture");
                let condition = caps.get(3).expect("condition capture");
                self.push_edit(
                    edits,
                    line_no,
                    offset + mnemonic.start(),
                    mnemonic.as_str(),
                    &format!("language.instruction.{}", mnemonic.as_str()),
                );
                self.push_edit(
                    edits,
                    line_no,
                    offset + condition.start(),
                    condition.as_str(),
                    "language.conditioncode.c",
                );
                let consumed = caps.get(0).expect("full match").end();
                offset += consumed;
                rest = &rest[consumed..];
                continue;
            }
            if let Some(caps) = BANK_SECTION_RE.captures(rest) {
                let token = caps.get(1).expect("bank capture");
                self.push_edit(
                    edits,
                    line_no,
                    offset + token.start(),
                    token.as_str(),
                    "language.keyword.sectiondeclaration.bank",
                );
                offset += token.end();
                rest = &rest[token.end()..];
                continue;
            }
            if let Some(consumed) = self.match_family(line_no, rest, offset, edits) {
                offset += consumed;
                rest = &rest[consumed..];
                continue;
            }
            if let Some(m) = HEX_RE.find(rest) {
                self.push_edit(edits, line_no, offset, m.as_str(), "language.hex");
                offset += m.end();
                rest = &rest[m.end()..];
                continue;
            }
            if let Some(m) = IDENT_RE.find(rest) {
                offset += m.end();
                rest = &rest[m.end()..];
                continue;
            }
            let step = rest.chars().next().map(char::len_utf8).unwrap_or(1);
            offset += step;
            rest = &rest[step..];
        }
    }

    fn match_family(
        &self,
        line_no: usize,
        rest: &str,
        offset: usize,
        edits: &mut Vec<TextEdit>,
    ) -> Option<usize> {
        for (rule_path, matcher) in FAMILY_MATCHERS.iter() {
            if let Some(m) = matcher.find(rest) {
                self.push_edit(
                    edits,
                    line_no,
                    offset,
                    m.as_str(),
                    &format!("{rule_path}.{}", m.as_str()),
                );
                return Some(m.end());
            }
        }
        None
    }

    fn push_edit(
        &self,
        edits: &mut Vec<TextEdit>,
        line_no: usize,
        column0: usize,
        token: &str,
        rule_path: &str,
    ) {
        let replacement = match self.rule(rule_path) {
            Some(CaseRule::Upper) => token.to_ascii_uppercase(),
            Some(CaseRule::Lower) => token.to_ascii_lowercase(),
            Some(CaseRule::Keep) | None => return,
        };
        if replacement != token {
            edits.push(TextEdit {
                line: line_no,
                column: column0 + 1,
                replacement,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(entries: &[(&str, CaseRule)]) -> BTreeMap<String, CaseRule> {
        entries
            .iter()
            .map(|(path, rule)| (path.to_string(), *rule))
            .collect()
    }

    #[test]
    fn rule_lookup_falls_back_to_parent_paths() {
        let rules = rules(&[
            ("language.instruction", CaseRule::Upper),
            ("language.instruction.set", CaseRule::Lower),
        ]);
        let formatter = Formatter::new(&rules);
        assert_eq!(formatter.rule("language.instruction.SET"), Some(CaseRule::Lower));
        assert_eq!(formatter.rule("language.instruction.ld"), Some(CaseRule::Upper));
        assert_eq!(formatter.rule("language.register.a"), None);
    }

    #[test]
    fn instructions_are_cased_per_rule() {
        let rules = rules(&[("language.instruction", CaseRule::Upper)]);
        let formatter = Formatter::new(&rules);
        let edits = formatter.format("  ld a, 5\n");
        assert_eq!(
            edits,
            vec![TextEdit {
                line: 1,
                column: 3,
                replacement: "LD".to_string()
            }]
        );
    }

    #[test]
    fn set_as_first_token_is_an_instruction() {
        let rules = rules(&[("language.instruction", CaseRule::Upper)]);
        let formatter = Formatter::new(&rules);
        let edits = formatter.format("  set 3, a\n");
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].replacement, "SET");
        assert_eq!(edits[0].column, 3);
    }

    #[test]
    fn set_after_a_name_is_an_assignment_operator() {
        let rules = rules(&[
            ("language.instruction", CaseRule::Upper),
            ("language.keyword.preprocessor", CaseRule::Lower),
        ]);
        let formatter = Formatter::new(&rules);
        let edits = formatter.format("Speed SET 3\n");
        assert_eq!(edits.len(), 1, "Only the operator itself is edited");
        assert_eq!(edits[0].replacement, "set");
    }

    #[test]
    fn strings_and_comments_are_left_alone() {
        let rules = rules(&[("language.instruction", CaseRule::Upper)]);
        let formatter = Formatter::new(&rules);
        assert!(formatter.format("  db \"ld a\" ; ld means load\n").is_empty());
    }

    #[test]
    fn condition_code_after_jump_gets_its_own_rule() {
        let rules = rules(&[
            ("language.instruction", CaseRule::Upper),
            ("language.conditioncode", CaseRule::Upper),
        ]);
        let formatter = Formatter::new(&rules);
        let edits = formatter.format("  jr c, .done\n");
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].replacement, "JR");
        assert_eq!(edits[1].replacement, "C");
    }

    #[test]
    fn keep_rule_overrides_an_inherited_family_rule() {
        let rules = rules(&[
            ("language.register", CaseRule::Upper),
            ("language.register.a", CaseRule::Keep),
        ]);
        let formatter = Formatter::new(&rules);
        let edits = formatter.format("  ld a, b\n");
        let replacements: Vec<&str> = edits.iter().map(|e| e.replacement.as_str()).collect();
        assert!(!replacements.contains(&"A"), "Keep must suppress the family rule");
        assert!(replacements.contains(&"B"));
    }

    #[test]
    fn hex_literals_use_the_hex_rule() {
        let rules = rules(&[("language.hex", CaseRule::Upper)]);
        let formatter = Formatter::new(&rules);
        let edits = formatter.format("  ld a, $ff\n");
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].replacement, "$FF");
    }

    #[test]
    fn range_formatting_only_touches_the_requested_lines() {
        let rules = rules(&[("language.instruction", CaseRule::Upper)]);
        let formatter = Formatter::new(&rules);
        let edits = formatter.format_range("  ld a, b\n  ld c, d\n  ld e, h\n", 2, 2);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].line, 2);
    }

    #[test]
    fn unmatched_identifiers_are_skipped_without_edits() {
        let rules = rules(&[("language", CaseRule::Upper)]);
        let formatter = Formatter::new(&rules);
        assert!(
            formatter.format("PlayerUpdate:\n").is_empty(),
            "User identifiers never receive case edits"
        );
    }
}
