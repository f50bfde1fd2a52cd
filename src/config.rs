//! Workspace configuration snapshot, deserialized from TOML.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::index::AsmError;

/// Include search directories: a single path or a list, normalized to a list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct IncludePaths(Vec<PathBuf>);

impl IncludePaths {
    pub fn as_slice(&self) -> &[PathBuf] {
        &self.0
    }
}

impl From<Vec<PathBuf>> for IncludePaths {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl From<OneOrMany> for IncludePaths {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(path) => Self(vec![path]),
            OneOrMany::Many(paths) => Self(paths),
        }
    }
}

/// Capitalization applied to a token family by the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseRule {
    Upper,
    Lower,
    /// Leaves tokens untouched; overrides an inherited family rule.
    Keep,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormattingConfig {
    /// Rule paths (`language.instruction`, `language.register.a`, ...) to
    /// their capitalization. Lookup falls back from the most specific path to
    /// its parents.
    pub capitalization: BTreeMap<String, CaseRule>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorkspaceConfig {
    pub include_paths: IncludePaths,
    pub preserve_doc_newlines: bool,
    pub tracked_extensions: Vec<String>,
    pub formatting: FormattingConfig,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            include_paths: IncludePaths::default(),
            preserve_doc_newlines: false,
            tracked_extensions: ["z80", "inc", "asm", "s", "sm83"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            formatting: FormattingConfig::default(),
        }
    }
}

impl WorkspaceConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads the workspace configuration file. A missing file is not an
    /// error; defaults apply.
    pub fn load(path: &Path) -> Result<Self, AsmError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|err| AsmError::Config {
            path: path.to_path_buf(),
            message: err.message().to_string(),
        })
    }

    /// Whether `path` has one of the tracked source extensions.
    pub fn is_tracked(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.tracked_extensions.iter().any(|tracked| tracked == &ext)
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_track_the_usual_assembly_extensions() {
        let config = WorkspaceConfig::default();
        assert!(config.is_tracked(Path::new("main.z80")));
        assert!(config.is_tracked(Path::new("HARDWARE.INC")));
        assert!(!config.is_tracked(Path::new("notes.md")));
        assert!(!config.is_tracked(Path::new("Makefile")));
    }

    #[test]
    fn include_paths_accept_a_single_string() {
        let config = WorkspaceConfig::from_toml_str(r#"include-paths = "lib""#).expect("parse");
        assert_eq!(config.include_paths.as_slice(), &[PathBuf::from("lib")]);
    }

    #[test]
    fn include_paths_accept_a_list() {
        let config =
            WorkspaceConfig::from_toml_str(r#"include-paths = ["lib", "/opt/sdk"]"#).expect("parse");
        assert_eq!(
            config.include_paths.as_slice(),
            &[PathBuf::from("lib"), PathBuf::from("/opt/sdk")]
        );
    }

    #[test]
    fn formatting_rules_deserialize_by_path() {
        let config = WorkspaceConfig::from_toml_str(
            "[formatting.capitalization]\n\"language.instruction\" = \"upper\"\n\"language.register\" = \"lower\"\n\"language.register.a\" = \"keep\"\n",
        )
        .expect("parse");
        assert_eq!(
            config.formatting.capitalization.get("language.instruction"),
            Some(&CaseRule::Upper)
        );
        assert_eq!(
            config.formatting.capitalization.get("language.register.a"),
            Some(&CaseRule::Keep)
        );
    }

    #[test]
    fn unknown_keys_fall_back_to_defaults() {
        let config = WorkspaceConfig::from_toml_str("").expect("parse");
        assert_eq!(config, WorkspaceConfig::default());
        assert!(!config.preserve_doc_newlines);
    }
}
