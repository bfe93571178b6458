//! `.docscrub.toml` configuration files
//!
//! Precedence order (highest to lowest):
//! 1. Command-line arguments
//! 2. Project config (./.docscrub.toml), or the file given with `--config`
//! 3. User config (~/.docscrub.toml)
//! 4. Built-in defaults

use anyhow::{Context, Result};
use colored::Colorize;
use docscrub_core::{MetadataEdit, Replacement};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".docscrub.toml";

pub const DEFAULT_CONFIG: &str = r#"# docscrub configuration file

# Defaults for the metadata command
[metadata]
# One value written into every field
# value = "Legal Department"

# Per-field values (override `value`)
# author = "Legal Department"
# last_modified_by = "Legal Department"
# producer = "Legal Department"
# creator = "Legal Department"

# Defaults for the replace command
[replace]
# Literal rules, applied in order
# rules = [
#   { find = "Acme Corp", replace = "Initech" },
# ]

# Title rule
# title = { find = "Draft", replace = "Final" }

# author = "Legal Department"
# last_modified_by = "Legal Department"

# Legacy .doc conversion
[convert]
# Office suite executable
# office_binary = "libreoffice"

# Convert .doc files during the metadata command
# enabled = true

# Run logs
[journal]
# Directory for the two log files (default: current directory)
# directory = "."
# modified_log = "modified_files_log.txt"
# error_log = "error_files_log.txt"
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace: Option<ReplaceConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert: Option<ConvertConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<JournalConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Value for every field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
}

/// A find/replace pair as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleConfig {
    pub find: String,
    pub replace: String,
}

impl RuleConfig {
    pub fn to_replacement(&self) -> Result<Replacement> {
        Replacement::new(self.find.as_str(), self.replace.as_str())
            .with_context(|| format!("Invalid rule in config: {:?}", self.find))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,

    // Tables go after plain values in TOML output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<RuleConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RuleConfig>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_binary: Option<String>,

    /// Convert .doc files during the metadata command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_log: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_log: Option<String>,
}

impl MetadataConfig {
    /// `top` wins field by field once each layer's `value` is expanded
    /// into the fields that layer leaves unset
    fn overlay(self, top: Self) -> Self {
        let base = self.resolved();
        let top = top.resolved();
        Self {
            value: top.value.or(base.value),
            author: top.author.or(base.author),
            last_modified_by: top.last_modified_by.or(base.last_modified_by),
            producer: top.producer.or(base.producer),
            creator: top.creator.or(base.creator),
        }
    }

    fn resolved(self) -> Self {
        let value = self.value;
        let fill = |field: Option<String>| field.or_else(|| value.clone());
        Self {
            author: fill(self.author),
            last_modified_by: fill(self.last_modified_by),
            producer: fill(self.producer),
            creator: fill(self.creator),
            value,
        }
    }

    /// Fields resolved from `value` and the per-field entries
    pub fn to_edit(&self) -> MetadataEdit {
        let mut edit = self
            .value
            .clone()
            .map(MetadataEdit::uniform)
            .unwrap_or_default();
        apply_fields(
            &mut edit,
            self.author.clone(),
            self.last_modified_by.clone(),
            self.producer.clone(),
            self.creator.clone(),
        );
        edit
    }
}

impl ReplaceConfig {
    fn overlay(self, top: Self) -> Self {
        Self {
            author: top.author.or(self.author),
            last_modified_by: top.last_modified_by.or(self.last_modified_by),
            title: top.title.or(self.title),
            rules: top.rules.or(self.rules),
        }
    }
}

impl ConvertConfig {
    fn overlay(self, top: Self) -> Self {
        Self {
            office_binary: top.office_binary.or(self.office_binary),
            enabled: top.enabled.or(self.enabled),
        }
    }
}

impl JournalConfig {
    fn overlay(self, top: Self) -> Self {
        Self {
            directory: top.directory.or(self.directory),
            modified_log: top.modified_log.or(self.modified_log),
            error_log: top.error_log.or(self.error_log),
        }
    }
}

/// Overwrite the fields of `edit` that have a value
pub fn apply_fields(
    edit: &mut MetadataEdit,
    author: Option<String>,
    last_modified_by: Option<String>,
    producer: Option<String>,
    creator: Option<String>,
) {
    if author.is_some() {
        edit.author = author;
    }
    if last_modified_by.is_some() {
        edit.last_modified_by = last_modified_by;
    }
    if producer.is_some() {
        edit.producer = producer;
    }
    if creator.is_some() {
        edit.creator = creator;
    }
}

fn overlay_section<T>(base: Option<T>, top: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (base, top) {
        (Some(base), Some(top)) => Some(merge(base, top)),
        (base, None) => base,
        (None, top) => top,
    }
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Effective configuration: user config overlaid with the project config,
    /// or with `explicit` when given
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user = Self::load_user_config();
        let project = match explicit {
            Some(path) => Some(Self::load_from_file(path)?),
            None => Self::load_project_config(),
        };
        Ok(Self::merge(user, project))
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    fn load_user_config() -> Option<Self> {
        Self::user_config_path().and_then(|path| Self::load_if_present(&path, "user"))
    }

    fn load_project_config() -> Option<Self> {
        Self::load_if_present(&Self::project_config_path(), "project")
    }

    /// A discovered file that fails to parse is reported and skipped
    fn load_if_present(path: &Path, kind: &str) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!(
                    "{} Failed to load {kind} config from {}: {e:#}",
                    "Warning:".yellow().bold(),
                    path.display()
                );
                None
            }
        }
    }

    /// Merge configs with precedence: project over user over defaults
    pub fn merge(user_config: Option<Self>, project_config: Option<Self>) -> Self {
        let user = user_config.unwrap_or_default();
        let project = project_config.unwrap_or_default();
        Self {
            metadata: overlay_section(user.metadata, project.metadata, MetadataConfig::overlay),
            replace: overlay_section(user.replace, project.replace, ReplaceConfig::overlay),
            convert: overlay_section(user.convert, project.convert, ConvertConfig::overlay),
            journal: overlay_section(user.journal, project.journal, JournalConfig::overlay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.metadata, Some(MetadataConfig::default()));
        assert_eq!(config.journal, Some(JournalConfig::default()));
    }

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [metadata]
            value = "Legal"
            producer = "Scrub"

            [replace]
            rules = [{ find = "Acme", replace = "Initech" }, { find = "2023", replace = "2024" }]
            title = { find = "Draft", replace = "Final" }

            [convert]
            office_binary = "/opt/lo/soffice"
            enabled = false

            [journal]
            directory = "logs"
            "#,
        )
        .unwrap();

        let edit = config.metadata.as_ref().unwrap().to_edit();
        assert_eq!(edit.author.as_deref(), Some("Legal"));
        assert_eq!(edit.producer.as_deref(), Some("Scrub"));

        let replace = config.replace.unwrap();
        let rules = replace.rules.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].to_replacement().unwrap().replace(), "2024");
        assert_eq!(replace.title.unwrap().find, "Draft");
        assert_eq!(config.convert.unwrap().enabled, Some(false));
        assert_eq!(
            config.journal.unwrap().directory,
            Some(PathBuf::from("logs"))
        );
    }

    #[test]
    fn test_empty_rule_rejected() {
        let rule = RuleConfig {
            find: String::new(),
            replace: "x".to_string(),
        };
        assert!(rule.to_replacement().is_err());
    }

    #[test]
    fn test_merge_project_overrides_user_per_field() {
        let user = Config {
            metadata: Some(MetadataConfig {
                author: Some("user-author".to_string()),
                producer: Some("user-producer".to_string()),
                ..MetadataConfig::default()
            }),
            convert: Some(ConvertConfig {
                office_binary: Some("soffice".to_string()),
                enabled: None,
            }),
            ..Config::default()
        };
        let project = Config {
            metadata: Some(MetadataConfig {
                author: Some("project-author".to_string()),
                ..MetadataConfig::default()
            }),
            ..Config::default()
        };

        let merged = Config::merge(Some(user), Some(project));
        let metadata = merged.metadata.unwrap();
        assert_eq!(metadata.author.as_deref(), Some("project-author"));
        assert_eq!(metadata.producer.as_deref(), Some("user-producer"));
        assert_eq!(
            merged.convert.unwrap().office_binary.as_deref(),
            Some("soffice")
        );
        assert!(merged.replace.is_none());
    }

    #[test]
    fn test_project_value_beats_user_fields() {
        let user = Config {
            metadata: Some(MetadataConfig {
                author: Some("user-author".to_string()),
                ..MetadataConfig::default()
            }),
            ..Config::default()
        };
        let project = Config {
            metadata: Some(MetadataConfig {
                value: Some("project-value".to_string()),
                ..MetadataConfig::default()
            }),
            ..Config::default()
        };

        let edit = Config::merge(Some(user), Some(project))
            .metadata
            .unwrap()
            .to_edit();
        assert_eq!(edit, MetadataEdit::uniform("project-value"));
    }

    #[test]
    fn test_user_value_fills_fields_project_leaves_unset() {
        let user = Config {
            metadata: Some(MetadataConfig {
                value: Some("user-value".to_string()),
                ..MetadataConfig::default()
            }),
            ..Config::default()
        };
        let project = Config {
            metadata: Some(MetadataConfig {
                producer: Some("project-producer".to_string()),
                ..MetadataConfig::default()
            }),
            ..Config::default()
        };

        let edit = Config::merge(Some(user), Some(project))
            .metadata
            .unwrap()
            .to_edit();
        assert_eq!(edit.author.as_deref(), Some("user-value"));
        assert_eq!(edit.producer.as_deref(), Some("project-producer"));
    }

    #[test]
    fn test_merge_none() {
        assert_eq!(Config::merge(None, None), Config::default());
    }

    #[test]
    fn test_load_explicit_file_errors_are_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[metadata\nvalue = 1").unwrap();
        assert!(Config::load_from_file(&path).is_err());
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config {
            replace: Some(ReplaceConfig {
                rules: Some(vec![RuleConfig {
                    find: "a".to_string(),
                    replace: "b".to_string(),
                }]),
                author: Some("x".to_string()),
                ..ReplaceConfig::default()
            }),
            ..Config::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_field_values_override_uniform_value() {
        let config = MetadataConfig {
            value: Some("all".to_string()),
            creator: Some("tool".to_string()),
            ..MetadataConfig::default()
        };
        let edit = config.to_edit();
        assert_eq!(edit.author.as_deref(), Some("all"));
        assert_eq!(edit.creator.as_deref(), Some("tool"));
    }
}
