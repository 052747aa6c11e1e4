//! Configuration model for the supervised command set.
//!
//! A configuration is decoded from JSON or YAML by [`loader`], checked
//! statically with [`Config::validate`] and [`Config::validate_strict`], and
//! checked against the invocation directory with
//! [`Config::validate_at_runtime`]. Once valid it is resolved into
//! [`ResolvedCommand`]s so that nothing downstream re-derives defaults.

pub mod loader;
mod validate;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use loader::Format;
pub use validate::{ValidationError, ValidationErrors};

/// Prefix used for titles derived from the command name.
pub const DEFAULT_TITLE_PREFIX: &str = "→ ";

/// The configuration file structure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Commands to supervise, in declaration order.
    #[serde(default)]
    pub commands: Vec<Command>,
}

/// A single supervised command as written in the configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Unique identifier for the command.
    #[serde(default)]
    pub name: String,

    /// Program and arguments.
    #[serde(default)]
    pub command: Vec<String>,

    /// Display name in the sidebar.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Working directory, relative paths resolve against the invocation directory.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cwd: String,

    /// Extra environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Start immediately (default `true`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autostart: Option<bool>,

    /// Operator may kill and restart it (default `true`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killable: Option<bool>,
}

impl Command {
    /// The explicit title, or `"→ " + name` when none is set.
    #[must_use]
    pub fn title(&self) -> String {
        if self.title.is_empty() {
            format!("{DEFAULT_TITLE_PREFIX}{}", self.name)
        } else {
            self.title.clone()
        }
    }

    /// The working directory resolved against `base`.
    #[must_use]
    pub fn cwd(&self, base: &Path) -> PathBuf {
        if self.cwd.is_empty() {
            return base.to_path_buf();
        }
        let cwd = Path::new(&self.cwd);
        if cwd.is_absolute() {
            cwd.to_path_buf()
        } else {
            base.join(cwd)
        }
    }

    /// Whether the command starts as soon as it is added.
    #[must_use]
    pub fn is_autostart(&self) -> bool {
        self.autostart.unwrap_or(true)
    }

    /// Whether the operator may kill and restart the command.
    #[must_use]
    pub fn is_killable(&self) -> bool {
        self.killable.unwrap_or(true)
    }

    /// Quick structural check of a single command.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        match self.command.first() {
            None => Err(format!(
                "command '{}': command array cannot be empty",
                self.name
            )),
            Some(program) if program.is_empty() => Err(format!(
                "command '{}': first element of command array cannot be empty",
                self.name
            )),
            Some(_) => Ok(()),
        }
    }

    /// Fold defaults into a fully resolved command.
    #[must_use]
    pub fn resolve(&self, base: &Path) -> ResolvedCommand {
        ResolvedCommand {
            name: self.name.clone(),
            argv: self.command.clone(),
            title: self.title(),
            cwd: self.cwd(base),
            env: self.env.clone(),
            autostart: self.is_autostart(),
            killable: self.is_killable(),
        }
    }
}

impl Config {
    /// Quick structural check: at least one command, every command well formed,
    /// names unique. Pure function of the value.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commands.is_empty() {
            return Err(ValidationError::new(
                "commands",
                "configuration must contain at least one command",
            )
            .into());
        }

        let mut seen = std::collections::HashSet::new();
        for (i, command) in self.commands.iter().enumerate() {
            if let Err(message) = command.validate() {
                return Err(ValidationError::new(format!("commands[{i}]"), message).into());
            }
            if !seen.insert(command.name.as_str()) {
                return Err(ValidationError::new(
                    format!("commands[{i}].name"),
                    "duplicate command name",
                )
                .with_value(&command.name)
                .into());
            }
        }
        Ok(())
    }

    /// Resolve every command against the invocation directory.
    #[must_use]
    pub fn resolve(&self, base: &Path) -> Vec<ResolvedCommand> {
        self.commands.iter().map(|c| c.resolve(base)).collect()
    }
}

/// A command with every default applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Unique key.
    pub name: String,
    /// Program and arguments, never empty.
    pub argv: Vec<String>,
    /// Display title.
    pub title: String,
    /// Absolute or invocation-relative working directory.
    pub cwd: PathBuf,
    /// Extra environment variables.
    pub env: BTreeMap<String, String>,
    /// Start immediately.
    pub autostart: bool,
    /// Operator may kill and restart it.
    pub killable: bool,
}

/// Errors produced while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The source could not be read.
    #[error("failed to read config data: {0}")]
    Read(#[from] std::io::Error),

    /// The configuration file does not exist.
    #[error("config file '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    /// The source was empty.
    #[error("config data is empty")]
    Empty,

    /// The source could not be decoded.
    #[error("failed to parse {format} config: {message}")]
    Parse {
        /// Format that was attempted.
        format: Format,
        /// Decoder message.
        message: String,
    },

    /// Unknown format name or file extension.
    #[error("unsupported config format '{0}', supported formats: json, yaml, yml")]
    UnsupportedFormat(String),

    /// Validation failed.
    #[error("config validation failed: {0}")]
    Invalid(ValidationErrors),
}

impl From<ValidationError> for ConfigError {
    fn from(error: ValidationError) -> Self {
        Self::Invalid(ValidationErrors::from(vec![error]))
    }
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Invalid(errors)
    }
}
