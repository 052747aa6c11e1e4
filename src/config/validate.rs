//! Strict and runtime validation of a [`Config`].

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::{Command, Config};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("name pattern is a valid regex"));

/// A single validation problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// Path of the offending field, e.g. `commands[2].env`.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
    /// The offending value, when it helps.
    pub value: Option<String>,
}

impl ValidationError {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    #[must_use]
    pub(crate) fn with_value(mut self, value: impl fmt::Display) -> Self {
        self.value = Some(value.to_string());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(
                f,
                "field '{}': {} (value: {value})",
                self.field, self.message
            ),
            None => write!(f, "field '{}': {}", self.field, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Every problem found in one validation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Individual problems in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// True when nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("no validation errors");
        }
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl Config {
    /// Collect every static problem: name charset, empty command elements,
    /// malformed env keys, duplicate names and missing absolute directories.
    ///
    /// # Errors
    /// Returns all problems found.
    pub fn validate_strict(&self) -> Result<(), ValidationErrors> {
        if self.commands.is_empty() {
            return Err(vec![ValidationError::new(
                "commands",
                "must contain at least one command",
            )]
            .into());
        }

        let mut errors = Vec::new();
        let mut names: HashMap<&str, usize> = HashMap::new();

        for (i, command) in self.commands.iter().enumerate() {
            validate_command_strict(command, i, &mut errors);

            if command.name.is_empty() {
                continue;
            }
            if let Some(first) = names.get(command.name.as_str()) {
                errors.push(
                    ValidationError::new(
                        format!("commands[{i}].name"),
                        format!("duplicate command name, first occurrence at index {first}"),
                    )
                    .with_value(&command.name),
                );
            } else {
                names.insert(&command.name, i);
            }
        }

        ValidationErrors(errors).into_result()
    }

    /// Check that every resolved working directory exists and is a directory.
    ///
    /// # Errors
    /// Returns all directories that fail the check.
    pub fn validate_at_runtime(&self, base: &Path) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        for (i, command) in self.commands.iter().enumerate() {
            let field = format!("commands[{i}].cwd");
            let cwd = command.cwd(base);
            match std::fs::metadata(&cwd) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => errors.push(
                    ValidationError::new(field, "resolved path is not a directory")
                        .with_value(cwd.display()),
                ),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => errors.push(
                    ValidationError::new(field, "resolved directory does not exist")
                        .with_value(cwd.display()),
                ),
                Err(e) => errors.push(
                    ValidationError::new(
                        field,
                        format!("cannot access resolved directory: {e}"),
                    )
                    .with_value(cwd.display()),
                ),
            }
        }

        ValidationErrors(errors).into_result()
    }
}

fn validate_command_strict(command: &Command, index: usize, errors: &mut Vec<ValidationError>) {
    let prefix = format!("commands[{index}]");

    if command.name.is_empty() {
        errors.push(ValidationError::new(
            format!("{prefix}.name"),
            "cannot be empty",
        ));
    } else if !NAME_PATTERN.is_match(&command.name) {
        errors.push(
            ValidationError::new(
                format!("{prefix}.name"),
                "must contain only alphanumeric characters, underscores, and hyphens",
            )
            .with_value(&command.name),
        );
    }

    if command.command.is_empty() {
        errors.push(ValidationError::new(
            format!("{prefix}.command"),
            "cannot be empty",
        ));
    }
    for (i, part) in command.command.iter().enumerate() {
        if part.is_empty() {
            errors.push(ValidationError::new(
                format!("{prefix}.command[{i}]"),
                "cannot be empty string",
            ));
        }
    }

    if !command.cwd.is_empty() {
        if let Err(message) = check_absolute_dir(Path::new(&command.cwd)) {
            errors.push(
                ValidationError::new(format!("{prefix}.cwd"), message).with_value(&command.cwd),
            );
        }
    }

    // Empty values are allowed.
    for key in command.env.keys() {
        if key.is_empty() {
            errors.push(ValidationError::new(
                format!("{prefix}.env"),
                "environment variable key cannot be empty",
            ));
        }
        if key.contains('=') {
            errors.push(
                ValidationError::new(
                    format!("{prefix}.env"),
                    "environment variable key cannot contain '=' character",
                )
                .with_value(key),
            );
        }
    }
}

/// Relative paths are only checked at runtime, once the base is known.
fn check_absolute_dir(path: &Path) -> Result<(), String> {
    if !path.is_absolute() {
        return Ok(());
    }
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(format!("path is not a directory: {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("directory does not exist: {}", path.display()))
        }
        Err(e) => Err(format!("cannot access directory: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn command(name: &str, argv: &[&str]) -> Command {
        Command {
            name: name.to_string(),
            command: argv.iter().map(ToString::to_string).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn strict_accepts_valid_names() {
        let config = Config {
            commands: vec![
                command("web_server-1", &["npm", "start"]),
                command("API", &["cargo", "run"]),
            ],
        };
        assert!(config.validate_strict().is_ok());
    }

    #[test]
    fn strict_rejects_bad_name_charset() {
        let config = Config {
            commands: vec![command("web server", &["npm", "start"])],
        };
        let errors = config.validate_strict().unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.errors()[0].field, "commands[0].name");
        assert_eq!(errors.errors()[0].value.as_deref(), Some("web server"));
    }

    #[test]
    fn strict_collects_every_problem() {
        let mut bad_env = command("env", &["echo", ""]);
        bad_env.env = BTreeMap::from([
            (String::new(), "x".to_string()),
            ("A=B".to_string(), "y".to_string()),
        ]);
        let config = Config {
            commands: vec![command("", &[]), bad_env, command("env", &["true"])],
        };

        let errors = config.validate_strict().unwrap_err();
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "commands[0].name",
                "commands[0].command",
                "commands[1].command[1]",
                "commands[1].env",
                "commands[1].env",
                "commands[2].name",
            ]
        );
        assert!(errors.errors()[5]
            .message
            .contains("first occurrence at index 1"));
    }

    #[test]
    fn strict_checks_absolute_cwd_only() {
        let mut relative = command("rel", &["ls"]);
        relative.cwd = "does/not/exist".to_string();
        let mut absolute = command("abs", &["ls"]);
        absolute.cwd = "/definitely/not/a/real/dir".to_string();

        let config = Config {
            commands: vec![relative, absolute],
        };
        let errors = config.validate_strict().unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.errors()[0].field, "commands[1].cwd");
    }

    #[test]
    fn runtime_resolves_relative_directories() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir(base.path().join("frontend")).unwrap();
        std::fs::write(base.path().join("file.txt"), "x").unwrap();

        let mut ok = command("ok", &["ls"]);
        ok.cwd = "frontend".to_string();
        let mut missing = command("missing", &["ls"]);
        missing.cwd = "backend".to_string();
        let mut file = command("file", &["ls"]);
        file.cwd = "file.txt".to_string();

        let config = Config {
            commands: vec![ok, missing, file],
        };
        let errors = config.validate_at_runtime(base.path()).unwrap_err();
        let messages: Vec<_> = errors.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "resolved directory does not exist",
                "resolved path is not a directory"
            ]
        );
        assert_eq!(errors.errors()[0].field, "commands[1].cwd");
    }

    #[test]
    fn runtime_defaults_to_base() {
        let base = tempfile::tempdir().unwrap();
        let config = Config {
            commands: vec![command("ok", &["ls"])],
        };
        assert!(config.validate_at_runtime(base.path()).is_ok());
    }

    #[test]
    fn error_display_formats() {
        let plain = ValidationError::new("commands", "must contain at least one command");
        assert_eq!(
            plain.to_string(),
            "field 'commands': must contain at least one command"
        );

        let valued = ValidationError::new("commands[0].name", "bad").with_value("a b");
        let joined = ValidationErrors::from(vec![plain, valued]);
        assert_eq!(
            joined.to_string(),
            "field 'commands': must contain at least one command; \
             field 'commands[0].name': bad (value: a b)"
        );
        assert_eq!(
            ValidationErrors::default().to_string(),
            "no validation errors"
        );
    }
}
