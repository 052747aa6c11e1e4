//! Decoding configuration from files, stdin or any reader.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use super::{Config, ConfigError};

/// Supported configuration encodings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// JSON, the default.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

impl Format {
    /// Pick a format from a file extension, with or without the leading dot.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnsupportedFormat`] for unknown extensions.
    pub fn from_extension(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().trim_start_matches('.') {
            "" | "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("JSON"),
            Self::Yaml => f.write_str("YAML"),
        }
    }
}

/// Load and validate a configuration file; the format follows the extension.
///
/// # Errors
/// Returns an error if the file is missing or unreadable, cannot be decoded,
/// or fails static validation.
pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let format = Format::from_extension(path)?;
    let file = std::fs::File::open(path)?;
    tracing::debug!(path = %path.display(), %format, "loading config file");
    load_from_reader(file, format)
}

/// Load and validate a configuration from standard input.
///
/// # Errors
/// Same as [`load_from_reader`].
pub fn load_from_stdin(format: Format) -> Result<Config, ConfigError> {
    load_from_reader(std::io::stdin().lock(), format)
}

/// Read everything from `reader`, decode it, and run static validation.
///
/// # Errors
/// Returns an error if reading fails, the input is empty, decoding fails,
/// or validation fails.
pub fn load_from_reader(mut reader: impl Read, format: Format) -> Result<Config, ConfigError> {
    let mut data = String::new();
    reader.read_to_string(&mut data)?;
    if data.trim().is_empty() {
        return Err(ConfigError::Empty);
    }

    let config: Config = match format {
        Format::Json => serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
            format,
            message: e.to_string(),
        })?,
        Format::Yaml => serde_yaml::from_str(&data).map_err(|e| ConfigError::Parse {
            format,
            message: e.to_string(),
        })?,
    };

    config.validate()?;
    config.validate_strict()?;
    Ok(config)
}
