//! Command-line surface.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::Format;
use crate::error::{Error, Result};
use crate::event::ProcessRequest;

/// Icon shown next to panes started with `--cmd`.
pub const COMMAND_ICON: &str = "→";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "muxpit")]
#[command(version)]
#[command(about = "Run a set of processes side by side in one terminal", long_about = None)]
pub struct Cli {
    /// Command to run, split on whitespace. May be repeated.
    #[arg(long = "cmd", value_name = "CMD")]
    pub commands: Vec<String>,

    /// Configuration file (.json, .yaml or .yml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Read the configuration from standard input.
    #[arg(long, default_value_t = false)]
    pub stdin: bool,

    /// Format of the configuration read from standard input (json or yaml).
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Write logs to this file.
    #[arg(long, env = "MUXPIT_LOG", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Where the processes to supervise come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputMethod {
    /// `--cmd` flags, in order.
    Commands(Vec<String>),
    /// `--config` file.
    ConfigFile(PathBuf),
    /// `--stdin`, in the given format.
    Stdin(Format),
}

impl Cli {
    /// Resolve the one input method the flags select.
    ///
    /// # Errors
    /// Returns [`Error::Usage`] when none or several methods are given, when
    /// the config file does not exist, or when `--format` is misused.
    pub fn input_method(&self) -> Result<InputMethod> {
        let chosen = usize::from(!self.commands.is_empty())
            + usize::from(self.config.is_some())
            + usize::from(self.stdin);
        match chosen {
            0 => {
                return Err(Error::Usage(
                    "one of --cmd, --config or --stdin is required".to_string(),
                ))
            }
            1 => {}
            _ => {
                return Err(Error::Usage(
                    "--cmd, --config and --stdin are mutually exclusive".to_string(),
                ))
            }
        }

        if self.format.is_some() && !self.stdin {
            return Err(Error::Usage(
                "--format can only be used with --stdin".to_string(),
            ));
        }

        if self.stdin {
            let format = match self.format.as_deref() {
                None | Some("json") => Format::Json,
                Some("yaml") => Format::Yaml,
                Some(other) => {
                    return Err(Error::Usage(format!(
                        "invalid --format '{other}': expected json or yaml"
                    )))
                }
            };
            return Ok(InputMethod::Stdin(format));
        }

        if let Some(path) = &self.config {
            if !path.exists() {
                return Err(Error::Usage(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(InputMethod::ConfigFile(path.clone()));
        }

        Ok(InputMethod::Commands(self.commands.clone()))
    }
}

/// Turn `--cmd` strings into process requests keyed `cmd1`, `cmd2`, ...
///
/// Blank commands are skipped but keep their number.
#[must_use]
pub fn commands_from_flags(commands: &[String], cwd: &Path) -> Vec<ProcessRequest> {
    commands
        .iter()
        .enumerate()
        .filter_map(|(i, command)| {
            let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
            let title = argv.first()?.clone();
            Some(
                ProcessRequest::new(format!("cmd{}", i + 1), argv)
                    .title(title)
                    .icon(COMMAND_ICON)
                    .cwd(cwd),
            )
        })
        .collect()
}
