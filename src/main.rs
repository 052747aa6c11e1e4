use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory, Parser};

use muxpit::cli::{commands_from_flags, Cli, InputMethod};
use muxpit::config::loader;
use muxpit::config::ConfigError;
use muxpit::{logging, Error, ProcessRequest, Result, Supervisor};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if let Err(print_error) = e.print() {
                eprintln!("error: {print_error}");
                return ExitCode::FAILURE;
            }
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if matches!(e, Error::Usage(_)) {
                eprintln!("{}", Cli::command().render_usage());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    logging::init(cli.log_file.as_deref()).map_err(Error::Io)?;

    // The screen belongs to the UI; panics go to the log instead of stderr.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {}", info);
    }));

    let requests = load_requests(cli)?;
    tracing::info!("starting with {} process(es)", requests.len());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(Error::Io)?;

    let result = runtime.block_on(async {
        let supervisor = Supervisor::new()?;
        for request in requests {
            supervisor.add_process(request)?;
        }
        supervisor.run().await
    });

    // The input poller may still be parked in a blocking read.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

fn load_requests(cli: &Cli) -> Result<Vec<ProcessRequest>> {
    let base = std::env::current_dir().map_err(Error::Io)?;

    let config = match cli.input_method()? {
        InputMethod::Commands(commands) => return Ok(commands_from_flags(&commands, &base)),
        InputMethod::ConfigFile(path) => loader::load_from_file(&path)?,
        InputMethod::Stdin(format) => loader::load_from_stdin(format)?,
    };

    config
        .validate_at_runtime(&base)
        .map_err(ConfigError::from)?;

    Ok(config
        .resolve(&base)
        .into_iter()
        .map(ProcessRequest::from)
        .collect())
}
