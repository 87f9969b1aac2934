mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zonekeep_config::{Config, LogFormat};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config errors surface from `run`; logging falls back to defaults.
    let log = zonekeep_config::load_config_from(cli.global.config.as_deref())
        .map(|c| c.log)
        .unwrap_or_default();
    init_tracing(cli.global.verbose, &log.level, log.format);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, configured: &str, format: LogFormat) {
    let filter = match verbosity {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands must work with a broken config file.
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "zonekeep", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let config: Config = zonekeep_config::load_config_from(cli.global.config.as_deref())?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &config, &cli.global).await
        }
    }
}
