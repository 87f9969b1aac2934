//! Config subcommand handlers.

use zonekeep_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = global.config.clone().unwrap_or_else(config::config_path);
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_from(Some(path.as_path()))?;
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => toml_text(&cfg)?,
                format => output::render_single(format, &cfg, |_| String::new(), |_| String::new())?,
            };
            output::print_output(&out, global.quiet);
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            let written = config::save_config(&Config::default(), Some(path.as_path()))?;
            output::print_output(
                &format!("Wrote default configuration to {}", written.display()),
                global.quiet,
            );
        }
    }
    Ok(())
}

fn toml_text(cfg: &Config) -> Result<String, CliError> {
    toml::to_string_pretty(cfg).map_err(|e| CliError::Config(e.into()))
}
