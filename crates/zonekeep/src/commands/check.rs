//! `zonekeep check run`: one on-demand check against a zone file.
//!
//! The zone is served by an in-memory provider, imported into in-memory
//! storage, and checked through a scheduler built from the configuration.

use std::time::Duration;

use zonekeep_config::Config;
use zonekeep_core::model::normalize_subdomain;
use zonekeep_core::{
    CheckResult, CheckScope, CheckerOptions, ExecutionStatus, Identifier, ProviderConfig,
    Registries, Scheduler, Storage, Usecases,
};

use super::{memory_settings, read_zone_text};
use crate::cli::{CheckArgs, CheckCommand, CheckRunArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Slack on top of the check timeout before the CLI stops waiting.
const WAIT_SLACK: Duration = Duration::from_secs(5);

pub async fn handle(args: CheckArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        CheckCommand::Run(run) => run_check(run, config, global).await,
    }
}

/// Parse `key=value` pairs. Values that read as JSON keep their type.
fn parse_run_opts(pairs: &[String]) -> Result<CheckerOptions, CliError> {
    let mut opts = CheckerOptions::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(CliError::Validation {
                field: "--opt".into(),
                reason: format!("expected KEY=VALUE, got {pair:?}"),
            });
        };
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_owned()));
        opts.insert(key.trim().to_owned(), value);
    }
    Ok(opts)
}

async fn run_check(args: CheckRunArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let run_opts = parse_run_opts(&args.opts)?;
    let scheduler_config = config.to_scheduler_config()?;
    let wait = match &args.wait {
        Some(text) => humantime::parse_duration(text).map_err(|e| CliError::Validation {
            field: "--wait".into(),
            reason: e.to_string(),
        })?,
        None => scheduler_config.default_check_timeout + WAIT_SLACK,
    };

    let usecases = Usecases::new(
        Storage::in_memory(),
        Registries::builtin(),
        &scheduler_config,
        config.to_correction_options(),
    );
    // Verify the checker before doing any work.
    let checker = usecases.registries.checkers.get(&args.checker)?;

    let owner = Identifier::generate();
    let text = read_zone_text(&args.zone_file)?;
    let provider = usecases
        .providers
        .create(ProviderConfig::new(
            owner.clone(),
            "memory",
            memory_settings(&args.zone, &text),
        ))
        .await?;
    let domain = usecases
        .domains
        .create(&owner, &provider.id, &args.zone.origin)
        .await?;
    let zone = usecases.domains.import_zone(&owner, &domain.id).await?;

    let (scope, target) = match &args.subdomain {
        None => (CheckScope::Domain, domain.id.clone()),
        Some(sub) => {
            let sub = normalize_subdomain(sub);
            let service = zone
                .services
                .get(&sub)
                .and_then(|services| {
                    services.iter().find(|s| {
                        checker
                            .availability()
                            .accepts(CheckScope::Service, Some(&s.service_type))
                    })
                })
                .ok_or_else(|| CliError::NotFound {
                    message: format!("no service at {sub:?} that {} can check", args.checker),
                    hint: "Run: zonekeep import <file> --origin <origin> to list services".into(),
                })?;
            (CheckScope::Service, service.id.clone())
        }
    };

    let scheduler = Scheduler::new(scheduler_config, usecases.clone());
    scheduler.start().await;
    let outcome = execute(&scheduler, &args.checker, scope, &target, &owner, run_opts, wait).await;
    scheduler.close().await;
    let result = outcome?;

    if args.html {
        let html = usecases.results.html_report(&result)?;
        output::print_output(&html, global.quiet);
        return Ok(());
    }

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &result,
        |r| detail(r, color),
        |r| format!("{}\t{}", r.status, r.status_line),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn execute(
    scheduler: &Scheduler,
    checker: &str,
    scope: CheckScope,
    target: &Identifier,
    owner: &Identifier,
    run_opts: CheckerOptions,
    wait: Duration,
) -> Result<CheckResult, CliError> {
    let id = scheduler
        .trigger_on_demand_check(checker, scope, target, owner, run_opts)
        .await?;
    let execution = scheduler.wait_for_execution(&id, wait).await?;

    match (execution.status, execution.result_id) {
        (ExecutionStatus::Completed, Some(result_id)) => Ok(scheduler
            .usecases()
            .results
            .get(owner, scope, target, checker, &result_id)
            .await?),
        _ => {
            let error = execution.error.unwrap_or_default();
            if error == "timeout" {
                return Err(CliError::Timeout {
                    seconds: scheduler.config().default_check_timeout.as_secs(),
                });
            }
            Err(CliError::CheckFailed {
                checker: checker.to_owned(),
                error,
            })
        }
    }
}

fn detail(result: &CheckResult, color: bool) -> String {
    let report = serde_json::to_string_pretty(&result.report).unwrap_or_default();
    format!(
        "{}  {}\n\nChecker:   {}\nTarget:    {} {}\nDuration:  {}\nOptions:   {}\n\n{}",
        output::status_label(result.status, color),
        result.status_line,
        result.checker_name,
        result.check_type,
        result.target_id,
        humantime::format_duration(result.duration),
        serde_json::to_string(&result.options).unwrap_or_default(),
        report
    )
}
