//! Command handlers.
//!
//! Every command works offline: zone files stand in for the live zone,
//! served through the in-memory provider.

pub mod apply;
pub mod check;
pub mod checkers;
pub mod config_cmd;
pub mod diff;
pub mod import;

use std::path::Path;

use serde_json::json;

use zonekeep_config::Config;
use zonekeep_core::zonefile::parse_zone;
use zonekeep_core::{GuardedProvider, Identifier, ProviderConfig, ProviderRegistry, Record};

use crate::cli::{Command, GlobalOpts, ZoneSource};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Diff(args) => diff::handle(args, config, global).await,
        Command::Apply(args) => apply::handle(args, config, global).await,
        Command::Import(args) => import::handle(&args, global),
        Command::Check(args) => check::handle(args, config, global).await,
        Command::Checkers(args) => checkers::handle(args, global),
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

pub(crate) fn read_zone_text(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::ZoneFile {
        path: path.display().to_string(),
        source,
    })
}

/// Parse a zone file relative to `zone.origin`.
pub(crate) fn read_zone(path: &Path, zone: &ZoneSource) -> Result<Vec<Record>, CliError> {
    let text = read_zone_text(path)?;
    Ok(parse_zone(&text, Some(&zone.origin), zone.default_ttl)?)
}

/// Provider settings serving `text` as the zone of `zone.origin`.
pub(crate) fn memory_settings(zone: &ZoneSource, text: &str) -> serde_json::Value {
    let mut zones = serde_json::Map::new();
    zones.insert(zone.origin.clone(), text.into());
    json!({
        "zones": zones,
        "default_ttl": zone.default_ttl,
    })
}

/// An in-memory provider serving `text` as the live zone.
pub(crate) fn memory_provider(zone: &ZoneSource, text: &str) -> Result<GuardedProvider, CliError> {
    let config = ProviderConfig::new(Identifier::generate(), "memory", memory_settings(zone, text));
    Ok(ProviderRegistry::with_builtin().instantiate(&config)?)
}
