//! CLI configuration: thin wrapper around `fleetwatch_config` shared types.
//!
//! Adds CLI-specific resolution that respects `GlobalOpts` flag overrides
//! (--config, --source, --seed-file, --seed).

use std::path::PathBuf;

use fleetwatch_config::{Config, SourceKind};

use crate::cli::{GlobalOpts, SourceArg};
use crate::error::CliError;

/// Config file in effect: `--config` / `FLEETWATCH_CONFIG`, else the
/// platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(fleetwatch_config::config_path)
}

/// Load file + env configuration, then apply CLI flag overrides.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = fleetwatch_config::load_config_from(&config_file(global))?;

    if let Some(source) = global.source {
        cfg.source.kind = match source {
            SourceArg::Simulated => SourceKind::Simulated,
            SourceArg::Live => SourceKind::Live,
        };
    }
    if let Some(ref path) = global.seed_file {
        cfg.source.seed_file = Some(path.clone());
    }
    if let Some(seed) = global.seed {
        cfg.simulation.seed = Some(seed);
    }
    Ok(cfg)
}
