//! Config subcommand handlers.

use std::fmt::Write as _;

use secrecy::SecretString;

use fleetwatch_config::{Config, SourceKind};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` that is safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    if cfg.remote.password.is_some() {
        cfg.remote.password = Some(REDACTED.into());
    }
    cfg
}

/// Format config for display. Expects an already redacted config.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);

    let _ = writeln!(out, "\n[cache]");
    let _ = writeln!(out, "ttl_secs = {}", cfg.cache.ttl_secs);
    let _ = writeln!(out, "refresh_interval_secs = {}", cfg.cache.refresh_interval_secs);
    let _ = writeln!(out, "event_capacity = {}", cfg.cache.event_capacity);

    let _ = writeln!(out, "\n[simulation]");
    let _ = writeln!(out, "online_weight = {}", cfg.simulation.online_weight);
    let _ = writeln!(out, "warning_weight = {}", cfg.simulation.warning_weight);
    let _ = writeln!(out, "offline_weight = {}", cfg.simulation.offline_weight);
    if let Some(seed) = cfg.simulation.seed {
        let _ = writeln!(out, "seed = {seed}");
    }

    let _ = writeln!(out, "\n[reboot]");
    let _ = writeln!(out, "delay_secs = {}", cfg.reboot.delay_secs);
    let _ = writeln!(out, "online_weight = {}", cfg.reboot.online_weight);
    let _ = writeln!(out, "warning_weight = {}", cfg.reboot.warning_weight);

    let _ = writeln!(out, "\n[source]");
    let kind = match cfg.source.kind {
        SourceKind::Simulated => "simulated",
        SourceKind::Live => "live",
    };
    let _ = writeln!(out, "kind = \"{kind}\"");
    if let Some(ref path) = cfg.source.seed_file {
        let _ = writeln!(out, "seed_file = \"{}\"", path.display());
    }

    let _ = writeln!(out, "\n[remote]");
    let _ = writeln!(out, "program = \"{}\"", cfg.remote.program);
    let _ = writeln!(out, "args = {:?}", cfg.remote.args);
    let _ = writeln!(out, "timeout_secs = {}", cfg.remote.timeout_secs);
    if let Some(ref user) = cfg.remote.username {
        let _ = writeln!(out, "username = \"{user}\"");
    }
    if let Some(ref env) = cfg.remote.password_env {
        let _ = writeln!(out, "password_env = \"{env}\"");
    }
    if let Some(ref pw) = cfg.remote.password {
        let _ = writeln!(out, "password = \"{pw}\"");
    }

    out
}

/// Map an interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::unused_async)]
pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { force } => {
            let path = config::config_file(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            fleetwatch_config::save_config_to(&Config::default(), &path)?;
            util::note(&format!("Config written to {}", path.display()), global);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(&config::resolve(global)?);
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                config::config_file(global).display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(
                &config::config_file(global).display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::resolve(global)?;
            let password =
                rpassword::prompt_password("Remote password: ").map_err(prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            fleetwatch_config::store_remote_password(&cfg.remote, &SecretString::from(password))?;
            util::note("Remote password stored in system keyring", global);
            Ok(())
        }
    }
}
