//! `watch`: stream change events until interrupted.

use fleetwatch_core::{ChangeEvent, Controller};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

fn line(event: &ChangeEvent, global: &GlobalOpts) -> String {
    let at = event.at().format("%H:%M:%S");
    match event {
        ChangeEvent::ServiceStatusChanged {
            server,
            service,
            old,
            new,
            actor,
            ..
        } => format!(
            "{at} {server}/{service} {} -> {} (by {actor})",
            util::status_label(*old, global),
            util::status_label(*new, global)
        ),
        ChangeEvent::ServerRebootStarted { server, actor, .. } => {
            format!("{at} {server} reboot started (by {actor})")
        }
        ChangeEvent::ServerRebootCompleted { server, .. } => {
            format!("{at} {server} reboot completed")
        }
        ChangeEvent::FleetRefreshed {
            generation,
            servers,
            ..
        } => format!("{at} fleet refreshed: generation {generation}, {servers} servers"),
        ChangeEvent::LoginAttempt { user, success, .. } => {
            let outcome = if *success { "succeeded" } else { "failed" };
            format!("{at} login {outcome} for {user}")
        }
    }
}

/// One record per event: JSON lines for json formats, YAML documents
/// for yaml, text otherwise.
fn render(event: &ChangeEvent, global: &GlobalOpts) -> Result<String, CliError> {
    match global.output {
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(event),
        OutputFormat::Yaml => Ok(format!("---\n{}", output::render_yaml(event)?)),
        OutputFormat::Table | OutputFormat::Plain => Ok(line(event, global)),
    }
}

pub async fn handle(
    controller: &Controller,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut events = match args.server {
        Some(ref name) => {
            controller.get_server(name).await?;
            controller.server_events(name)
        }
        None => controller.events(),
    };

    let interval = controller.config().refresh_interval;
    if interval.is_zero() {
        util::note("Refresh is disabled; only local changes will appear.", global);
    } else {
        util::note(
            &format!(
                "Watching (refresh every {}). Press Ctrl-C to stop.",
                humantime::format_duration(interval)
            ),
            global,
        );
    }

    let mut seen = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.next_event() => {
                let Some(event) = event else { break };
                output::print_output(&render(&event, global)?, global.quiet);
                seen += 1;
                if args.count.is_some_and(|n| seen >= n) {
                    break;
                }
            }
        }
    }
    Ok(())
}
