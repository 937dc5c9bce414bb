//! Reboot command handler.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use fleetwatch_core::{ChangeEvent, Controller};

use crate::cli::{GlobalOpts, RebootArgs};
use crate::error::CliError;
use crate::output;

use super::{servers, services, util};

/// Slack on top of the configured reboot delay before giving up.
const COMPLETION_GRACE: Duration = Duration::from_secs(10);

fn spinner(global: &GlobalOpts, server: &str, delay: Duration) -> ProgressBar {
    if global.quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.set_message(format!(
        "Rebooting {server} (about {})",
        humantime::format_duration(delay)
    ));
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

pub async fn handle(
    controller: &Controller,
    args: RebootArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let server = args.server;
    if !util::confirm(
        &format!("Reboot {server}? All of its services will go offline."),
        "reboot",
        global.yes,
    )? {
        util::note("Aborted.", global);
        return Ok(());
    }

    // Subscribe first so the completion event cannot slip past.
    let mut events = controller.server_events(&server);
    let result = controller.reboot_server(&server, &global.actor).await?;

    if args.no_wait {
        let out = output::render_single(
            &global.output,
            &result,
            |r| services::describe(r, global),
            |r| services::describe(r, global),
        )?;
        output::print_output(&out, global.quiet);
        // The completion only lives in this process; drop it.
        controller.abort().await;
        return Ok(());
    }

    let delay = controller.config().reboot.delay;
    let bar = spinner(global, &server, delay);
    let wait = async {
        while let Some(event) = events.next_event().await {
            if let ChangeEvent::ServerRebootCompleted { .. } = event.as_ref() {
                return true;
            }
        }
        false
    };
    let completed = tokio::time::timeout(delay + COMPLETION_GRACE, wait)
        .await
        .unwrap_or(false);
    bar.finish_and_clear();

    if !completed {
        return Err(CliError::Internal(format!(
            "reboot of {server} did not report completion"
        )));
    }

    let after = controller.get_server(&server).await?;
    let out = output::render_single(
        &global.output,
        &after,
        |s| servers::detail(s, global),
        |s| s.overall_status().to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
