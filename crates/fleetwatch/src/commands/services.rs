//! Service command handlers.

use fleetwatch_core::{CommandResult, Controller};

use crate::cli::{GlobalOpts, ServicesArgs, ServicesCommand};
use crate::error::CliError;
use crate::output;

use super::servers::ServiceRow;
use super::util;

/// One-line summary of a command outcome.
pub(super) fn describe(result: &CommandResult, global: &GlobalOpts) -> String {
    match result {
        CommandResult::Changed {
            server,
            service,
            old,
            new,
        } => format!(
            "{server}/{service}: {} -> {}",
            util::status_label(*old, global),
            util::status_label(*new, global)
        ),
        CommandResult::Unchanged {
            server,
            service,
            status,
        } => format!(
            "{server}/{service}: already {}",
            util::status_label(*status, global)
        ),
        CommandResult::RebootScheduled {
            server,
            completes_at,
        } => format!(
            "{server}: reboot scheduled, back at {}",
            completes_at.format("%H:%M:%S UTC")
        ),
    }
}

pub async fn handle(
    controller: &Controller,
    args: ServicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let actor = global.actor.as_str();
    let result = match args.command {
        ServicesCommand::List { server } => {
            let server = controller.get_server(&server).await?;
            let out = output::render_list(
                &global.output,
                server.services(),
                |svc| ServiceRow::new(svc, global),
                |svc| svc.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            return Ok(());
        }
        ServicesCommand::Start(t) => controller.start_service(&t.server, &t.service, actor).await?,
        ServicesCommand::Stop(t) => controller.stop_service(&t.server, &t.service, actor).await?,
        ServicesCommand::Restart(t) => {
            controller
                .restart_service(&t.server, &t.service, actor)
                .await?
        }
    };

    let out = output::render_single(
        &global.output,
        &result,
        |r| describe(r, global),
        |r| describe(r, global),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
