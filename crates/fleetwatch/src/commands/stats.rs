//! Statistics command handler.

use fleetwatch_core::{Controller, FleetStats, Status};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(stats: &FleetStats, global: &GlobalOpts) -> String {
    [
        format!("Servers:      {}", stats.total_servers),
        format!("Services:     {}", stats.total_services),
        format!(
            "  {:<10} {}",
            util::status_label(Status::Online, global),
            stats.online_services
        ),
        format!(
            "  {:<10} {}",
            util::status_label(Status::Warning, global),
            stats.warning_services
        ),
        format!(
            "  {:<10} {}",
            util::status_label(Status::Offline, global),
            stats.offline_services
        ),
        format!("Uptime:       {:.2}%", stats.uptime_percentage),
        format!("Avg CPU:      {:.2}%", stats.avg_cpu_usage),
        format!("Avg Memory:   {:.2}%", stats.avg_memory_usage),
        format!("Avg Disk:     {:.2}%", stats.avg_disk_usage),
        format!("Generation:   {}", stats.generation),
        format!(
            "As of:        {}",
            stats.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    ]
    .join("\n")
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let stats = controller.stats().await?;
    let out = output::render_single(
        &global.output,
        &stats,
        |s| detail(s, global),
        |s| format!("{:.2}", s.uptime_percentage),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
