//! Server command handlers.

use tabled::Tabled;

use fleetwatch_core::source::seed::save_seed;
use fleetwatch_core::{Controller, Server, ServerFilter, Service, Status};

use crate::cli::{GlobalOpts, ServersArgs, ServersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ServerRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Disk")]
    disk: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl ServerRow {
    fn new(s: &Server, global: &GlobalOpts) -> Self {
        let online = s.services().iter().filter(|svc| svc.status.is_online()).count();
        Self {
            name: s.name.clone(),
            ip: s.ip.clone(),
            kind: s.kind.to_string(),
            location: s.location.clone(),
            cpu: format!("{:.1}%", s.cpu_usage),
            memory: format!("{:.1}%", s.memory_usage),
            disk: format!("{:.1}%", s.disk_usage),
            uptime: format!("{:.1}d", s.uptime_days),
            online: format!("{online}/{}", s.services().len()),
            status: util::status_label(s.overall_status(), global),
        }
    }
}

#[derive(Tabled)]
pub(super) struct ServiceRow {
    #[tabled(rename = "Service")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl ServiceRow {
    pub(super) fn new(svc: &Service, global: &GlobalOpts) -> Self {
        Self {
            name: svc.name.clone(),
            status: util::status_label(svc.status, global),
            description: svc.description.clone(),
        }
    }
}

/// Multi-line detail view followed by the service table.
pub(super) fn detail(s: &Server, global: &GlobalOpts) -> String {
    let mut lines = vec![
        format!("Name:        {}", s.name),
        format!("IP:          {}", s.ip),
        format!("Type:        {}", s.kind),
        format!("OS:          {}", s.os),
        format!("Location:    {}", s.location),
        format!("Status:      {}", util::status_label(s.overall_status(), global)),
        format!("CPU:         {:.1}%", s.cpu_usage),
        format!("Memory:      {:.1}%", s.memory_usage),
        format!("Disk:        {:.1}%", s.disk_usage),
        format!("Uptime:      {:.1} days", s.uptime_days),
        format!(
            "Last reboot: {}",
            s.last_reboot
                .map_or_else(|| "-".into(), |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        ),
    ];
    if let Some(ref specs) = s.specs {
        if let Some(ref cpu) = specs.cpu {
            let cores = specs.cores.map(|c| format!(" ({c} cores)")).unwrap_or_default();
            lines.push(format!("Processor:   {cpu}{cores}"));
        }
        if let Some(ref ram) = specs.ram {
            lines.push(format!("RAM:         {ram}"));
        }
        if let Some(ref storage) = specs.storage {
            lines.push(format!("Storage:     {storage}"));
        }
    }
    lines.push(String::new());
    lines.push(output::render_table(
        &s.services()
            .iter()
            .map(|svc| ServiceRow::new(svc, global))
            .collect::<Vec<_>>(),
    ));
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: ServersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ServersCommand::List { search, status } => {
            let mut filter = ServerFilter::all();
            if let Some(term) = search {
                filter = filter.search(term);
            }
            if let Some(status) = status {
                filter = filter.status(util::status_of(status));
            }
            let servers = controller.list_servers(&filter).await?;
            let out = output::render_list(
                &global.output,
                &servers,
                |s| ServerRow::new(s, global),
                |s| s.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServersCommand::Get { name } => {
            let server = controller.get_server(&name).await?;
            let out = output::render_single(
                &global.output,
                &server,
                |s| detail(s, global),
                |s| {
                    s.services()
                        .iter()
                        .map(|svc| format!("{}\t{}", svc.name, svc.status))
                        .collect::<Vec<_>>()
                        .join("\n")
                },
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServersCommand::Export { path } => {
            let snapshot = controller.snapshot().await?;
            save_seed(&path, snapshot.servers())?;
            let offline = snapshot
                .servers()
                .iter()
                .filter(|s| s.has_status(Status::Offline))
                .count();
            util::note(
                &format!(
                    "Exported {} servers ({offline} with offline services) to {}",
                    snapshot.len(),
                    path.display()
                ),
                global,
            );
            Ok(())
        }
    }
}
