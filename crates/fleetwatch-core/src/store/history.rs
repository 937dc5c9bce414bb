// ── Per-server status history ──
//
// Last known status of every server/service pair, used to turn a whole
// replacement snapshot into individual change events.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{ChangeEvent, Server, Status};

#[derive(Debug, Default)]
pub(crate) struct History {
    servers: HashMap<String, HashMap<String, Status>>,
}

impl History {
    /// Events for every service whose status differs from the recorded one.
    ///
    /// Only pairs present on both sides are compared: a server or service
    /// appearing or disappearing yields nothing.
    pub(crate) fn diff(&self, servers: &[Server], actor: &str, at: DateTime<Utc>) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        for server in servers {
            let Some(previous) = self.servers.get(&server.name) else {
                continue;
            };
            for svc in server.services() {
                let Some(&old) = previous.get(&svc.name) else {
                    continue;
                };
                if old != svc.status {
                    events.push(ChangeEvent::ServiceStatusChanged {
                        server: server.name.clone(),
                        service: svc.name.clone(),
                        old,
                        new: svc.status,
                        actor: actor.to_owned(),
                        at,
                    });
                }
            }
        }
        events
    }

    /// Overwrite the history with `servers`. Servers no longer present are
    /// forgotten.
    pub(crate) fn record(&mut self, servers: &[Server]) {
        self.servers = servers
            .iter()
            .map(|server| {
                let statuses = server
                    .services()
                    .iter()
                    .map(|s| (s.name.clone(), s.status))
                    .collect();
                (server.name.clone(), statuses)
            })
            .collect();
    }

    #[cfg(test)]
    pub(crate) fn status_of(&self, server: &str, service: &str) -> Option<Status> {
        self.servers.get(server)?.get(service).copied()
    }
}
