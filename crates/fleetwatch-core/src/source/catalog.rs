// ── Built-in fleet inventory ──

use crate::model::ServerKind;

/// Static description of a server: identity plus the services it runs.
/// Statuses and gauges are filled in by the source at produce time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTemplate {
    pub name: String,
    pub ip: String,
    pub kind: ServerKind,
    pub os: String,
    /// `(name, description)` pairs, in display order.
    pub services: Vec<(String, String)>,
}

impl ServerTemplate {
    pub fn new(name: &str, ip: &str, kind: ServerKind, os: &str) -> Self {
        let services = COMMON_SERVICES
            .iter()
            .chain(kind_services(kind))
            .map(|(n, d)| ((*n).to_owned(), (*d).to_owned()))
            .collect();
        Self {
            name: name.into(),
            ip: ip.into(),
            kind,
            os: os.into(),
            services,
        }
    }
}

const COMMON_SERVICES: &[(&str, &str)] = &[
    ("Voxco.InstallationService.exe", "Installation Service"),
    ("WindowsUpdateService", "Windows Update Service"),
    ("W3SVC", "IIS Web Server"),
];

fn kind_services(kind: ServerKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        ServerKind::Database => &[
            ("SQL Server", "SQL Database Engine"),
            ("SQLAgent", "SQL Server Agent"),
        ],
        ServerKind::Directory => &[
            ("VoxcoDirectoryService", "Directory Service"),
            ("ActiveDirectory", "Active Directory"),
        ],
        ServerKind::Admin => &[
            ("Voxco A4S Task Server", "A4S Task Service"),
            ("Voxco Email Server", "Email Service"),
            ("Voxco Integration Service", "Integration Service"),
            ("Voxco Task Server", "Task Service"),
        ],
        ServerKind::Application => &[
            ("ServNoServer", "ServNo Service"),
            ("ApplicationPool", "IIS Application Pool"),
        ],
        ServerKind::Cati => &[
            ("VoxcoBridgeService", "Bridge Service"),
            ("VoxcoCATIService", "CATI Service"),
        ],
        ServerKind::Reporting => &[
            ("VoxcoReportingService", "Reporting Service"),
            ("SQLReportingServices", "SQL Reporting Services"),
        ],
        ServerKind::Dialer => &[
            ("ProntoServer", "Pronto Dialer Service"),
            ("DialerManager", "Dialer Management Service"),
        ],
        ServerKind::Web
        | ServerKind::File
        | ServerKind::Mail
        | ServerKind::Proxy
        | ServerKind::General => &[],
    }
}

const WIN_2019: &str = "Windows Server 2019";
const WIN_2016: &str = "Windows Server 2016";

/// The ten-server fleet used when no seed inventory is configured.
pub fn default_inventory() -> Vec<ServerTemplate> {
    vec![
        ServerTemplate::new("VXSQL1", "172.16.1.150", ServerKind::Database, WIN_2019),
        ServerTemplate::new("VXDIRSRV", "172.16.1.151", ServerKind::Directory, WIN_2019),
        ServerTemplate::new("VXOADMIN", "172.16.1.160", ServerKind::Admin, WIN_2016),
        ServerTemplate::new("VXSERVNO", "172.16.1.27", ServerKind::Application, WIN_2016),
        ServerTemplate::new("VXCATI1", "172.16.1.156", ServerKind::Cati, WIN_2019),
        ServerTemplate::new("VXCATI2", "172.16.1.157", ServerKind::Cati, WIN_2019),
        ServerTemplate::new("VXREPORT", "172.16.1.153", ServerKind::Reporting, WIN_2016),
        ServerTemplate::new("VXDIAL1", "172.16.1.161", ServerKind::Dialer, WIN_2016),
        ServerTemplate::new("VXDIAL2", "172.16.1.162", ServerKind::Dialer, WIN_2016),
        ServerTemplate::new("VXDLR1", "172.16.1.163", ServerKind::Dialer, WIN_2016),
    ]
}
