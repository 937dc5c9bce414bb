// ── Remote command execution ──
//
// The live status source talks to machines through an opaque
// `RemoteExecutor`. Commands are expressed as typed primitives and
// rendered to PowerShell, the dialect of the Windows service manager
// the fleet runs on. `ProcessExecutor` is the stock implementation: it
// shells out to a configured program (pwsh, ssh, a wrapper script).

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::error::CoreError;

/// Placeholder substituted with the target address in executor arguments.
pub const ADDRESS_PLACEHOLDER: &str = "{address}";
/// Placeholder substituted with the rendered command in executor arguments.
pub const COMMAND_PLACEHOLDER: &str = "{command}";

/// Program used by [`ProcessExecutor::powershell`].
pub const POWERSHELL_PROGRAM: &str = "pwsh";

/// Arguments used by [`ProcessExecutor::powershell`].
pub fn powershell_args() -> Vec<String> {
    vec![
        "-NoLogo".into(),
        "-NoProfile".into(),
        "-NonInteractive".into(),
        "-Command".into(),
        format!(
            "Invoke-Command -ComputerName {ADDRESS_PLACEHOLDER} -ScriptBlock {{ {COMMAND_PLACEHOLDER} }}"
        ),
    ]
}

/// Primitive operations understood by a remote service manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// List services as JSON (`Name`, `DisplayName`, `Status`).
    QueryServices,
    /// Resource gauges and uptime as JSON.
    SystemInfo,
    StartService(String),
    StopService(String),
    RestartService(String),
    Reboot,
}

impl RemoteCommand {
    /// Render the command as a PowerShell script.
    pub fn script(&self) -> String {
        match self {
            Self::QueryServices => {
                "Get-Service | Select-Object -Property Name, DisplayName, Status | ConvertTo-Json -Depth 2"
                    .into()
            }
            Self::SystemInfo => concat!(
                "$os = Get-CimInstance Win32_OperatingSystem; ",
                "$cpu = (Get-CimInstance Win32_Processor | Measure-Object -Property LoadPercentage -Average).Average; ",
                "$disk = Get-CimInstance Win32_LogicalDisk -Filter \"DriveType=3\" | Measure-Object -Property Size, FreeSpace -Sum; ",
                "$size = ($disk | Where-Object Property -eq 'Size').Sum; ",
                "$free = ($disk | Where-Object Property -eq 'FreeSpace').Sum; ",
                "@{ OsName = $os.Caption; CpuLoad = $cpu; ",
                "MemoryPercent = [math]::Round((1 - $os.FreePhysicalMemory / $os.TotalVisibleMemorySize) * 100, 2); ",
                "DiskPercent = [math]::Round((1 - $free / $size) * 100, 2); ",
                "UptimeDays = [math]::Round(((Get-Date) - $os.LastBootUpTime).TotalDays, 1) } | ConvertTo-Json",
            )
            .into(),
            Self::StartService(name) => format!("Start-Service -Name {}", ps_quote(name)),
            Self::StopService(name) => format!("Stop-Service -Name {} -Force", ps_quote(name)),
            Self::RestartService(name) => {
                format!("Restart-Service -Name {} -Force", ps_quote(name))
            }
            Self::Reboot => "Restart-Computer -Force".into(),
        }
    }
}

/// Single-quote a PowerShell literal, doubling embedded quotes.
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Exit code plus captured output streams of a remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convert a non-zero exit into `OperationFailed`.
    pub fn into_result(self, address: &str) -> Result<Self, CoreError> {
        if self.success() {
            return Ok(self);
        }
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        Err(CoreError::OperationFailed {
            address: address.into(),
            message: format!("exit code {}: {detail}", self.exit_code),
        })
    }
}

/// Capability to run a command against a remote machine.
///
/// Implementations must honour `timeout`: a call never blocks longer
/// than that, and reports `CoreError::Timeout` when it is exceeded.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(
        &self,
        address: &str,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> Result<RemoteOutput, CoreError>;
}

/// Runs remote commands by spawning a local program.
///
/// Every argument has `{address}` and `{command}` replaced before the
/// spawn. Credentials are exported to the child as environment
/// variables rather than placed on the command line.
pub struct ProcessExecutor {
    program: String,
    args: Vec<String>,
    env: Vec<(String, SecretString)>,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
        }
    }

    /// PowerShell remoting through `Invoke-Command`.
    pub fn powershell() -> Self {
        Self::new(POWERSHELL_PROGRAM, powershell_args())
    }

    /// Export an environment variable to every spawned process.
    pub fn with_env(mut self, key: impl Into<String>, value: SecretString) -> Self {
        self.env.push((key.into(), value));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn render_args(&self, address: &str, script: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| substitute(arg, address, script))
            .collect()
    }
}

/// Expand both placeholders in one left-to-right pass, so substituted
/// text is never scanned again.
fn substitute(template: &str, address: &str, script: &str) -> String {
    let mut out = String::with_capacity(template.len() + address.len() + script.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(ADDRESS_PLACEHOLDER) {
            out.push_str(address);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(COMMAND_PLACEHOLDER) {
            out.push_str(script);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

#[async_trait]
impl RemoteExecutor for ProcessExecutor {
    async fn execute(
        &self,
        address: &str,
        command: &RemoteCommand,
        timeout: Duration,
    ) -> Result<RemoteOutput, CoreError> {
        let script = command.script();
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(self.render_args(address, &script))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.env {
            cmd.env(key, value.expose_secret());
        }

        debug!(program = %self.program, address, ?command, "spawning remote command");

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CoreError::OperationFailed {
                    address: address.into(),
                    message: format!("failed to spawn {}: {e}", self.program),
                });
            }
            Err(_) => {
                warn!(address, ?command, "remote command timed out");
                return Err(CoreError::Timeout {
                    address: address.into(),
                    timeout_secs: timeout.as_secs(),
                });
            }
        };

        Ok(RemoteOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
