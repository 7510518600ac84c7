//! remote command documents for operating the agent in place
//!
//! typed structures serialized to JSON only at the boundary, consumed by
//! the pull-based command transport. both documents go through the same
//! script boilerplate as the installer.

use serde::Serialize;

use crate::error::Result;
use crate::scripts::{agent_arguments, wrap_command_lines, AGENT_EXE, AGENT_FOLDER_SUBPATH, AGENT_PROCESS, LOGS_DIR, STOP_FLAG_DIR};

/// schema of the command-document contract
pub const COMMAND_SCHEMA_VERSION: &str = "2.2";

/// a platform-conditional script command document
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDocument {
    pub schema_version: String,
    pub description: String,
    pub main_steps: Vec<CommandStep>,
}

impl CommandDocument {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandStep {
    pub action: String,
    pub name: String,
    pub precondition: Precondition,
    pub inputs: CommandInputs,
}

#[derive(Clone, Debug, Serialize)]
pub struct Precondition {
    #[serde(rename = "StringEquals")]
    pub string_equals: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInputs {
    pub timeout_seconds: u32,
    pub run_command: Vec<String>,
}

fn powershell_step(name: &str, timeout_seconds: u32, body: Vec<String>) -> CommandStep {
    CommandStep {
        action: "aws:runPowerShellScript".to_string(),
        name: name.to_string(),
        precondition: Precondition {
            string_equals: vec!["platformType".to_string(), "Windows".to_string()],
        },
        inputs: CommandInputs {
            timeout_seconds,
            run_command: wrap_command_lines(body),
        },
    }
}

/// start the agent if it is not already running, then poll until it is up
pub fn start_agent_document(region: &str) -> CommandDocument {
    let mut body = format!(
        r#"$processName = "{AGENT_PROCESS}"
$process = Get-Process -Name $processName -ErrorAction SilentlyContinue
"#
    );
    body.push_str(
        r#"if ($process) {
    Write-Host "$processName is already running."
} else {
    Write-Host "$processName is not running."
"#,
    );
    body.push_str(&format!(
        r#"    $destination = "$env:ProgramFiles\{AGENT_FOLDER_SUBPATH}"
    $exePath = "$destination\{AGENT_PROCESS}\{AGENT_EXE}"
    $stopFlagDir = "{STOP_FLAG_DIR}"
    $logsDir = "{LOGS_DIR}"
    $arguments = "{arguments}"
"#,
        arguments = agent_arguments(region),
    ));
    // launch detached, then poll; Start-Process hangs the command channel
    body.push_str(
        r#"    $commandLine = "`"$exePath`" $arguments"
    Invoke-CimMethod -ClassName Win32_Process -MethodName Create -Arguments @{ CommandLine = $commandLine }
    Start-Sleep -Seconds 10
    $maxAttempts = 10
    $attempt = 0
    $runningProcess = $null
    while ($attempt -lt $maxAttempts) {
        $runningProcess = Get-Process -Name $processName -ErrorAction SilentlyContinue
        if ($runningProcess) {
            Write-Host "$processName has started successfully."
            break
        } else {
            Write-Host "Waiting for $processName to start... (Attempt: $($attempt + 1))"
            Start-Sleep -Seconds 5
        }
        $attempt++
    }
    if (-not $runningProcess) {
        throw "Failed to detect $processName after $maxAttempts attempts."
    }
}"#,
    );

    CommandDocument {
        schema_version: COMMAND_SCHEMA_VERSION.to_string(),
        description: "Start the executable running (if it's not already).".to_string(),
        main_steps: vec![powershell_step(
            "StartCloudCourier",
            75,
            body.lines().map(|l| l.to_string()).collect(),
        )],
    }
}

/// signal the agent to stop via a flag file, then poll until it is down
pub fn stop_agent_document() -> CommandDocument {
    let mut body = format!(
        r#"$processName = "{AGENT_PROCESS}"
$process = Get-Process -Name $processName -ErrorAction SilentlyContinue
"#
    );
    body.push_str(
        r#"if ($process) {
    Write-Host "$processName is already running."
"#,
    );
    body.push_str(&format!(
        r#"    $stopFlagDir = "{STOP_FLAG_DIR}"
    $uuid = [guid]::NewGuid().ToString()
    $filePath = Join-Path -Path $stopFlagDir -ChildPath "$uuid.txt"
    New-Item -ItemType File -Path $filePath -Force
"#
    ));
    body.push_str(
        r#"    Start-Sleep -Seconds 15
    $maxAttempts = 100
    $attempt = 0
    $runningProcess = $null
    while ($attempt -lt $maxAttempts) {
        $runningProcess = Get-Process -Name $processName -ErrorAction SilentlyContinue
        if (-not $runningProcess) {
            Write-Host "$processName has stopped successfully."
            break
        } else {
            Write-Host "Waiting for $processName to stop... (Attempt: $($attempt + 1))"
            Start-Sleep -Seconds 5
        }
        $attempt++
    }
    if ($runningProcess) {
        throw "Failed to stop $processName after $maxAttempts attempts."
    }
} else {
    Write-Host "$processName is not running."
}"#,
    );

    CommandDocument {
        schema_version: COMMAND_SCHEMA_VERSION.to_string(),
        description: "Stop the executable running (if it's currently active).".to_string(),
        main_steps: vec![powershell_step(
            "StopCloudCourier",
            600,
            body.lines().map(|l| l.to_string()).collect(),
        )],
    }
}
