//! generated script bodies shipped to nodes
//!
//! install/uninstall bodies are templated over the fixed install-path and
//! task-name constants below; every generated script goes through the same
//! boilerplate transform, which logs the invoking principal first and
//! guarantees a non-zero exit on any trapped failure.

/// install subpath under the machine-wide program directories
pub const AGENT_FOLDER_SUBPATH: &str = r"LabAutomationAndScreening\CloudCourier";

/// directory the agent polls for stop-flag files
pub const STOP_FLAG_DIR: &str = r"$env:ProgramData\LabAutomationAndScreening\CloudCourier\stop-flag";

/// directory the agent writes its log files into
pub const LOGS_DIR: &str = r"$env:ProgramData\LabAutomationAndScreening\CloudCourier\logs";

/// scheduled task that relaunches the agent at logon
pub const TASK_NAME: &str = "CloudCourierUploadAgent";

/// agent executable name
pub const AGENT_EXE: &str = "cloud-courier.exe";

/// agent process name, without extension
pub const AGENT_PROCESS: &str = "cloud-courier";

/// wrap command lines with strict failure handling
///
/// the invoking principal is logged before any other action, and the
/// trailing trap reports the failure and exits non-zero.
pub fn wrap_command_lines(body: Vec<String>) -> Vec<String> {
    let mut lines: Vec<String> = [
        "Set-PSDebug -Trace 1",
        "$ErrorActionPreference = 'Stop'",
        "whoami",
        "try {",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    lines.extend(body);
    lines.extend(["} catch {", "$_", "exit 1", "}"].iter().map(|s| s.to_string()));
    lines
}

/// wrap a whole script body as one trapped block
pub fn wrap_script(script: &str) -> String {
    wrap_command_lines(vec![script.to_string()]).join("\n")
}

/// agent launch arguments shared by the installer and the start command
pub fn agent_arguments(region: &str) -> String {
    format!("--aws-region={region} --stop-flag-dir=$stopFlagDir --log-folder=$logsDir --no-console-logging")
}

/// installer body: extract the payload, register the logon task, launch
///
/// `payload_name` is the agent executable bundle inside the distribution
/// archive.
pub fn install_script(region: &str, payload_name: &str) -> String {
    let mut script = format!(
        r#"$zipFile = "{payload_name}"
$destination = "$env:ProgramFiles\{AGENT_FOLDER_SUBPATH}"
"#
    );

    script.push_str(
        r#"if (-Not (Test-Path $zipFile)) {
    Write-Error "The ZIP file '$zipFile' does not exist."
    exit 1
}
Expand-Archive -LiteralPath $zipFile -DestinationPath $destination -Force
"#,
    );

    script.push_str(&format!(
        r#"$exePath = "$destination\{AGENT_PROCESS}\{AGENT_EXE}"
$stopFlagDir = "{STOP_FLAG_DIR}"
$logsDir = "{LOGS_DIR}"
New-Item -ItemType Directory -Force -Path $stopFlagDir
New-Item -ItemType Directory -Force -Path $logsDir
$arguments = "{arguments}"
"#,
        arguments = agent_arguments(region),
    ));

    // the task command checks for a running agent first so a logon never
    // starts a second copy
    script.push_str(&format!(
        r#"$command = "cmd.exe"
$cmdArguments = '/c "tasklist /FI \"IMAGENAME eq {AGENT_EXE}\" | find /I \"{AGENT_EXE}\" >nul || start /low "" "' + $exePath + '" ' + $arguments + '"'
$action = New-ScheduledTaskAction -Execute $command -Argument $cmdArguments
$trigger = New-ScheduledTaskTrigger -AtLogon
Register-ScheduledTask -TaskName "{TASK_NAME}" -Action $action -Trigger $trigger -RunLevel Highest -User "SYSTEM" -Force
"#
    ));

    // launch detached; Start-Process would hang the remote command channel
    script.push_str(
        r#"$commandLine = "`"$exePath`" $arguments"
Invoke-CimMethod -ClassName Win32_Process -MethodName Create -Arguments @{ CommandLine = $commandLine }"#,
    );

    script
}

/// uninstaller body: remove the install directory and the logon task
pub fn uninstall_script() -> String {
    let mut script = format!(
        r#"rm "$env:ProgramFiles\{AGENT_FOLDER_SUBPATH}\{AGENT_PROCESS}" -r -force
$taskName = "{TASK_NAME}"
$task = Get-ScheduledTask -TaskName $taskName -ErrorAction SilentlyContinue
"#
    );

    script.push_str(
        r#"if ($null -eq $task) {
    Write-Output "Scheduled task '$taskName' does not exist."
}
else {
    Unregister-ScheduledTask -TaskName $taskName -Confirm:$false -ErrorAction Stop
    Write-Output "Scheduled task '$taskName' deleted successfully."
}"#,
    );

    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_command_lines_order() {
        let wrapped = wrap_command_lines(vec!["Do-Thing".to_string()]);

        assert_eq!(wrapped[0], "Set-PSDebug -Trace 1");
        assert_eq!(wrapped[1], "$ErrorActionPreference = 'Stop'");
        // principal identity is the first action
        assert_eq!(wrapped[2], "whoami");
        assert_eq!(wrapped[3], "try {");
        assert_eq!(wrapped[4], "Do-Thing");
        assert_eq!(&wrapped[5..], ["} catch {", "$_", "exit 1", "}"]);
    }

    #[test]
    fn test_wrap_script_guarantees_nonzero_exit() {
        let wrapped = wrap_script("Get-Process");
        assert!(wrapped.contains("Get-Process"));
        assert!(wrapped.contains("exit 1"));
        assert!(wrapped.starts_with("Set-PSDebug -Trace 1"));
    }

    #[test]
    fn test_wrap_applies_to_any_body() {
        // same transform for install, uninstall, and command bodies
        let a = wrap_script(&install_script("us-east-1", "exe.zip"));
        let b = wrap_script(&uninstall_script());
        for script in [&a, &b] {
            assert!(script.contains("whoami"));
            assert!(script.contains("} catch {"));
        }
    }

    #[test]
    fn test_install_script_templating() {
        let script = install_script("us-east-1", "exe-v0.0.3.zip");

        assert!(script.contains(r#"$zipFile = "exe-v0.0.3.zip""#));
        assert!(script.contains("--aws-region=us-east-1"));
        assert!(script.contains(TASK_NAME));
        assert!(script.contains(AGENT_FOLDER_SUBPATH));
        assert!(script.contains("Expand-Archive"));
    }

    #[test]
    fn test_uninstall_script_removes_task() {
        let script = uninstall_script();

        assert!(script.contains(TASK_NAME));
        assert!(script.contains("Unregister-ScheduledTask"));
    }
}
