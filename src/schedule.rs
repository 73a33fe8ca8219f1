//! Installing the fetcher as a scheduled task.
//!
//! On Unix the task is a crontab line tagged with [`MARKER`]; on Windows it
//! is a Task Scheduler entry named [`TASK_NAME`] registered from an XML
//! definition.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{FetchError, Result};

/// Comment identifying the crontab line managed by this crate.
pub const MARKER: &str = "# earthporn";

/// Name of the Windows scheduled task.
pub const TASK_NAME: &str = "earthporn";

/// What to run and how often.
#[derive(Debug, Clone)]
pub struct TaskSpec<'a> {
    /// Absolute path of the executable.
    pub exe: &'a Path,
    /// Directory the task runs in.
    pub workdir: &'a Path,
    /// Arguments passed to the executable.
    pub args: &'a [String],
    /// Interval between runs, 1 to 24 hours.
    pub every_hours: u32,
}

impl TaskSpec<'_> {
    fn validate(&self) -> Result<()> {
        if !(1..=24).contains(&self.every_hours) {
            return Err(FetchError::InvalidConfig(format!(
                "interval must be between 1 and 24 hours, got {}",
                self.every_hours
            )));
        }
        Ok(())
    }
}

/// Quote a value for `sh`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Build the crontab line for `spec`.
pub fn cron_line(spec: &TaskSpec<'_>) -> String {
    let hours = if spec.every_hours == 1 {
        "*".to_string()
    } else {
        format!("*/{}", spec.every_hours)
    };

    let mut command = format!(
        "cd {} && {}",
        shell_quote(&spec.workdir.to_string_lossy()),
        shell_quote(&spec.exe.to_string_lossy())
    );
    for arg in spec.args {
        command.push(' ');
        command.push_str(&shell_quote(arg));
    }

    format!("0 {} * * * {} {}", hours, cron_escape(&command), MARKER)
}

/// Escape `%`, which cron turns into a newline even inside shell quotes.
fn cron_escape(command: &str) -> String {
    command.replace('%', r"\%")
}

/// Remove managed lines from a crontab.
pub fn remove_from_crontab(existing: &str) -> String {
    let mut out: String = existing
        .lines()
        .filter(|line| !line.trim_end().ends_with(MARKER))
        .collect::<Vec<_>>()
        .join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Replace any managed line in a crontab with `line`.
pub fn merge_crontab(existing: &str, line: &str) -> String {
    let mut out = remove_from_crontab(existing);
    out.push_str(line);
    out.push('\n');
    out
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Quote a single argument so that `CommandLineToArgvW` reads it back unchanged.
fn windows_quote(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\t', '"']) {
        return value.to_string();
    }

    let mut quoted = String::from('"');
    let mut backslashes = 0;
    for c in value.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                // Backslashes before a quote are escapes, as is the quote itself.
                quoted.push_str(&"\\".repeat(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.push_str(&"\\".repeat(backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    // Trailing backslashes precede the closing quote.
    quoted.push_str(&"\\".repeat(backslashes * 2));
    quoted.push('"');
    quoted
}

/// Build the Task Scheduler XML definition for `spec`.
pub fn task_xml(spec: &TaskSpec<'_>) -> String {
    let arguments = spec
        .args
        .iter()
        .map(|a| windows_quote(a))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        r#"<?xml version="1.0" encoding="UTF-16"?>
<Task version="1.2" xmlns="http://schemas.microsoft.com/windows/2004/02/mit/task">
  <RegistrationInfo>
    <Description>Download wallpapers from r/EarthPorn</Description>
  </RegistrationInfo>
  <Triggers>
    <TimeTrigger>
      <Repetition>
        <Interval>PT{hours}H</Interval>
        <StopAtDurationEnd>false</StopAtDurationEnd>
      </Repetition>
      <StartBoundary>2000-01-01T00:00:00</StartBoundary>
      <Enabled>true</Enabled>
    </TimeTrigger>
  </Triggers>
  <Settings>
    <MultipleInstancesPolicy>IgnoreNew</MultipleInstancesPolicy>
    <DisallowStartIfOnBatteries>false</DisallowStartIfOnBatteries>
    <StopIfGoingOnBatteries>false</StopIfGoingOnBatteries>
    <StartWhenAvailable>true</StartWhenAvailable>
    <RunOnlyIfNetworkAvailable>true</RunOnlyIfNetworkAvailable>
    <ExecutionTimeLimit>PT1H</ExecutionTimeLimit>
    <Enabled>true</Enabled>
  </Settings>
  <Actions Context="Author">
    <Exec>
      <Command>{command}</Command>
      <Arguments>{arguments}</Arguments>
      <WorkingDirectory>{workdir}</WorkingDirectory>
    </Exec>
  </Actions>
</Task>
"#,
        hours = spec.every_hours,
        command = xml_escape(&spec.exe.to_string_lossy()),
        arguments = xml_escape(&arguments),
        workdir = xml_escape(&spec.workdir.to_string_lossy()),
    )
}

/// Encode text as UTF-16 LE with a byte order mark, as `schtasks` expects.
pub fn utf16_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

fn run(command: &mut Command) -> Result<String> {
    debug!("Running {:?}", command);
    let output = command.output()?;
    if !output.status.success() {
        return Err(FetchError::Scheduler(format!(
            "{:?} failed: {}",
            command,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn read_crontab() -> Result<String> {
    let output = Command::new("crontab").arg("-l").output()?;
    // `crontab -l` fails when the user has no crontab yet.
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Ok(String::new())
    }
}

fn write_crontab(content: &str) -> Result<()> {
    let mut child = Command::new("crontab")
        .arg("-")
        .stdin(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(content.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(FetchError::Scheduler(format!(
            "crontab failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// Register the scheduled task, replacing a previous one.
pub fn install(spec: &TaskSpec<'_>) -> Result<()> {
    spec.validate()?;

    if cfg!(windows) {
        let xml_path = std::env::temp_dir().join("earthporn-task.xml");
        std::fs::write(&xml_path, utf16_with_bom(&task_xml(spec)))?;

        let result = run(Command::new("schtasks")
            .args(["/Create", "/TN", TASK_NAME, "/XML"])
            .arg(&xml_path)
            .arg("/F"));
        let _ = std::fs::remove_file(&xml_path);
        result?;
    } else {
        let line = cron_line(spec);
        write_crontab(&merge_crontab(&read_crontab()?, &line))?;
        debug!("Installed crontab line: {}", line);
    }

    info!("Scheduled task installed, running every {} hour(s)", spec.every_hours);
    Ok(())
}

/// Remove the scheduled task.
pub fn uninstall() -> Result<()> {
    if cfg!(windows) {
        run(Command::new("schtasks").args(["/Delete", "/TN", TASK_NAME, "/F"]))?;
    } else {
        write_crontab(&remove_from_crontab(&read_crontab()?))?;
    }

    info!("Scheduled task removed");
    Ok(())
}
