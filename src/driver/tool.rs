use crate::config::ToolConfig;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Everything one extractor invocation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    pub source: String,
    pub outfile: PathBuf,
    pub download_dir: PathBuf,
    /// Where the tool's stdout/stderr go; `None` inherits the driver's streams.
    pub log_file: Option<PathBuf>,
}

impl ExtractionJob {
    /// Named options appended after the configured program arguments.
    pub fn arguments(&self) -> Vec<OsString> {
        vec![
            "--warc-file".into(),
            self.source.clone().into(),
            "--outfile".into(),
            self.outfile.clone().into_os_string(),
            "--download-dir".into(),
            self.download_dir.clone().into_os_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Succeeded,
    Failed { exit_code: Option<i32> },
    SpawnFailed { message: String },
    TimedOut { seconds: u64 },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Succeeded)
    }

    pub fn describe(&self) -> String {
        match self {
            ToolOutcome::Succeeded => "succeeded".to_string(),
            ToolOutcome::Failed {
                exit_code: Some(code),
            } => format!("exited with status {}", code),
            ToolOutcome::Failed { exit_code: None } => "terminated by signal".to_string(),
            ToolOutcome::SpawnFailed { message } => format!("could not start: {}", message),
            ToolOutcome::TimedOut { seconds } => format!("timed out after {} seconds", seconds),
        }
    }
}

/// Runs one extraction job to completion.
///
/// Failures of the extraction itself are reported through [`ToolOutcome`],
/// never as errors, so the driver decides what a failure means.
#[allow(async_fn_in_trait)]
pub trait Extractor {
    async fn extract(&self, job: &ExtractionJob) -> ToolOutcome;

    /// Human-readable command line for `job`, used by dry runs and debug output.
    fn command_line(&self, job: &ExtractionJob) -> String;
}

/// The external extractor, spawned as a child process per job.
#[derive(Debug, Clone)]
pub struct ExtractionTool {
    program: String,
    base_args: Vec<String>,
    timeout: Option<Duration>,
}

impl ExtractionTool {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(config.program.clone())
            .with_args(config.args.clone())
            .with_timeout(config.timeout.map(Duration::from_secs))
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_command(&self, job: &ExtractionJob) -> std::io::Result<Command> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.base_args)
            .args(job.arguments())
            // The driver's stdin carries the record list; the child must not consume it.
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(ref log_file) = job.log_file {
            let stdout = OpenOptions::new().create(true).append(true).open(log_file)?;
            let stderr = stdout.try_clone()?;
            command.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr));
        }

        Ok(command)
    }
}

impl Extractor for ExtractionTool {
    async fn extract(&self, job: &ExtractionJob) -> ToolOutcome {
        let mut child = match self.build_command(job).and_then(|mut command| command.spawn()) {
            Ok(child) => child,
            Err(e) => {
                return ToolOutcome::SpawnFailed {
                    message: format!("{}: {}", self.program, e),
                }
            }
        };

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    let _ = child.kill().await;
                    return ToolOutcome::TimedOut {
                        seconds: limit.as_secs(),
                    };
                }
            },
            None => child.wait().await,
        };

        match status {
            Ok(status) if status.success() => ToolOutcome::Succeeded,
            Ok(status) => ToolOutcome::Failed {
                exit_code: status.code(),
            },
            Err(e) => ToolOutcome::SpawnFailed {
                message: format!("failed waiting for {}: {}", self.program, e),
            },
        }
    }

    fn command_line(&self, job: &ExtractionJob) -> String {
        std::iter::once(self.program.clone())
            .chain(self.base_args.iter().cloned())
            .chain(
                job.arguments()
                    .into_iter()
                    .map(|arg| arg.to_string_lossy().into_owned()),
            )
            .map(|arg| quote_argument(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_argument(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_alphanumeric() || "-_./:=@+,".contains(c));

    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
