use crate::error::{Result, WarcBatchError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub tool: ToolConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Relative values resolve against the current directory at startup.
    pub base_directory: PathBuf,
    pub output_dir_name: String,
    pub output_prefix: String,
    pub scratch_dir_name: String,
    pub create_scratch_dir: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Seconds before a running extraction is killed. Unset means wait forever.
    pub timeout: Option<u64>,
    /// Append the tool's stdout and stderr to `<outfile>.tool.log` instead of inheriting them.
    pub log_output: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Records to process before stopping; 0 processes the whole input.
    pub max_records: usize,
    pub on_failure: FailurePolicy,
}

/// What the driver does when an extraction does not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the outcome in the report and carry on as if it succeeded.
    Ignore,
    /// Print the failure, keep going, and exit non-zero at the end.
    Report,
    /// Print the failure and stop the batch.
    Abort,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from("."),
            output_dir_name: "extracted_files".to_string(),
            output_prefix: "extracted_".to_string(),
            scratch_dir_name: "cc_news_tmp".to_string(),
            create_scratch_dir: true,
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec![
                "-m".to_string(),
                "newsplease.examples.commoncrawl".to_string(),
            ],
            timeout: None,
            log_output: false,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_records: 1,
            on_failure: FailurePolicy::Ignore,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(WarcBatchError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| WarcBatchError::Config {
                message: format!("Failed to read config file {}: {}", path.display(), e),
            })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| WarcBatchError::Config {
                message: format!("Failed to parse config file {}: {}", path.display(), e),
            })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["warcbatch.toml", ".warcbatch.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref work_dir) = cli_args.work_dir {
            self.paths.base_directory = work_dir.clone();
        }

        if let Some(ref program) = cli_args.program {
            self.tool.program = program.clone();
        }

        if let Some(ref args) = cli_args.tool_args {
            self.tool.args = args.clone();
        }

        if let Some(timeout) = cli_args.timeout {
            self.tool.timeout = Some(timeout);
        }

        if cli_args.log_output {
            self.tool.log_output = true;
        }

        if let Some(max_records) = cli_args.max_records {
            self.batch.max_records = max_records;
        }

        if let Some(policy) = cli_args.on_failure {
            self.batch.on_failure = policy;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tool.program.trim().is_empty() {
            return Err(WarcBatchError::Config {
                message: "tool.program must name the extraction program".to_string(),
            });
        }

        if self.tool.timeout == Some(0) {
            return Err(WarcBatchError::Config {
                message: "tool.timeout must be greater than 0 when set".to_string(),
            });
        }

        if self.paths.output_dir_name.trim().is_empty() {
            return Err(WarcBatchError::Config {
                message: "paths.output_dir_name must not be empty".to_string(),
            });
        }

        if self.paths.scratch_dir_name.trim().is_empty() {
            return Err(WarcBatchError::Config {
                message: "paths.scratch_dir_name must not be empty".to_string(),
            });
        }

        if !self.paths.base_directory.is_dir() {
            return Err(WarcBatchError::Config {
                message: format!(
                    "Working directory does not exist: {}",
                    self.paths.base_directory.display()
                ),
            });
        }

        Ok(())
    }

    /// Whether the batch stops after a fixed number of records.
    pub fn record_limit(&self) -> Option<usize> {
        match self.batch.max_records {
            0 => None,
            limit => Some(limit),
        }
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub work_dir: Option<PathBuf>,
    pub program: Option<String>,
    pub tool_args: Option<Vec<String>>,
    pub timeout: Option<u64>,
    pub log_output: bool,
    pub max_records: Option<usize>,
    pub on_failure: Option<FailurePolicy>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work_dir(mut self, work_dir: Option<PathBuf>) -> Self {
        self.work_dir = work_dir;
        self
    }

    pub fn with_program(mut self, program: Option<String>) -> Self {
        self.program = program;
        self
    }

    pub fn with_tool_args(mut self, args: Option<Vec<String>>) -> Self {
        self.tool_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_log_output(mut self, log_output: bool) -> Self {
        self.log_output = log_output;
        self
    }

    pub fn with_max_records(mut self, max_records: Option<usize>) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn with_on_failure(mut self, policy: Option<FailurePolicy>) -> Self {
        self.on_failure = policy;
        self
    }
}
