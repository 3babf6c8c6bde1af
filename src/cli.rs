use crate::config::{CliOverrides, Config, FailurePolicy};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "warcbatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a news-article extractor over WARC files listed on stdin")]
#[command(
    long_about = "WarcBatch reads one WARC path or URI per line from standard input and runs \
                  the news-please Common Crawl extractor on it, writing results to \
                  extracted_files/extracted_<name> and using cc_news_tmp as the shared \
                  download directory. By default it stops after the first file; use --all \
                  to process the whole list."
)]
#[command(after_help = "EXAMPLES:\n  \
    ls /data/*.warc.gz | warcbatch\n  \
    warcbatch --all --on-failure report < warc.paths\n  \
    warcbatch --all --progress --report batch.json < warc.paths\n  \
    warcbatch --dry-run --all -vv < warc.paths\n  \
    warcbatch --tool ./extract.sh --tool-arg=--strict --all < warc.paths")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Directory that receives extracted_files/ and cc_news_tmp/
    #[arg(short, long, env = "WARCBATCH_WORK_DIR", help = "Working directory (defaults to the current directory)")]
    pub work_dir: Option<PathBuf>,

    /// Extraction program to run for each file
    #[arg(long = "tool", value_name = "PROGRAM")]
    pub program: Option<String>,

    /// Arguments placed before the --warc-file/--outfile/--download-dir options (repeatable)
    #[arg(long = "tool-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub tool_args: Option<Vec<String>>,

    /// Kill an extraction that runs longer than this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Write each extraction's stdout/stderr to <outfile>.tool.log
    #[arg(long)]
    pub log_tool_output: bool,

    /// Process every record instead of stopping after the first
    #[arg(long, conflicts_with = "max_records")]
    pub all: bool,

    /// Stop after this many records (0 means no limit)
    #[arg(long, value_name = "N")]
    pub max_records: Option<usize>,

    /// What to do when an extraction fails
    #[arg(long, value_enum)]
    pub on_failure: Option<FailurePolicy>,

    /// Write a JSON batch report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Show a progress bar on stderr (implies --log-tool-output)
    #[arg(long, conflicts_with = "quiet")]
    pub progress: bool,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress lines)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "Print the planned extractor invocations without running them")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let work_dir = self.work_dir.as_ref().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                std::env::current_dir().unwrap_or_default().join(dir)
            }
        });

        let max_records = if self.all { Some(0) } else { self.max_records };

        CliOverrides::new()
            .with_work_dir(work_dir)
            .with_program(self.program.clone())
            .with_tool_args(self.tool_args.clone())
            .with_timeout(self.timeout)
            .with_log_output(self.log_tool_output || self.progress)
            .with_max_records(max_records)
            .with_on_failure(self.on_failure)
    }

    pub fn show_progress(&self) -> bool {
        self.progress && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
