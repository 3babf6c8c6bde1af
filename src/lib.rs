pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod input;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{BatchConfig, CliOverrides, Config, FailurePolicy, PathsConfig, ToolConfig};
pub use error::{Result, UserFriendlyError, WarcBatchError};

// Core functionality re-exports
pub use driver::{
    BatchDriver, BatchEvent, BatchReport, BatchSettings, ExtractionJob, ExtractionTool, Extractor,
    PlannedJob, RecordResult, StopReason, ToolOutcome, WorkspaceLayout,
};
pub use input::{InputRecord, RecordKind, RecordSource};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressAwareOutput, ProgressManager};

use std::io::BufRead;
use std::path::Path;

/// Main library interface for WarcBatch functionality
pub struct WarcBatch {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl WarcBatch {
    /// Create a new WarcBatch instance with the provided configuration
    pub fn new(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        show_progress: bool,
    ) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(show_progress && !quiet);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create a new WarcBatch instance for testing (no signal handler conflicts)
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    /// Create WarcBatch instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            crate::cli::OutputFormat::Human => OutputMode::Human,
            crate::cli::OutputFormat::Json => OutputMode::Json,
            crate::cli::OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(
            config,
            output_mode,
            cli_args.verbosity_level(),
            cli_args.quiet,
            cli_args.show_progress(),
        )
    }

    /// Run the extractor over the records in `input`
    pub async fn run_batch<R: BufRead>(&self, input: R) -> Result<BatchReport> {
        let driver = self.create_driver();
        let layout = driver.layout();
        self.output_formatter
            .info(&format!("Working directory: {}", layout.base_directory().display()));
        self.output_formatter.info(&format!(
            "Extractor: {} {}",
            self.config.tool.program,
            self.config.tool.args.join(" ")
        ));
        self.output_formatter.debug(&format!(
            "Output directory: {}, scratch directory: {}",
            layout.output_directory().display(),
            layout.scratch_directory().display()
        ));

        let policy = self.config.batch.on_failure;
        let progress = self.progress_manager.create_record_progress(self.config.record_limit());
        let output = ProgressAwareOutput::new(&self.output_formatter, Some(&self.progress_manager));

        let result = driver
            .run(input, &self.shutdown, &|event| match event {
                BatchEvent::RecordStarted { index, record, job } => {
                    ui::progress::update_record_started(&progress, index, record);
                    output.suspend_and_print(|f| f.record_started(index, record, &job.outfile));

                    if let Some(path) = record.local_path() {
                        if !path.exists() {
                            output.warning(&format!(
                                "Input file does not exist locally: {} (passing it to the extractor anyway)",
                                record
                            ));
                        }
                    }

                    output.debug(&format!("Running: {}", driver.extractor().command_line(job)));
                }
                BatchEvent::RecordFinished { result } => {
                    output.suspend_and_print(|f| f.record_finished(result, policy));
                    ui::progress::update_record_finished(&progress);
                }
            })
            .await;

        let report = match result {
            Ok(report) if report.stop_reason == StopReason::Cancelled => {
                progress.abandon();
                report
            }
            Ok(report) => {
                ui::progress::finish_progress_with_summary(&progress, &report);
                report
            }
            Err(e) => {
                progress.abandon();
                return Err(e);
            }
        };

        self.output_formatter.print_batch_summary(&report);

        Ok(report)
    }

    /// Describe the invocations a run over `input` would make, without running them
    pub fn plan_batch<R: BufRead>(&self, input: R) -> Result<Vec<PlannedJob>> {
        self.create_driver().plan(input)
    }

    fn create_driver(&self) -> BatchDriver<ExtractionTool> {
        let tool = ExtractionTool::from_config(&self.config.tool);
        let layout = WorkspaceLayout::new(&self.config.paths);

        BatchDriver::new(tool, layout, self.batch_settings())
    }

    fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            record_limit: self.config.record_limit(),
            on_failure: self.config.batch.on_failure,
            log_tool_output: self.config.tool.log_output,
        }
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(WarcBatchError::Io)?;
        Ok(())
    }

    /// Get configuration reference
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get output formatter reference
    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &WarcBatchError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.base_directory = dir.path().to_path_buf();
        config
    }

    #[test]
    fn test_batch_settings_follow_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.batch.max_records = 0;
        config.batch.on_failure = FailurePolicy::Report;
        config.tool.log_output = true;

        let warcbatch = WarcBatch::new_for_test(config, OutputMode::Plain, 0, true);
        let settings = warcbatch.batch_settings();

        assert_eq!(settings.record_limit, None);
        assert_eq!(settings.on_failure, FailurePolicy::Report);
        assert!(settings.log_tool_output);
    }

    #[test]
    fn test_plan_batch_uses_configured_tool() {
        let temp_dir = TempDir::new().unwrap();
        let warcbatch = WarcBatch::new_for_test(config_in(&temp_dir), OutputMode::Plain, 0, true);

        let planned = warcbatch
            .plan_batch(Cursor::new("/data/a.warc\n/data/b.warc\n"))
            .unwrap();

        assert_eq!(planned.len(), 1);
        assert!(planned[0]
            .command_line
            .starts_with("python3 -m newsplease.examples.commoncrawl --warc-file /data/a.warc"));
        assert!(!temp_dir.path().join("extracted_files").exists());
    }

    #[tokio::test]
    async fn test_run_batch_with_missing_tool_still_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.tool.program = "warcbatch-no-such-extractor".to_string();

        let warcbatch = WarcBatch::new_for_test(config, OutputMode::Plain, 0, true);
        let report = warcbatch
            .run_batch(Cursor::new("/data/a.warc\n/data/b.warc\n"))
            .await
            .unwrap();

        assert_eq!(report.processed(), 1);
        assert!(matches!(report.records[0].outcome, ToolOutcome::SpawnFailed { .. }));
        assert!(temp_dir.path().join("extracted_files").is_dir());
    }

    #[tokio::test]
    async fn test_run_batch_after_shutdown_is_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let warcbatch = WarcBatch::new_for_test(config_in(&temp_dir), OutputMode::Plain, 0, true);

        warcbatch.request_shutdown();
        assert!(!warcbatch.is_running());

        let report = warcbatch.run_batch(Cursor::new("/data/a.warc\n")).await.unwrap();
        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(report.processed(), 0);
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        WarcBatch::generate_sample_config(&config_path).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[tool]"));
        assert!(content.contains("[batch]"));
    }
}
