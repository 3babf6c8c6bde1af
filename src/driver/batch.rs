use crate::config::FailurePolicy;
use crate::driver::layout::{sidecar_path, WorkspaceLayout};
use crate::driver::tool::{ExtractionJob, Extractor, ToolOutcome};
use crate::error::{Result, WarcBatchError};
use crate::input::{InputRecord, RecordSource};
use crate::ui::GracefulShutdown;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    /// `None` processes every record in the input.
    pub record_limit: Option<usize>,
    pub on_failure: FailurePolicy,
    pub log_tool_output: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            record_limit: Some(1),
            on_failure: FailurePolicy::Ignore,
            log_tool_output: false,
        }
    }
}

/// Progress notifications delivered while a batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    RecordStarted {
        index: usize,
        record: &'a InputRecord,
        job: &'a ExtractionJob,
    },
    RecordFinished {
        result: &'a RecordResult,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResult {
    /// 1-based counter shown in progress lines.
    pub index: usize,
    pub record: String,
    pub line_number: usize,
    pub output_path: PathBuf,
    pub outcome: ToolOutcome,
    pub duration: Duration,
    pub output_bytes: Option<u64>,
    /// Whether the extractor left its `<outfile>.done` marker behind.
    pub done_marker: bool,
}

impl RecordResult {
    fn observe(
        index: usize,
        record: &InputRecord,
        job: &ExtractionJob,
        outcome: ToolOutcome,
        duration: Duration,
    ) -> Self {
        let output_bytes = fs::metadata(&job.outfile).ok().map(|m| m.len());
        let done_marker = sidecar_path(&job.outfile, "done").exists();

        Self {
            index,
            record: record.as_str().to_string(),
            line_number: record.line_number(),
            output_path: job.outfile.clone(),
            outcome,
            duration,
            output_bytes,
            done_marker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    InputExhausted,
    RecordLimitReached,
    FailureAbort,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output_directory: PathBuf,
    pub scratch_directory: PathBuf,
    pub on_failure: FailurePolicy,
    pub stop_reason: StopReason,
    pub records: Vec<RecordResult>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.records.len()
    }

    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.processed() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordResult> {
        self.records.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn output_bytes(&self) -> u64 {
        self.records.iter().filter_map(|r| r.output_bytes).sum()
    }

    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| WarcBatchError::Report {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        fs::write(path, content).map_err(|e| WarcBatchError::Report {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// A planned invocation, produced by a dry run.
#[derive(Debug, Clone)]
pub struct PlannedJob {
    pub index: usize,
    pub record: InputRecord,
    pub job: ExtractionJob,
    pub command_line: String,
}

/// Feeds input records to an [`Extractor`] one at a time.
pub struct BatchDriver<E> {
    extractor: E,
    layout: WorkspaceLayout,
    settings: BatchSettings,
}

impl<E: Extractor> BatchDriver<E> {
    pub fn new(extractor: E, layout: WorkspaceLayout, settings: BatchSettings) -> Self {
        Self {
            extractor,
            layout,
            settings,
        }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Prepares the workspace, then extracts records until the input runs out,
    /// the record limit is hit, a failure stops the batch under
    /// [`FailurePolicy::Abort`], or shutdown is requested. A cancelled batch
    /// still returns the results of the records that finished.
    ///
    /// The output directory is created before any input is read, so it
    /// exists even when the input is empty.
    pub async fn run<R: BufRead>(
        &self,
        input: R,
        shutdown: &GracefulShutdown,
        on_event: &dyn Fn(BatchEvent<'_>),
    ) -> Result<BatchReport> {
        self.layout.initialize()?;

        let started_at = Utc::now();
        let mut source = RecordSource::new(input);
        let mut records: Vec<RecordResult> = Vec::new();
        let mut counter = 1;

        let stop_reason = loop {
            if self.limit_reached(records.len()) {
                break StopReason::RecordLimitReached;
            }

            if !shutdown.is_running() {
                break StopReason::Cancelled;
            }

            let Some(record) = source.next_record()? else {
                break StopReason::InputExhausted;
            };

            let job = self.layout.job_for(&record, self.settings.log_tool_output);
            on_event(BatchEvent::RecordStarted {
                index: counter,
                record: &record,
                job: &job,
            });

            let started = Instant::now();
            let outcome = self.extractor.extract(&job).await;
            let result = RecordResult::observe(counter, &record, &job, outcome, started.elapsed());

            on_event(BatchEvent::RecordFinished { result: &result });

            let failed = !result.outcome.is_success();
            records.push(result);

            // An interrupt also reaches the child, so its failure is not the extractor's.
            if !shutdown.is_running() {
                break StopReason::Cancelled;
            }
            if failed && self.settings.on_failure == FailurePolicy::Abort {
                break StopReason::FailureAbort;
            }

            counter += 1;
        };

        Ok(BatchReport {
            started_at,
            finished_at: Utc::now(),
            output_directory: self.layout.output_directory().to_path_buf(),
            scratch_directory: self.layout.scratch_directory().to_path_buf(),
            on_failure: self.settings.on_failure,
            stop_reason,
            records,
        })
    }

    /// Reads the records a run would process and describes each invocation
    /// without touching the filesystem or starting the extractor.
    pub fn plan<R: BufRead>(&self, input: R) -> Result<Vec<PlannedJob>> {
        let mut source = RecordSource::new(input);
        let mut planned: Vec<PlannedJob> = Vec::new();

        while !self.limit_reached(planned.len()) {
            let Some(record) = source.next_record()? else {
                break;
            };

            let job = self.layout.job_for(&record, self.settings.log_tool_output);
            planned.push(PlannedJob {
                index: planned.len() + 1,
                command_line: self.extractor.command_line(&job),
                record,
                job,
            });
        }

        Ok(planned)
    }

    fn limit_reached(&self, processed: usize) -> bool {
        self.settings
            .record_limit
            .is_some_and(|limit| processed >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    /// Records every job and answers with scripted outcomes (success once the script runs out).
    #[derive(Default)]
    struct RecordingExtractor {
        jobs: RefCell<Vec<ExtractionJob>>,
        outcomes: RefCell<Vec<ToolOutcome>>,
        write_output: bool,
        /// Requested during the first extraction, like a Ctrl+C mid-run.
        interrupt: Option<Rc<GracefulShutdown>>,
    }

    impl RecordingExtractor {
        fn with_outcomes(outcomes: Vec<ToolOutcome>) -> Self {
            let mut outcomes = outcomes;
            outcomes.reverse();
            Self {
                outcomes: RefCell::new(outcomes),
                ..Self::default()
            }
        }

        fn sources(&self) -> Vec<String> {
            self.jobs.borrow().iter().map(|j| j.source.clone()).collect()
        }
    }

    impl Extractor for RecordingExtractor {
        async fn extract(&self, job: &ExtractionJob) -> ToolOutcome {
            self.jobs.borrow_mut().push(job.clone());
            if let Some(ref shutdown) = self.interrupt {
                shutdown.request_shutdown();
            }
            if self.write_output {
                fs::write(&job.outfile, b"{}\n").unwrap();
                fs::write(sidecar_path(&job.outfile, "done"), b"done").unwrap();
            }
            self.outcomes.borrow_mut().pop().unwrap_or(ToolOutcome::Succeeded)
        }

        fn command_line(&self, job: &ExtractionJob) -> String {
            format!("fake --warc-file {}", job.source)
        }
    }

    fn driver_in(dir: &TempDir, extractor: RecordingExtractor, settings: BatchSettings) -> BatchDriver<RecordingExtractor> {
        let layout = WorkspaceLayout::new(&PathsConfig {
            base_directory: dir.path().to_path_buf(),
            ..PathsConfig::default()
        });
        BatchDriver::new(extractor, layout, settings)
    }

    fn unlimited(on_failure: FailurePolicy) -> BatchSettings {
        BatchSettings {
            record_limit: None,
            on_failure,
            log_tool_output: false,
        }
    }

    #[tokio::test]
    async fn test_default_settings_process_exactly_one_record() {
        let temp_dir = TempDir::new().unwrap();
        let driver = driver_in(&temp_dir, RecordingExtractor::default(), BatchSettings::default());
        let shutdown = GracefulShutdown::new_for_test();
        let events = RefCell::new(Vec::new());

        let mut input = Cursor::new("/data/a.warc\n/data/b.warc\n".as_bytes());
        let report = driver
            .run(&mut input, &shutdown, &|event| {
                let line = match event {
                    BatchEvent::RecordStarted { index, record, .. } => {
                        format!("Begin extracting file {}: {}", index, record)
                    }
                    BatchEvent::RecordFinished { result } => {
                        format!("Done extracting file {}: {}", result.index, result.record)
                    }
                };
                events.borrow_mut().push(line);
            })
            .await
            .unwrap();

        assert_eq!(driver.extractor.sources(), vec!["/data/a.warc"]);
        assert_eq!(
            events.into_inner(),
            vec![
                "Begin extracting file 1: /data/a.warc",
                "Done extracting file 1: /data/a.warc",
            ]
        );
        assert_eq!(report.stop_reason, StopReason::RecordLimitReached);
        assert_eq!(report.processed(), 1);

        let mut rest = String::new();
        input.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "/data/b.warc\n");
    }

    #[tokio::test]
    async fn test_job_paths_follow_layout() {
        let temp_dir = TempDir::new().unwrap();
        let driver = driver_in(&temp_dir, RecordingExtractor::default(), BatchSettings::default());
        let shutdown = GracefulShutdown::new_for_test();

        driver
            .run(Cursor::new("/data/a.warc\n"), &shutdown, &|_| {})
            .await
            .unwrap();

        let jobs = driver.extractor.jobs.borrow();
        assert_eq!(jobs[0].source, "/data/a.warc");
        assert_eq!(
            jobs[0].outfile,
            temp_dir.path().join("extracted_files").join("extracted_a.warc")
        );
        assert_eq!(jobs[0].download_dir, temp_dir.path().join("cc_news_tmp"));
    }

    #[tokio::test]
    async fn test_empty_input_still_creates_output_directory() {
        let temp_dir = TempDir::new().unwrap();
        let driver = driver_in(&temp_dir, RecordingExtractor::default(), BatchSettings::default());
        let shutdown = GracefulShutdown::new_for_test();

        let report = driver.run(Cursor::new(""), &shutdown, &|_| {}).await.unwrap();

        assert!(temp_dir.path().join("extracted_files").is_dir());
        assert!(temp_dir.path().join("cc_news_tmp").is_dir());
        assert_eq!(report.processed(), 0);
        assert_eq!(report.stop_reason, StopReason::InputExhausted);
    }

    #[tokio::test]
    async fn test_failure_is_ignored_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = RecordingExtractor::with_outcomes(vec![ToolOutcome::Failed { exit_code: Some(1) }]);
        let driver = driver_in(&temp_dir, extractor, BatchSettings::default());
        let shutdown = GracefulShutdown::new_for_test();

        let report = driver
            .run(Cursor::new("/data/a.warc\n/data/b.warc\n"), &shutdown, &|_| {})
            .await
            .unwrap();

        assert_eq!(report.processed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.stop_reason, StopReason::RecordLimitReached);
    }

    #[tokio::test]
    async fn test_unlimited_batch_counts_non_blank_records() {
        let temp_dir = TempDir::new().unwrap();
        let driver = driver_in(&temp_dir, RecordingExtractor::default(), unlimited(FailurePolicy::Ignore));
        let shutdown = GracefulShutdown::new_for_test();

        let report = driver
            .run(Cursor::new("/d/1.warc\n\n/d/2.warc\n  \n/d/3.warc"), &shutdown, &|_| {})
            .await
            .unwrap();

        let indexes: Vec<usize> = report.records.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert_eq!(report.records[2].line_number, 5);
        assert_eq!(driver.extractor.sources(), vec!["/d/1.warc", "/d/2.warc", "/d/3.warc"]);
        assert_eq!(report.stop_reason, StopReason::InputExhausted);
    }

    #[tokio::test]
    async fn test_report_policy_continues_past_failures() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = RecordingExtractor::with_outcomes(vec![
            ToolOutcome::Succeeded,
            ToolOutcome::Failed { exit_code: Some(2) },
            ToolOutcome::Succeeded,
        ]);
        let driver = driver_in(&temp_dir, extractor, unlimited(FailurePolicy::Report));
        let shutdown = GracefulShutdown::new_for_test();

        let report = driver
            .run(Cursor::new("/d/1.warc\n/d/2.warc\n/d/3.warc\n"), &shutdown, &|_| {})
            .await
            .unwrap();

        assert_eq!(report.processed(), 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures().next().unwrap().record, "/d/2.warc");
    }

    #[tokio::test]
    async fn test_abort_policy_stops_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = RecordingExtractor::with_outcomes(vec![
            ToolOutcome::Succeeded,
            ToolOutcome::SpawnFailed {
                message: "python3: not found".to_string(),
            },
        ]);
        let driver = driver_in(&temp_dir, extractor, unlimited(FailurePolicy::Abort));
        let shutdown = GracefulShutdown::new_for_test();

        let report = driver
            .run(Cursor::new("/d/1.warc\n/d/2.warc\n/d/3.warc\n"), &shutdown, &|_| {})
            .await
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::FailureAbort);
        assert_eq!(driver.extractor.sources(), vec!["/d/1.warc", "/d/2.warc"]);
    }

    #[tokio::test]
    async fn test_record_limit_greater_than_one() {
        let temp_dir = TempDir::new().unwrap();
        let settings = BatchSettings {
            record_limit: Some(2),
            ..BatchSettings::default()
        };
        let driver = driver_in(&temp_dir, RecordingExtractor::default(), settings);
        let shutdown = GracefulShutdown::new_for_test();

        let report = driver
            .run(Cursor::new("/d/1.warc\n/d/2.warc\n/d/3.warc\n"), &shutdown, &|_| {})
            .await
            .unwrap();

        assert_eq!(report.processed(), 2);
        assert_eq!(report.stop_reason, StopReason::RecordLimitReached);
    }

    #[tokio::test]
    async fn test_cancelled_batch_stops_before_next_record() {
        let temp_dir = TempDir::new().unwrap();
        let driver = driver_in(&temp_dir, RecordingExtractor::default(), unlimited(FailurePolicy::Ignore));
        let shutdown = GracefulShutdown::new_for_test();
        shutdown.request_shutdown();

        let report = driver
            .run(Cursor::new("/d/1.warc\n"), &shutdown, &|_| {})
            .await
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(report.processed(), 0);
        assert!(driver.extractor.sources().is_empty());
        assert!(temp_dir.path().join("extracted_files").is_dir());
    }

    #[tokio::test]
    async fn test_interrupt_keeps_finished_records_and_wins_over_abort() {
        let temp_dir = TempDir::new().unwrap();
        let shutdown = Rc::new(GracefulShutdown::new_for_test());
        let mut extractor = RecordingExtractor::with_outcomes(vec![ToolOutcome::Failed { exit_code: None }]);
        extractor.interrupt = Some(Rc::clone(&shutdown));
        let driver = driver_in(&temp_dir, extractor, unlimited(FailurePolicy::Abort));

        let report = driver
            .run(Cursor::new("/d/1.warc\n/d/2.warc\n"), &shutdown, &|_| {})
            .await
            .unwrap();

        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(report.processed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(driver.extractor.sources(), vec!["/d/1.warc"]);

        let path = temp_dir.path().join("partial.json");
        report.save_json(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["stop_reason"], "cancelled");
        assert_eq!(value["records"][0]["record"], "/d/1.warc");
    }

    #[tokio::test]
    async fn test_result_observes_output_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = RecordingExtractor {
            write_output: true,
            ..RecordingExtractor::default()
        };
        let driver = driver_in(&temp_dir, extractor, BatchSettings::default());
        let shutdown = GracefulShutdown::new_for_test();

        let report = driver
            .run(Cursor::new("/data/a.warc\n"), &shutdown, &|_| {})
            .await
            .unwrap();

        let result = &report.records[0];
        assert_eq!(result.output_bytes, Some(3));
        assert!(result.done_marker);
        assert_eq!(report.output_bytes(), 3);
    }

    #[tokio::test]
    async fn test_report_serializes_to_json() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = RecordingExtractor::with_outcomes(vec![ToolOutcome::TimedOut { seconds: 30 }]);
        let driver = driver_in(&temp_dir, extractor, BatchSettings::default());
        let shutdown = GracefulShutdown::new_for_test();

        let report = driver
            .run(Cursor::new("/data/a.warc\n"), &shutdown, &|_| {})
            .await
            .unwrap();

        let path = temp_dir.path().join("report.json");
        report.save_json(&path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["stop_reason"], "record_limit_reached");
        assert_eq!(value["on_failure"], "ignore");
        assert_eq!(value["records"][0]["outcome"]["status"], "timed_out");
        assert_eq!(value["records"][0]["outcome"]["seconds"], 30);
    }

    #[test]
    fn test_plan_respects_limit_and_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let driver = driver_in(&temp_dir, RecordingExtractor::default(), BatchSettings::default());

        let planned = driver.plan(Cursor::new("/d/1.warc\n/d/2.warc\n")).unwrap();

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].index, 1);
        assert_eq!(planned[0].command_line, "fake --warc-file /d/1.warc");
        assert!(!temp_dir.path().join("extracted_files").exists());
        assert!(driver.extractor.sources().is_empty());
    }
}
