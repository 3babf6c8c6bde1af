use crate::config::FailurePolicy;
use crate::driver::{BatchReport, RecordResult};
use crate::error::{UserFriendlyError, WarcBatchError};
use crate::input::InputRecord;
use crate::ui::progress::format_duration;
use crate::ui::ProgressManager;
use console::{style, Emoji, Term};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    // Core messaging methods
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    // Per-record progress lines
    pub fn record_started(&self, index: usize, record: &InputRecord, output_path: &Path) {
        if !self.should_show_message(0) {
            return;
        }

        match self.mode {
            OutputMode::Human if self.use_colors => {
                println!("Begin extracting file {}: {}", style(index).bold(), style(record).cyan());
            }
            OutputMode::Human | OutputMode::Plain => {
                println!("{}", started_line(index, record.as_str()));
            }
            OutputMode::Json => self.print_json_object(&serde_json::json!({
                "type": "record_started",
                "index": index,
                "record": record.as_str(),
                "output": output_path.display().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        }
    }

    /// Under [`FailurePolicy::Ignore`] the completion line is printed whatever
    /// the outcome; the other policies report failures on stderr instead.
    pub fn record_finished(&self, result: &RecordResult, policy: FailurePolicy) {
        if self.mode == OutputMode::Json {
            if self.should_show_message(0) {
                self.print_json_object(&serde_json::json!({
                    "type": "record_finished",
                    "index": result.index,
                    "record": result.record,
                    "output": result.output_path.display().to_string(),
                    "outcome": result.outcome,
                    "duration_ms": result.duration.as_millis() as u64,
                    "output_bytes": result.output_bytes,
                    "done_marker": result.done_marker,
                    "timestamp": chrono::Utc::now().to_rfc3339()
                }));
            }
            return;
        }

        if result.outcome.is_success() || policy == FailurePolicy::Ignore {
            if !self.should_show_message(0) {
                return;
            }

            if self.use_colors {
                println!(
                    "Done extracting file {}: {}",
                    style(result.index).bold(),
                    style(&result.record).cyan()
                );
            } else {
                println!("{}", finished_line(result.index, &result.record));
            }
        } else {
            self.error(&format!(
                "Failed extracting file {}: {} ({})",
                result.index,
                result.record,
                result.outcome.describe()
            ));
        }
    }

    // User-friendly error handling
    pub fn print_user_friendly_error(&self, error: &WarcBatchError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    // Summary and reporting
    pub fn print_batch_summary(&self, report: &BatchReport) {
        match self.mode {
            OutputMode::Json => {
                if !self.quiet {
                    self.print_json_summary(report);
                }
            }
            _ if !self.should_show_message(1) => {}
            OutputMode::Human => self.print_human_summary(report),
            OutputMode::Plain => self.print_plain_summary(report),
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}{}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {} // No separator in JSON mode
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_summary(&self, report: &BatchReport) {
        self.print_separator();

        if self.use_colors {
            println!("{}{}", CHECKMARK, style("Batch finished").green().bold());
        } else {
            println!("✓ Batch finished");
        }

        let highlight = |value: String| {
            if self.use_colors {
                style(value).cyan().bold().to_string()
            } else {
                value
            }
        };

        println!("  Files processed: {}", highlight(report.processed().to_string()));
        println!("  Succeeded:       {}", highlight(report.succeeded().to_string()));
        println!("  Failed:          {}", highlight(report.failed().to_string()));
        println!("  Output written:  {}", highlight(format_bytes(report.output_bytes())));
        println!("  Time taken:      {}", highlight(format_duration(report.elapsed())));
        println!("  Output folder:   {}", report.output_directory.display());

        for failure in report.failures() {
            println!(
                "  - file {} ({}): {}",
                failure.index,
                failure.record,
                failure.outcome.describe()
            );
        }

        self.print_separator();
    }

    fn print_json_summary(&self, report: &BatchReport) {
        self.print_json_object(&serde_json::json!({
            "type": "summary",
            "processed": report.processed(),
            "succeeded": report.succeeded(),
            "failed": report.failed(),
            "output_bytes": report.output_bytes(),
            "duration_ms": report.elapsed().as_millis() as u64,
            "stop_reason": report.stop_reason,
            "output_directory": report.output_directory.display().to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_plain_summary(&self, report: &BatchReport) {
        println!("COMPLETED: Batch extraction");
        println!("Files processed: {}", report.processed());
        println!("Succeeded: {}", report.succeeded());
        println!("Failed: {}", report.failed());
        println!("Output bytes: {}", report.output_bytes());
        println!("Duration: {:?}", report.elapsed());
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Error,
    Warning,
    Info,
}

pub fn started_line(index: usize, record: &str) -> String {
    format!("Begin extracting file {}: {}", index, record)
}

pub fn finished_line(index: usize, record: &str) -> String {
    format!("Done extracting file {}: {}", index, record)
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

// Progress-aware output wrapper
pub struct ProgressAwareOutput<'a> {
    formatter: &'a OutputFormatter,
    progress_manager: Option<&'a ProgressManager>,
}

impl<'a> ProgressAwareOutput<'a> {
    pub fn new(formatter: &'a OutputFormatter, progress_manager: Option<&'a ProgressManager>) -> Self {
        Self {
            formatter,
            progress_manager,
        }
    }

    pub fn suspend_and_print<F>(&self, f: F)
    where
        F: FnOnce(&OutputFormatter),
    {
        if let Some(pm) = self.progress_manager {
            pm.suspend(|| f(self.formatter));
        } else {
            f(self.formatter);
        }
    }

    pub fn warning(&self, message: &str) {
        self.suspend_and_print(|f| f.warning(message));
    }

    pub fn debug(&self, message: &str) {
        self.suspend_and_print(|f| f.debug(message));
    }
}
