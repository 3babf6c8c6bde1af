use clap::Parser;
use std::process;
use warcbatch::{
    BatchReport, Cli, FailurePolicy, OutputFormatter, OutputMode, StopReason, UserFriendlyError,
    WarcBatch, WarcBatchError, WorkspaceLayout,
};

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let warcbatch = match WarcBatch::from_cli(&cli) {
        Ok(warcbatch) => warcbatch,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    let stdin = std::io::stdin();

    if cli.dry_run {
        return handle_dry_run(&warcbatch, stdin.lock());
    }

    match warcbatch.run_batch(stdin.lock()).await {
        Ok(report) => {
            if let Some(ref report_path) = cli.report {
                if let Err(e) = report.save_json(report_path) {
                    warcbatch.handle_error(&e);
                    return 1;
                }
            }

            if report.stop_reason == StopReason::Cancelled {
                warcbatch.handle_error(&WarcBatchError::Cancelled);
            }

            batch_exit_code(&report, warcbatch.config().batch.on_failure)
        }
        Err(e) => {
            warcbatch.handle_error(&e);
            1
        }
    }
}

/// Under the default `ignore` policy the status does not depend on how the
/// extractions went.
fn batch_exit_code(report: &BatchReport, policy: FailurePolicy) -> i32 {
    if report.stop_reason == StopReason::Cancelled {
        return 130; // Interrupted (SIGINT)
    }

    match policy {
        FailurePolicy::Ignore => 0,
        FailurePolicy::Report if report.failed() > 0 => 2,
        FailurePolicy::Abort if report.stop_reason == StopReason::FailureAbort => 3,
        _ => 0,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "warcbatch.toml".to_string());

    match WarcBatch::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  warcbatch --config {} < warc.paths", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run<R: std::io::BufRead>(warcbatch: &WarcBatch, input: R) -> i32 {
    let formatter = warcbatch.output_formatter();
    let config = warcbatch.config();

    formatter.print_header("DRY RUN - nothing will be extracted");

    println!(
        "  Working directory: {}",
        WorkspaceLayout::new(&config.paths).base_directory().display()
    );
    println!("  Extractor:         {} {}", config.tool.program, config.tool.args.join(" "));
    match config.record_limit() {
        Some(limit) => println!("  Record limit:      {}", limit),
        None => println!("  Record limit:      none"),
    }
    println!("  On failure:        {:?}", config.batch.on_failure);
    if let Some(timeout) = config.tool.timeout {
        println!("  Timeout:           {} seconds", timeout);
    }

    formatter.print_separator();

    let planned = match warcbatch.plan_batch(input) {
        Ok(planned) => planned,
        Err(e) => {
            warcbatch.handle_error(&e);
            return 1;
        }
    };

    for job in &planned {
        println!("{}. {}", job.index, job.record);
        println!("   output:  {}", job.job.outfile.display());
        println!("   command: {}", job.command_line);
    }

    formatter.print_separator();
    println!("{} file(s) would be extracted", planned.len());

    0
}

fn print_startup_error(error: &WarcBatchError) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
