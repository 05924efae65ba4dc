use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use docoutline::{
    process_directory, BatchReport, ExtractorConfig, FileStatus, HeadingStrategy, ProcessReport,
    ProcessingMode, Processor,
};

#[derive(Parser)]
#[command(name = "docoutline", version, about = "Extract heading outlines and task sections from PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Logging verbosity
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Suppress output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json_output: bool,

    /// Heading detection strategy
    #[arg(long, value_enum, env = "DOCOUTLINE_STRATEGY", default_value_t = HeadingStrategy::Clustering, global = true)]
    strategy: HeadingStrategy,

    /// Reject documents with more pages than this
    #[arg(long, env = "DOCOUTLINE_MAX_PAGES", global = true)]
    max_pages: Option<usize>,

    /// Worker threads for batch mode (0 = one per core)
    #[arg(long, env = "DOCOUTLINE_JOBS", default_value_t = 0, global = true)]
    jobs: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the title and heading outline of a PDF
    Outline { input: PathBuf, output: PathBuf },
    /// Extract persona task sections from a PDF
    Persona { input: PathBuf, output: PathBuf },
    /// Process every PDF in a directory
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = ProcessingMode::Outline)]
        mode: ProcessingMode,
        /// Only look at the top level of the input directory
        #[arg(long)]
        no_recursive: bool,
        /// Maximum number of PDFs to pick up
        #[arg(long, default_value_t = docoutline::config::DEFAULT_MAX_FILES)]
        max_files: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Report {
    Single(ProcessReport),
    Batch(BatchReport),
}

impl Report {
    fn success(&self) -> bool {
        match self {
            Report::Single(r) => r.success,
            Report::Batch(r) => r.success,
        }
    }

    fn error(&self) -> Option<&str> {
        match self {
            Report::Single(r) => r.error.as_deref(),
            Report::Batch(r) => r.error.as_deref(),
        }
    }
}

fn main() {
    match run() {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Unexpected error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        LogLevel::Error
    } else {
        cli.log_level
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_filter()))
        .init();

    ctrlc::set_handler(|| {
        eprintln!("\nProcessing interrupted by user");
        process::exit(130);
    })
    .context("Failed to install interrupt handler")?;

    let mut config = ExtractorConfig::new()
        .with_strategy(cli.strategy)
        .with_jobs(cli.jobs);
    if let Some(max_pages) = cli.max_pages {
        config = config.with_max_pages(max_pages);
    }

    let report = match cli.command {
        Commands::Outline { input, output } => {
            Report::Single(Processor::new(config).process_outline(&input, &output))
        }
        Commands::Persona { input, output } => {
            Report::Single(Processor::new(config).process_task_sections(&input, &output))
        }
        Commands::Batch {
            input_dir,
            output_dir,
            mode,
            no_recursive,
            max_files,
        } => {
            let config = config.recursive(!no_recursive).with_max_files(max_files);
            Report::Batch(process_directory(&input_dir, &output_dir, mode, &config))
        }
    };

    print_report(&report, cli.quiet, cli.json_output)?;
    Ok(report.success())
}

fn print_report(report: &Report, quiet: bool, json_output: bool) -> Result<()> {
    if json_output {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize results")?;
        println!("{}", json);
        return Ok(());
    }

    if !(quiet && report.success()) {
        match report {
            Report::Batch(batch) => print_batch(batch, quiet),
            Report::Single(single) => print_single(single),
        }
    }

    if !report.success() {
        if let Some(error) = report.error() {
            eprintln!("Error: {}", error);
        }
    }
    Ok(())
}

fn print_batch(batch: &BatchReport, quiet: bool) {
    println!("Batch processing completed in {}s", batch.total_time);
    println!("Files processed: {}", batch.total_files);
    println!("Successful: {}", batch.successful);
    println!("Failed: {}", batch.failed);

    if !quiet {
        for file in &batch.processed_files {
            let symbol = match file.status {
                FileStatus::Success => "✓",
                FileStatus::Failed => "✗",
            };
            println!("  {} {} ({}s)", symbol, display_name(&file.file), file.execution_time);
        }
    }
}

fn print_single(report: &ProcessReport) {
    let status = if report.success { "✓" } else { "✗" };
    println!("{} Processing completed in {}s", status, report.execution_time);

    if let Some(items) = report.outline_items {
        println!("  - Found {} outline items", items);
        println!(
            "  - Document title: {}",
            report.document_title.as_deref().unwrap_or_default()
        );
    }
    if let Some(sections) = report.sections_found {
        println!("  - Found {} task sections", sections);
    }
    if let Some(summary) = &report.summary {
        let join = |items: Vec<String>| items.join(", ");
        println!(
            "  - Task types: {}",
            join(summary.task_types.iter().map(|t| t.to_string()).collect())
        );
        println!("  - Average relevance: {}", summary.avg_relevance);
        println!(
            "  - Section types: {}",
            join(summary.section_types.iter().map(|t| t.to_string()).collect())
        );
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
