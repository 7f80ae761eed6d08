use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::instrument;

use rvol_tools_rvol::aggregate::ReportOrder;
use rvol_tools_rvol::summary::{RunStatus, SummaryFormat};
use rvol_tools_rvol::tool::{ToolSettings, TransferTool};
use rvol_tools_rvol::volume::{CommandVolume, LocalVolume, Volume};
use rvol_tools_rvol::{RunReport, RunSettings};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rvol",
    version,
    about = "Copy every object at an rclone remote onto a durable volume, one job per file",
    long_about = "`rvol` lists a remote source once, then copies each listed object with its own `rclone copyto` invocation and commits the destination volume after every successful copy.

Jobs run in parallel and fail independently. At the end a summary is printed; the exit code is 0 only if every object was copied and committed.

EXAMPLES:
    # Copy a OneDrive folder into /data/photos
    rvol run --source onedrive:Photos --dest-subdir photos --config ~/.config/rclone/rclone.conf

    # Recursive copy, 16 transfers at a time, JSON summary
    rvol run --source s3:bucket/archive --dest-subdir archive --config rclone.conf --recursive --max-concurrent-jobs 16 --summary-format json

    # Show what would be copied
    rvol run --source gdrive:Docs --dest-subdir docs --config rclone.conf --dry-run"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// List the source and copy every object onto the volume
    Run(RunArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct RunArgs {
    // Transfer
    /// Source locator, e.g. "onedrive:Photos" or "s3:bucket/prefix"
    #[arg(long, value_name = "LOCATOR", help_heading = "Transfer")]
    source: String,

    /// Destination directory, relative to the volume mount
    #[arg(long, value_name = "PATH", help_heading = "Transfer")]
    dest_subdir: String,

    /// Path of the rclone config file (`~` and %USERPROFILE% are expanded)
    #[arg(long, value_name = "FILE", help_heading = "Transfer")]
    config: String,

    /// List the source recursively
    #[arg(short, long, help_heading = "Transfer")]
    recursive: bool,

    /// Where the destination volume is mounted
    #[arg(
        long,
        default_value = "/data",
        value_name = "PATH",
        help_heading = "Transfer"
    )]
    volume_mount: std::path::PathBuf,

    /// Transfer tool binary
    #[arg(
        long,
        default_value = "rclone",
        value_name = "PATH",
        help_heading = "Transfer"
    )]
    tool_path: std::path::PathBuf,

    /// Retries performed by the transfer tool for each file
    #[arg(long, default_value = "10", value_name = "N", help_heading = "Transfer")]
    retries: u32,

    /// Number of streams used for large files
    #[arg(long, default_value = "8", value_name = "N", help_heading = "Transfer")]
    multi_thread_streams: u32,

    /// Files above this size are transferred with multiple streams
    ///
    /// Accepts byte sizes like "64MiB", "1GiB", or plain numbers in bytes.
    #[arg(
        long,
        default_value = "64MiB",
        value_name = "SIZE",
        help_heading = "Transfer"
    )]
    multi_thread_cutoff: bytesize::ByteSize,

    /// In-memory buffer per transfer
    ///
    /// Accepts byte sizes like "128MiB", "1GiB", or plain numbers in bytes.
    #[arg(
        long,
        default_value = "128MiB",
        value_name = "SIZE",
        help_heading = "Transfer"
    )]
    buffer_size: bytesize::ByteSize,

    /// Extra arguments appended to every copy, whitespace separated (e.g. "--checksum --fast-list")
    #[arg(
        long,
        value_name = "ARGS",
        allow_hyphen_values = true,
        help_heading = "Transfer"
    )]
    extra_args: Option<String>,

    /// Only copy names matching this glob (can be repeated)
    #[arg(long, value_name = "PATTERN", help_heading = "Transfer")]
    include: Vec<String>,

    /// Skip names matching this glob (can be repeated, wins over --include)
    #[arg(long, value_name = "PATTERN", help_heading = "Transfer")]
    exclude: Vec<String>,

    /// Copy at most this many of the listed names
    #[arg(long, value_name = "N", help_heading = "Transfer")]
    max_files: Option<usize>,

    /// List and print the planned copies without running them
    #[arg(long, help_heading = "Transfer")]
    dry_run: bool,

    // Durability
    /// Command that commits the volume, run after each copy with the written path appended
    ///
    /// By default the written file and its directory are fsynced.
    #[arg(long, value_name = "COMMAND", help_heading = "Durability")]
    commit_command: Option<String>,

    // Scheduling
    /// Maximum number of transfers running at once (0 = unbounded)
    #[arg(
        long,
        default_value = "4",
        value_name = "N",
        help_heading = "Scheduling"
    )]
    max_concurrent_jobs: usize,

    /// Maximum number of transfers started per second (0 = no throttle)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Scheduling"
    )]
    launch_throttle: usize,

    /// Time limit for a single job, counted from when it starts running ("0s" = none)
    ///
    /// Accepts human-readable durations like "30min", "2h", "1day".
    #[arg(
        long,
        default_value = "24h",
        value_name = "DURATION",
        value_parser = humantime::parse_duration,
        help_heading = "Scheduling"
    )]
    job_timeout: std::time::Duration,

    /// Order in which job outcomes are reported
    #[arg(
        long,
        default_value = "dispatch",
        value_name = "ORDER",
        help_heading = "Scheduling"
    )]
    report_order: ReportOrder,

    // Progress & output
    /// Show progress
    #[arg(long, help_heading = "Progress & output")]
    progress: bool,

    /// Set the type of progress display
    ///
    /// If specified, --progress flag is implied.
    #[arg(long, value_name = "TYPE", help_heading = "Progress & output")]
    progress_type: Option<common::ProgressType>,

    /// Set delay between progress updates
    ///
    /// Default is 200ms for the progress bar and 10s for text updates. If specified, --progress flag is implied.
    #[arg(long, value_name = "DELAY", help_heading = "Progress & output")]
    progress_delay: Option<String>,

    /// Format of the final summary
    #[arg(
        long,
        default_value = "text",
        value_name = "FORMAT",
        help_heading = "Progress & output"
    )]
    summary_format: SummaryFormat,

    /// Verbose level: -v DEBUG / -vv TRACE (default: INFO)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, only report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // Advanced settings
    /// Number of worker threads (0 = number of CPU cores)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads (0 = Tokio default of 512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,
}

fn build_filter(args: &RunArgs) -> anyhow::Result<Option<common::filter::FilterSettings>> {
    if args.include.is_empty() && args.exclude.is_empty() {
        return Ok(None);
    }
    let mut filter = common::filter::FilterSettings::new();
    for pattern in &args.include {
        filter
            .add_include(pattern)
            .with_context(|| format!("invalid --include pattern {pattern:?}"))?;
    }
    for pattern in &args.exclude {
        filter
            .add_exclude(pattern)
            .with_context(|| format!("invalid --exclude pattern {pattern:?}"))?;
    }
    Ok(Some(filter))
}

fn build_volume(args: &RunArgs) -> anyhow::Result<std::sync::Arc<dyn Volume>> {
    match &args.commit_command {
        Some(command_line) => {
            let volume = CommandVolume::new(&args.volume_mount, command_line)
                .context("--commit-command must not be empty")?;
            Ok(std::sync::Arc::new(volume))
        }
        None => Ok(std::sync::Arc::new(LocalVolume::new(&args.volume_mount))),
    }
}

#[instrument]
async fn async_main(args: RunArgs) -> anyhow::Result<RunReport> {
    let settings = RunSettings {
        source: args.source.clone(),
        dest_subdir: args.dest_subdir.clone(),
        config_path: args.config.clone(),
        recursive: args.recursive,
        filter: build_filter(&args)?,
        max_files: args.max_files,
        job_timeout: (!args.job_timeout.is_zero()).then_some(args.job_timeout),
        report_order: args.report_order,
        dry_run: args.dry_run,
    };
    let tool = TransferTool::new(ToolSettings {
        tool_path: args.tool_path.clone(),
        retries: args.retries,
        multi_thread_streams: args.multi_thread_streams,
        multi_thread_cutoff: args.multi_thread_cutoff,
        buffer_size: args.buffer_size,
        extra_args: args
            .extra_args
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect(),
    });
    let volume = build_volume(&args)?;
    tracing::debug!("run settings: {:?}", &settings);
    let report = rvol_tools_rvol::run(&settings, tool, volume)
        .await
        .with_context(|| format!("transfer from {} aborted", settings.source))?;
    Ok(report)
}

fn print_report(report: &RunReport, format: SummaryFormat) -> anyhow::Result<bool> {
    match report {
        RunReport::DryRun(planned) => {
            for job in planned {
                println!("{} -> {}", job.source, job.dest);
            }
            Ok(true)
        }
        RunReport::Completed(summary) => {
            match format {
                SummaryFormat::Text => println!("{summary}"),
                SummaryFormat::Json => println!("{}", summary.to_json()?),
            }
            Ok(summary.status() == RunStatus::AllSucceeded)
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    let Command::Run(args) = Cli::parse().command;
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    let throttle = common::ThrottleConfig {
        max_concurrent_jobs: args.max_concurrent_jobs,
        launch_throttle: args.launch_throttle,
    };
    let progress = if args.progress || args.progress_type.is_some() || args.progress_delay.is_some()
    {
        Some(common::ProgressSettings {
            progress_type: args.progress_type.unwrap_or_default(),
            progress_delay: args.progress_delay.clone(),
        })
    } else {
        None
    };
    let report = common::run(progress, output, runtime, throttle, func);
    let Some(report) = report else {
        std::process::exit(1);
    };
    if !print_report(&report, args.summary_format)? {
        std::process::exit(1);
    }
    Ok(())
}
