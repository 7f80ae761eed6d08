//! Shared harness for the rvol tools
//!
//! Every rvol binary follows the same shape: parse arguments, translate them into the plain
//! configuration structs from [`config`], and hand an async entry point to [`run`]. The harness
//! owns the process-level concerns:
//!
//! - logging (`tracing-subscriber` with an `EnvFilter`; `RUST_LOG` overrides the `-v`/`-q` flags),
//! - the tokio runtime (worker and blocking thread counts),
//! - job admission throttles from the `throttle` crate,
//! - the optional periodic progress display.
//!
//! ```rust,no_run
//! let res = common::run(
//!     None,
//!     common::OutputConfig::default(),
//!     common::RuntimeConfig::default(),
//!     common::ThrottleConfig::default(),
//!     || async { Ok::<_, anyhow::Error>("done") },
//! );
//! if res.is_none() {
//!     std::process::exit(1);
//! }
//! ```

use std::io::IsTerminal;

pub mod config;
pub mod filter;
pub mod progress;

pub use config::{OutputConfig, RuntimeConfig, ThrottleConfig};

static PROGRESS: std::sync::LazyLock<progress::Progress> =
    std::sync::LazyLock::new(progress::Progress::new);

/// Process-wide progress counters shown by the progress display.
pub fn get_progress() -> &'static progress::Progress {
    &PROGRESS
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ProgressType {
    /// animated bar on a terminal, text updates otherwise
    #[default]
    #[value(alias = "Auto")]
    Auto,
    /// animated progress bar
    #[value(name = "progress-bar", alias = "ProgressBar")]
    ProgressBar,
    /// periodic log lines, appropriate for non-interactive runs
    #[value(name = "text-updates", alias = "TextUpdates")]
    TextUpdates,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressSettings {
    pub progress_type: ProgressType,
    /// human readable delay between updates, e.g. "200ms", "10s"
    pub progress_delay: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum HarnessError {
    #[error("invalid throttle settings: {0}")]
    Throttle(String),
    #[error("invalid progress delay {delay:?}: {source}")]
    ProgressDelay {
        delay: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("failed to build tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

fn init_logging(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.log_level()));
    // a subscriber may already be installed (e.g. by tests); keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

fn build_runtime(runtime: &RuntimeConfig) -> Result<tokio::runtime::Runtime, HarnessError> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    if runtime.max_blocking_threads > 0 {
        builder.max_blocking_threads(runtime.max_blocking_threads);
    }
    builder.build().map_err(HarnessError::Runtime)
}

enum ProgressDisplay {
    Bar(indicatif::ProgressBar),
    Text,
}

struct ProgressReporter {
    stop: tokio::sync::oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl ProgressReporter {
    fn resolve(settings: &ProgressSettings) -> Result<(ProgressType, std::time::Duration), HarnessError> {
        let progress_type = match settings.progress_type {
            ProgressType::Auto => {
                if std::io::stderr().is_terminal() {
                    ProgressType::ProgressBar
                } else {
                    ProgressType::TextUpdates
                }
            }
            other => other,
        };
        let delay = match &settings.progress_delay {
            Some(delay) => humantime::parse_duration(delay).map_err(|source| {
                HarnessError::ProgressDelay {
                    delay: delay.clone(),
                    source,
                }
            })?,
            None if progress_type == ProgressType::ProgressBar => {
                std::time::Duration::from_millis(200)
            }
            None => std::time::Duration::from_secs(10),
        };
        Ok((progress_type, delay))
    }

    fn start(progress_type: ProgressType, delay: std::time::Duration) -> Self {
        let display = if progress_type == ProgressType::ProgressBar {
            let bar = indicatif::ProgressBar::new(0);
            if let Ok(style) = indicatif::ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] {wide_bar} {pos}/{len} jobs {msg}",
            ) {
                bar.set_style(style);
            }
            ProgressDisplay::Bar(bar)
        } else {
            ProgressDisplay::Text
        };
        let (stop, mut stopped) = tokio::sync::oneshot::channel();
        let task = tokio::spawn(async move {
            let progress = get_progress();
            let mut printer = progress::ProgressPrinter::new(progress);
            let mut interval = tokio::time::interval(delay);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = &mut stopped => break,
                }
                match &display {
                    ProgressDisplay::Bar(bar) => {
                        let snapshot = progress.snapshot();
                        bar.set_length(snapshot.dispatched);
                        bar.set_position(snapshot.finished);
                        bar.set_message(format!(
                            "failed: {} timed out: {}",
                            snapshot.failed, snapshot.timed_out
                        ));
                    }
                    ProgressDisplay::Text => {
                        tracing::info!("progress:\n{}", printer.print());
                    }
                }
            }
            if let ProgressDisplay::Bar(bar) = &display {
                bar.finish_and_clear();
            }
        });
        Self { stop, task }
    }

    async fn finish(self) {
        let _ = self.stop.send(());
        if let Err(error) = self.task.await {
            tracing::warn!("progress reporter failed: {error}");
        }
    }
}

/// Runs `func` to completion inside a freshly configured runtime.
///
/// Returns `None` if the harness could not be set up or `func` returned an error; the error is
/// logged before returning.
pub fn run<Fut, T, E>(
    progress: Option<ProgressSettings>,
    output: OutputConfig,
    runtime: RuntimeConfig,
    throttle_config: ThrottleConfig,
    func: impl FnOnce() -> Fut,
) -> Option<T>
where
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    init_logging(&output);
    let setup = || -> Result<_, HarnessError> {
        throttle_config.validate().map_err(HarnessError::Throttle)?;
        let progress = progress
            .as_ref()
            .map(ProgressReporter::resolve)
            .transpose()?;
        Ok((progress, build_runtime(&runtime)?))
    };
    let (progress, rt) = match setup() {
        Ok(setup) => setup,
        Err(error) => {
            tracing::error!("{:#}", error);
            return None;
        }
    };
    let res = rt.block_on(async move {
        throttle::set_max_concurrent_jobs(throttle_config.max_concurrent_jobs);
        throttle::init_launch_tokens(throttle_config.launch_throttle);
        let replenish = if throttle_config.launch_throttle > 0 {
            let (tokens, interval) = throttle::replenish_schedule(throttle_config.launch_throttle);
            Some(tokio::spawn(throttle::run_launch_replenish_thread(
                tokens, interval,
            )))
        } else {
            None
        };
        let reporter =
            progress.map(|(progress_type, delay)| ProgressReporter::start(progress_type, delay));
        let res = func().await;
        if let Some(reporter) = reporter {
            reporter.finish().await;
        }
        if let Some(replenish) = replenish {
            replenish.abort();
        }
        res
    });
    match res {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::error!("{:#}", error);
            None
        }
    }
}
