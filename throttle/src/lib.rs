//! Job admission limits and launch rate throttling
//!
//! `rvol` dispatches one job per listed object without blocking, so something has to stand
//! between a listing of a million names and a million concurrent transfer processes. This crate
//! provides the two knobs used for that:
//!
//! 1. **Job slots** - an upper bound on the number of transfer jobs running at the same time.
//!    A job acquires a slot before it starts and releases it when it finishes.
//! 2. **Launch throttle** - an upper bound on the number of jobs *started* per second, implemented
//!    as a token bucket that is replenished by a background task.
//!
//! Both are disabled (no-ops) until configured with a non-zero value.
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! # async fn example() {
//! // at most 4 transfers in flight, at most 20 new ones per second
//! throttle::set_max_concurrent_jobs(4);
//! throttle::init_launch_tokens(20);
//! let (tokens, interval) = throttle::replenish_schedule(20);
//! tokio::spawn(throttle::run_launch_replenish_thread(tokens, interval));
//!
//! let slots = throttle::job_slots();
//! let launches = throttle::launch_tokens();
//! let _slot = slots.acquire().await;
//! launches.consume().await;
//! // run the job here - the slot is released when `_slot` is dropped
//! # }
//! ```
//!
//! # Replenishment Strategy
//!
//! A rate of `N` launches per second is delivered as `N / 10` tokens every 100ms when `N >= 10`,
//! otherwise as 1 token every `1s / N`. This keeps bursts small without waking the replenish task
//! more often than ten times per second.
//!
//! Components that need their own isolated limits (tests, embedding) can create a
//! [`Semaphore`] directly instead of using the process-wide instances.

mod semaphore;

pub use semaphore::Semaphore;

use std::sync::Arc;

static JOB_SLOTS: std::sync::LazyLock<Arc<Semaphore>> =
    std::sync::LazyLock::new(|| Arc::new(Semaphore::new()));
static LAUNCH_THROTTLE: std::sync::LazyLock<Arc<Semaphore>> =
    std::sync::LazyLock::new(|| Arc::new(Semaphore::new()));

pub fn set_max_concurrent_jobs(max_jobs: usize) {
    JOB_SLOTS.setup(max_jobs);
}

/// Process-wide job slot limit configured by [`set_max_concurrent_jobs`].
#[must_use]
pub fn job_slots() -> Arc<Semaphore> {
    JOB_SLOTS.clone()
}

pub fn init_launch_tokens(launch_tokens: usize) {
    LAUNCH_THROTTLE.setup(launch_tokens);
}

/// Process-wide launch token bucket configured by [`init_launch_tokens`].
#[must_use]
pub fn launch_tokens() -> Arc<Semaphore> {
    LAUNCH_THROTTLE.clone()
}

pub async fn run_launch_replenish_thread(replenish: usize, interval: std::time::Duration) {
    LAUNCH_THROTTLE
        .run_replenish_thread(replenish, interval)
        .await;
}

/// Translates a per-second rate into `(tokens per interval, interval)`.
///
/// A rate of 0 yields `(0, 1s)`; callers treat 0 tokens as "throttle disabled".
#[must_use]
pub fn replenish_schedule(per_second: usize) -> (usize, std::time::Duration) {
    match per_second {
        0 => (0, std::time::Duration::from_secs(1)),
        1..=9 => (
            1,
            std::time::Duration::from_secs(1) / u32::try_from(per_second).unwrap_or(1),
        ),
        _ => (per_second / 10, std::time::Duration::from_millis(100)),
    }
}
