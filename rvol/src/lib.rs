//! Bulk remote-to-volume transfers
//!
//! `rvol` copies every object found at a remote source (anything `rclone` can read) onto a
//! durable destination volume. Each object is an independent job:
//!
//! 1. the source is listed once ([`listing`]),
//! 2. one [`job::TransferJob`] per listed name is dispatched to an [`executor::Executor`]
//!    without waiting ([`dispatch`]),
//! 3. each job copies its object with a single tool invocation ([`tool`]) and then commits the
//!    volume ([`volume`]); a job whose commit fails is a failed job,
//! 4. all handles are awaited and classified ([`aggregate`]) into a [`summary::RunSummary`].
//!
//! A failed or timed-out job never affects the others, and everything committed before an
//! interruption stays on the volume.
//!
//! # Concurrency
//!
//! Dispatch never blocks. Jobs wait inside the executor for a slot (`--max-concurrent-jobs`) and
//! a launch token (`--launch-throttle`); the per-job timeout (`--job-timeout`) starts once a job
//! holds its slot. A job that times out is cancelled and its transfer process killed.
//!
//! # Configuration
//!
//! The transfer tool config (an `rclone.conf`) is read once before listing and handed to every
//! job unchanged. Each tool invocation receives its own private copy in a temporary directory.
//! A leading `~` in the config path expands to `$HOME` and `%USERPROFILE%` is replaced with the
//! `USERPROFILE` environment variable.
//!
//! # Exit Status
//!
//! The `rvol` binary exits with 0 only when every listed object was copied and committed. Per-job
//! failures produce a summary and exit code 1; configuration and listing failures abort before
//! any job is dispatched, also with exit code 1.

pub mod aggregate;
pub mod config;
pub mod dispatch;
pub mod executor;
pub mod job;
pub mod listing;
pub mod locator;
pub mod run;
pub mod summary;
pub mod tool;
pub mod volume;
pub mod worker;

pub use run::{PlannedJob, RunReport, RunSettings, run};
