//! Completion aggregation
//!
//! Every handle is awaited exactly once and its result folded into a [`RunState`]. In dispatch
//! order the handles are awaited one after another; in completion order one waiter per handle
//! forwards results over a channel to the single loop that owns the state. Either way, awaiting
//! a handle never holds back another job, since all jobs are already running.

use std::time::Instant;

use crate::job::{JobHandle, JobLabel, JobResult};
use crate::summary::{FailedJob, RunSummary, TimedOutJob};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportOrder {
    /// report jobs in listing order
    #[default]
    Dispatch,
    /// report jobs as they finish
    Completion,
}

/// Per-run tally. Only the aggregation loop mutates it.
#[derive(Debug)]
pub struct RunState {
    total: usize,
    succeeded: usize,
    failed: usize,
    timed_out: usize,
    pending: usize,
    failures: Vec<FailedJob>,
    timed_out_jobs: Vec<TimedOutJob>,
    start: Instant,
}

impl RunState {
    pub fn new(total: usize, start: Instant) -> Self {
        Self {
            total,
            succeeded: 0,
            failed: 0,
            timed_out: 0,
            pending: total,
            failures: Vec::new(),
            timed_out_jobs: Vec::new(),
            start,
        }
    }

    fn check_invariant(&self) {
        debug_assert_eq!(
            self.succeeded + self.failed + self.timed_out + self.pending,
            self.total
        );
    }

    /// Folds in one job outcome and emits its log line.
    pub fn record(&mut self, label: JobLabel, result: JobResult) {
        debug_assert!(self.pending > 0, "more results than dispatched jobs");
        self.pending = self.pending.saturating_sub(1);
        match result {
            JobResult::Success => {
                tracing::info!("copied: {label}");
                self.succeeded += 1;
            }
            JobResult::Failure { reason } => {
                tracing::error!("failed: {label}: {reason}");
                self.failed += 1;
                self.failures.push(FailedJob {
                    index: label.index,
                    name: label.name,
                    source: label.source,
                    dest: label.dest.display().to_string(),
                    reason,
                });
            }
            JobResult::Timeout => {
                tracing::error!("timed out: {label}");
                self.timed_out += 1;
                self.timed_out_jobs.push(TimedOutJob {
                    index: label.index,
                    name: label.name,
                    source: label.source,
                    dest: label.dest.display().to_string(),
                });
            }
        }
        self.check_invariant();
    }

    pub fn into_summary(mut self) -> RunSummary {
        self.check_invariant();
        self.failures.sort_by_key(|failure| failure.index);
        self.timed_out_jobs.sort_by_key(|job| job.index);
        RunSummary {
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            timed_out: self.timed_out,
            pending: self.pending,
            elapsed: self.start.elapsed(),
            failures: self.failures,
            timed_out_jobs: self.timed_out_jobs,
        }
    }
}

/// Awaits every handle and returns the run summary.
#[tracing::instrument(skip(handles, start), fields(jobs = handles.len()))]
pub async fn aggregate(handles: Vec<JobHandle>, order: ReportOrder, start: Instant) -> RunSummary {
    let mut state = RunState::new(handles.len(), start);
    match order {
        ReportOrder::Dispatch => {
            for handle in handles {
                let (label, result) = handle.wait().await;
                state.record(label, result);
            }
        }
        ReportOrder::Completion => {
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            for handle in handles {
                let tx = tx.clone();
                tokio::spawn(async move {
                    // the receiver lives until every sender is gone
                    let _ = tx.send(handle.wait().await);
                });
            }
            drop(tx);
            while let Some((label, result)) = rx.recv().await {
                state.record(label, result);
            }
        }
    }
    state.into_summary()
}
