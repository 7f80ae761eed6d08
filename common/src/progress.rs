/// Event counter sharded per thread, so job tasks on different workers never contend.
#[derive(Debug, Default)]
pub struct ShardedCounter {
    shards: thread_local::ThreadLocal<std::sync::atomic::AtomicU64>,
}

impl ShardedCounter {
    pub fn inc(&self) {
        self.shards
            .get_or_default()
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.shards
            .iter()
            .map(|shard| shard.load(std::sync::atomic::Ordering::Relaxed))
            .sum()
    }
}

/// Marks a job as running until dropped.
pub struct RunningJob<'a> {
    progress: &'a Progress,
}

impl Drop for RunningJob<'_> {
    fn drop(&mut self) {
        self.progress.jobs_finished.inc();
    }
}

/// Live counters for one orchestrator process.
///
/// These feed the periodic progress display only; the authoritative per-run tally is kept by
/// the completion aggregator.
#[derive(Debug)]
pub struct Progress {
    pub jobs_dispatched: ShardedCounter,
    pub jobs_rejected: ShardedCounter,
    pub copies_succeeded: ShardedCounter,
    pub commits_succeeded: ShardedCounter,
    pub jobs_failed: ShardedCounter,
    pub jobs_timed_out: ShardedCounter,
    jobs_started: ShardedCounter,
    jobs_finished: ShardedCounter,
    start_time: std::time::Instant,
}

/// Point-in-time view of [`Progress`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub dispatched: u64,
    pub started: u64,
    pub finished: u64,
    pub copied: u64,
    pub committed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub rejected: u64,
}

impl Snapshot {
    /// dispatched jobs still waiting for a slot
    pub fn queued(&self) -> u64 {
        self.dispatched.saturating_sub(self.started)
    }

    pub fn running(&self) -> u64 {
        self.started.saturating_sub(self.finished)
    }
}

impl Progress {
    pub fn new() -> Self {
        Self {
            jobs_dispatched: Default::default(),
            jobs_rejected: Default::default(),
            copies_succeeded: Default::default(),
            commits_succeeded: Default::default(),
            jobs_failed: Default::default(),
            jobs_timed_out: Default::default(),
            jobs_started: Default::default(),
            jobs_finished: Default::default(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Counts a job as started; it counts as finished once the returned guard drops.
    pub fn job_started(&self) -> RunningJob<'_> {
        self.jobs_started.inc();
        RunningJob { progress: self }
    }

    pub fn snapshot(&self) -> Snapshot {
        // read finished first: a job finishing between the two reads must not show as negative
        let finished = self.jobs_finished.get();
        let started = self.jobs_started.get().max(finished);
        Snapshot {
            dispatched: self.jobs_dispatched.get(),
            started,
            finished,
            copied: self.copies_succeeded.get(),
            committed: self.commits_succeeded.get(),
            failed: self.jobs_failed.get(),
            timed_out: self.jobs_timed_out.get(),
            rejected: self.jobs_rejected.get(),
        }
    }

    pub fn get_duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ProgressPrinter<'a> {
    progress: &'a Progress,
    last_finished: u64,
    last_update: std::time::Instant,
}

impl<'a> ProgressPrinter<'a> {
    pub fn new(progress: &'a Progress) -> Self {
        Self {
            progress,
            last_finished: progress.snapshot().finished,
            last_update: std::time::Instant::now(),
        }
    }

    pub fn print(&mut self) -> String {
        let now = std::time::Instant::now();
        let snapshot = self.progress.snapshot();
        let average_rate = snapshot.finished as f64 / self.progress.get_duration().as_secs_f64();
        let current_rate = (snapshot.finished - self.last_finished) as f64
            / (now - self.last_update).as_secs_f64();
        self.last_finished = snapshot.finished;
        self.last_update = now;
        format!(
            "-----------------------\n\
            JOBS:\n\
            dispatched: {:>10}\n\
            queued:     {:>10}\n\
            running:    {:>10}\n\
            finished:   {:>10}\n\
            average:    {:>10.2} jobs/s\n\
            current:    {:>10.2} jobs/s\n\
            -----------------------\n\
            OUTCOMES:\n\
            copied:     {:>10}\n\
            committed:  {:>10}\n\
            failed:     {:>10}\n\
            timed out:  {:>10}\n\
            rejected:   {:>10}",
            snapshot.dispatched,
            snapshot.queued(),
            snapshot.running(),
            snapshot.finished,
            average_rate,
            current_rate,
            snapshot.copied,
            snapshot.committed,
            snapshot.failed,
            snapshot.timed_out,
            snapshot.rejected,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_across_threads() {
        let counter = ShardedCounter::default();
        std::thread::scope(|scope| {
            for _ in 0..10 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        counter.inc();
                    }
                });
            }
        });
        counter.inc();
        assert_eq!(counter.get(), 1001);
    }

    #[test]
    fn running_job_guard_moves_job_to_finished() {
        let progress = Progress::new();
        progress.jobs_dispatched.inc();
        progress.jobs_dispatched.inc();
        {
            let _job = progress.job_started();
            let snapshot = progress.snapshot();
            assert_eq!((snapshot.queued(), snapshot.running()), (1, 1));
        }
        let snapshot = progress.snapshot();
        assert_eq!((snapshot.queued(), snapshot.running()), (1, 0));
        assert_eq!(snapshot.finished, 1);
    }

    #[test]
    fn snapshot_never_reports_more_finished_than_started() {
        let progress = Progress::new();
        // a finish observed without its start, as a racing reader could see it
        progress.jobs_finished.inc();
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.started, 1);
        assert_eq!(snapshot.running(), 0);
    }

    #[test]
    fn printer_reports_outcomes() {
        let progress = Progress::new();
        for _ in 0..3 {
            progress.jobs_dispatched.inc();
        }
        {
            let _job = progress.job_started();
            progress.copies_succeeded.inc();
            progress.commits_succeeded.inc();
        }
        progress.jobs_failed.inc();
        let mut printer = ProgressPrinter::new(&progress);
        let text = printer.print();
        assert!(text.contains("dispatched:          3"));
        assert!(text.contains("queued:              2"));
        assert!(text.contains("committed:           1"));
        assert!(text.contains("failed:              1"));
    }
}
