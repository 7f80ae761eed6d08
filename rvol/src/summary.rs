//! Run summary reporting

use std::time::Duration;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub enum RunStatus {
    AllSucceeded,
    PartialFailure,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RunStatus::AllSucceeded => write!(f, "AllSucceeded"),
            RunStatus::PartialFailure => write!(f, "PartialFailure"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FailedJob {
    pub index: usize,
    pub name: String,
    pub source: String,
    pub dest: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct TimedOutJob {
    pub index: usize,
    pub name: String,
    pub source: String,
    pub dest: String,
}

fn serialize_secs<S: serde::Serializer>(elapsed: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(elapsed.as_secs_f64())
}

#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub pending: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// failed jobs in dispatch order
    pub failures: Vec<FailedJob>,
    /// timed-out jobs in dispatch order
    pub timed_out_jobs: Vec<TimedOutJob>,
}

impl RunSummary {
    pub fn status(&self) -> RunStatus {
        if self.failed == 0
            && self.timed_out == 0
            && self.pending == 0
            && self.succeeded == self.total
        {
            RunStatus::AllSucceeded
        } else {
            RunStatus::PartialFailure
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(serde::Serialize)]
        struct WithStatus<'a> {
            status: RunStatus,
            #[serde(flatten)]
            summary: &'a RunSummary,
        }
        serde_json::to_string(&WithStatus {
            status: self.status(),
            summary: self,
        })
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // whole milliseconds keep the humantime rendering short
        let elapsed = Duration::from_millis(self.elapsed.as_millis() as u64);
        write!(
            f,
            "total: {}\n\
            succeeded: {}\n\
            failed: {}\n\
            timed out: {}\n\
            pending: {}\n\
            elapsed: {}\n\
            status: {}",
            self.total,
            self.succeeded,
            self.failed,
            self.timed_out,
            self.pending,
            humantime::format_duration(elapsed),
            self.status(),
        )?;
        if !self.failures.is_empty() {
            write!(f, "\nfailed jobs:")?;
            for failure in &self.failures {
                write!(
                    f,
                    "\n  {} -> {}: {}",
                    failure.source,
                    failure.dest,
                    failure.reason.lines().next().unwrap_or_default()
                )?;
            }
        }
        if !self.timed_out_jobs.is_empty() {
            write!(f, "\ntimed out jobs:")?;
            for job in &self.timed_out_jobs {
                write!(f, "\n  {} -> {}", job.source, job.dest)?;
            }
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SummaryFormat {
    #[default]
    Text,
    Json,
}
