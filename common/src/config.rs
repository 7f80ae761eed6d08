//! Configuration types for runtime and execution settings

/// Runtime configuration for tokio and thread pools
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeConfig {
    /// Number of worker threads (0 = number of CPU cores)
    pub max_workers: usize,
    /// Number of blocking threads (0 = tokio default of 512)
    pub max_blocking_threads: usize,
}

/// Throttling configuration for job admission
#[derive(Debug, Clone, Copy, Default)]
pub struct ThrottleConfig {
    /// Maximum number of transfer jobs running at once (0 = unbounded)
    pub max_concurrent_jobs: usize,
    /// Maximum number of jobs started per second (0 = no throttle)
    pub launch_throttle: usize,
}

impl ThrottleConfig {
    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_jobs > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(format!(
                "max_concurrent_jobs must not exceed {}",
                tokio::sync::Semaphore::MAX_PERMITS
            ));
        }
        Ok(())
    }
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Only report errors
    pub quiet: bool,
    /// Verbosity level on top of the default INFO: 1=DEBUG, 2+=TRACE
    pub verbose: u8,
}

impl OutputConfig {
    /// Default log directive derived from the quiet/verbose flags (overridden by `RUST_LOG`)
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_verbose() {
        let output = OutputConfig {
            quiet: true,
            verbose: 2,
        };
        assert_eq!(output.log_level(), "error");
    }

    #[test]
    fn verbosity_levels() {
        let level = |verbose| OutputConfig {
            quiet: false,
            verbose,
        }
        .log_level();
        assert_eq!(level(0), "info");
        assert_eq!(level(1), "debug");
        assert_eq!(level(5), "trace");
    }

    #[test]
    fn default_throttle_is_valid() {
        assert!(ThrottleConfig::default().validate().is_ok());
    }
}
