use std::sync::atomic::{AtomicBool, Ordering};

/// Switchable semaphore: when unconfigured (or configured with 0) every call is a no-op.
///
/// Used both as a concurrency limit (`acquire` returns a permit released on drop) and as a
/// token bucket (`consume` forgets the permit, `run_replenish_thread` tops it back up).
#[derive(Debug)]
pub struct Semaphore {
    enabled: AtomicBool,
    sem: tokio::sync::Semaphore,
}

impl Semaphore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            sem: tokio::sync::Semaphore::const_new(tokio::sync::Semaphore::MAX_PERMITS),
        }
    }

    /// Creates a semaphore already configured with `value` permits.
    #[must_use]
    pub fn with_limit(value: usize) -> Self {
        let sem = Self::new();
        sem.setup(value);
        sem
    }

    pub fn setup(&self, value: usize) {
        self.enabled.store(value > 0, Ordering::Release);
        if value == 0 {
            return;
        }
        self.sem.forget_permits(self.sem.available_permits());
        self.sem.add_permits(value);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub async fn acquire(&self) -> Option<tokio::sync::SemaphorePermit<'_>> {
        if !self.is_enabled() {
            return None;
        }
        // the underlying semaphore is never closed
        self.sem.acquire().await.ok()
    }

    pub async fn consume(&self) {
        if !self.is_enabled() {
            return;
        }
        if let Ok(permit) = self.sem.acquire().await {
            permit.forget();
        }
    }

    pub async fn run_replenish_thread(&self, replenish: usize, interval: std::time::Duration) {
        if !self.is_enabled() {
            return;
        }
        loop {
            tokio::time::sleep(interval).await;
            let curr_permits = self.sem.available_permits();
            if curr_permits >= replenish {
                continue;
            }
            self.sem.add_permits(replenish - curr_permits);
        }
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}
