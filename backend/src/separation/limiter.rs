//! Admission control for separation jobs
//!
//! Every job runs a heavyweight model, so only a bounded number run at once.
//! Further jobs wait in a bounded queue for a limited time before being
//! rejected with HTTP 429.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ExecutionConfig;
use crate::error::AppError;

/// Controls how many separation jobs run concurrently.
#[derive(Debug)]
pub struct JobLimiter {
    /// Semaphore controlling max concurrent jobs
    semaphore: Arc<Semaphore>,
    /// Current number of jobs waiting for a permit
    waiting_count: AtomicUsize,
    /// Maximum allowed waiting jobs (None = unlimited)
    max_waiting: Option<usize>,
    /// Maximum time to wait for a permit
    max_wait: Duration,
}

impl JobLimiter {
    /// Creates a new job limiter from configuration.
    ///
    /// If `max_concurrent_jobs` is 0, returns `None` (unlimited jobs).
    /// If `max_waiting_jobs` is 0, unlimited waiting is allowed.
    pub fn new(config: &ExecutionConfig) -> Option<Self> {
        if config.max_concurrent_jobs == 0 {
            return None;
        }

        Some(Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            waiting_count: AtomicUsize::new(0),
            max_waiting: (config.max_waiting_jobs > 0).then_some(config.max_waiting_jobs),
            max_wait: Duration::from_secs(config.queue_wait_secs),
        })
    }

    /// Jobs currently waiting for a slot
    pub fn waiting(&self) -> usize {
        self.waiting_count.load(Ordering::SeqCst)
    }

    /// Free job slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Attempts to acquire a permit for a separation job.
    ///
    /// Returns `Err(AppError::Busy)` if the waiting queue is full or the
    /// wait times out.
    pub async fn acquire(&self) -> Result<JobPermit, AppError> {
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Ok(JobPermit { _permit: permit });
        }

        let current_waiting = self.waiting_count.fetch_add(1, Ordering::SeqCst);
        // Leaves the queue on every exit path, including when this future is dropped.
        let _waiting = WaitingGuard {
            count: &self.waiting_count,
        };

        if let Some(max_waiting) = self.max_waiting {
            if current_waiting >= max_waiting {
                return Err(AppError::Busy(
                    "Too many separation jobs queued. Please retry later.".to_string(),
                ));
            }
        }

        // A permit may have been released between the first attempt and joining the queue.
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Ok(JobPermit { _permit: permit });
        }

        if self.max_wait.is_zero() {
            return Err(AppError::Busy(
                "All separation slots are busy. Please retry later.".to_string(),
            ));
        }

        match tokio::time::timeout(self.max_wait, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(JobPermit { _permit: permit }),
            Ok(Err(_)) => Err(AppError::Busy(
                "Separation service temporarily unavailable.".to_string(),
            )),
            Err(_) => Err(AppError::Busy(
                "Timed out waiting for a separation slot. Please retry later.".to_string(),
            )),
        }
    }
}

/// Holds one place in the waiting queue
struct WaitingGuard<'a> {
    count: &'a AtomicUsize,
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard that releases the job slot when dropped.
#[must_use]
pub struct JobPermit {
    _permit: OwnedSemaphorePermit,
}
