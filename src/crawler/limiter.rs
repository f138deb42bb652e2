//! Global concurrency limiter
//!
//! A single semaphore caps in-flight requests across every depth of a stateless
//! crawl. Permits are RAII guards, so a request that errors or is cancelled still
//! gives its slot back. The limiter also tracks how many permits are out and the
//! highest number ever out at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Semaphore with in-flight and peak instrumentation
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Semaphore,
    ceiling: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// A held slot; released on drop
#[derive(Debug)]
pub struct LimiterPermit<'a> {
    _permit: SemaphorePermit<'a>,
    limiter: &'a ConcurrencyLimiter,
}

impl ConcurrencyLimiter {
    /// Creates a limiter allowing `ceiling` simultaneous holders (at least one)
    pub fn new(ceiling: usize) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            semaphore: Semaphore::new(ceiling),
            ceiling,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Waits for a free slot
    pub async fn acquire(&self) -> Result<LimiterPermit<'_>, AcquireError> {
        let permit = self.semaphore.acquire().await?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(LimiterPermit {
            _permit: permit,
            limiter: self,
        })
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Permits currently held
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits ever held at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for LimiterPermit<'_> {
    fn drop(&mut self) {
        self.limiter.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
