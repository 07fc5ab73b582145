//! Free-running millisecond counter, the equivalent of `millis()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub trait Millis: Send + Sync {
    /// Milliseconds elapsed since the timebase was started.
    fn millis(&self) -> u64;
}

/// Wall clock timebase for the host build.
#[derive(Debug, Clone, Copy)]
pub struct SystemMillis {
    start: Instant,
}

impl SystemMillis {
    pub fn new() -> Self {
        SystemMillis {
            start: Instant::now(),
        }
    }
}

impl Default for SystemMillis {
    fn default() -> Self {
        Self::new()
    }
}

impl Millis for SystemMillis {
    fn millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Hand-advanced timebase. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct ManualMillis {
    now: Arc<AtomicU64>,
}

impl ManualMillis {
    pub fn new(start: u64) -> Self {
        ManualMillis {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Millis for ManualMillis {
    fn millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<M: Millis + ?Sized> Millis for Arc<M> {
    fn millis(&self) -> u64 {
        (**self).millis()
    }
}
