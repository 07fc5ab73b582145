use crate::error::Result;
use log::debug;
use std::thread;

pub trait Scheduler {
    fn spawn<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static;
}

/// Runs each task on its own named OS thread.
pub struct ThreadScheduler;

impl ThreadScheduler {
    pub fn new() -> Self {
        ThreadScheduler
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ThreadScheduler {
    fn spawn<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        thread::Builder::new().name(name.to_string()).spawn(f)?;
        debug!("Spawned thread '{}'", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn test_thread_scheduler_spawn() {
        let scheduler = ThreadScheduler::new();
        let name = Arc::new(Mutex::new(None));
        let name_clone = name.clone();

        scheduler
            .spawn("worker", move || {
                *name_clone.lock().unwrap() = thread::current().name().map(str::to_string);
            })
            .unwrap();

        // Give the thread a moment to execute
        thread::sleep(Duration::from_millis(50));
        assert_eq!(name.lock().unwrap().as_deref(), Some("worker"));
    }
}
