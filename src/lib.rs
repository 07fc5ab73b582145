pub mod cli;
pub mod config;
pub mod controls;
pub mod display;
pub mod encoder;
pub mod error;
pub mod event_loop;
pub mod interrupt;
pub mod logging;
pub mod midi;
pub mod scheduler;
pub mod timebase;
pub mod timer;

pub use cli::Args;
pub use error::{Error, Result};
pub use scheduler::{Scheduler, ThreadScheduler};

pub fn create_scheduler() -> ThreadScheduler {
    ThreadScheduler::new()
}
