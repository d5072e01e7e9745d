pub mod cli;
pub mod config;
pub mod error;
pub mod services;

pub use error::{Error, Result};
pub use services::{
    cleanup::{perform_cleanup, perform_cleanup_at, CleanerConfig, CleanupReport},
    log::{LogSink, MemorySink, TracingSink},
    timer::{start, Scheduler, SchedulerHandle, SchedulerState},
};
