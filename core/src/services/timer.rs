use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::Level;

use super::cleanup::{perform_cleanup, CleanerConfig};

/// Lifecycle of an interval scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Held by a [`Scheduler`] that has not been started. A handle never
    /// reports it.
    Idle,
    Running,
    Stopped,
}

/// A configured scheduler that has not been started yet.
#[derive(Debug)]
pub struct Scheduler {
    config: CleanerConfig,
}

impl Scheduler {
    pub fn new(config: CleanerConfig) -> Self {
        Self { config }
    }

    /// Always [`SchedulerState::Idle`]; starting consumes the scheduler.
    pub fn state(&self) -> SchedulerState {
        SchedulerState::Idle
    }

    /// Spawn the background loop. Must be called from within a tokio runtime.
    ///
    /// The first pass runs after one full period. The stop signal is checked
    /// only when a wait completes, so stopping may take up to one period plus
    /// one in-flight pass.
    pub fn start(self) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let passes = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(run_interval(
            Arc::new(self.config),
            cancel.clone(),
            passes.clone(),
        ));
        SchedulerHandle {
            cancel,
            passes,
            task,
        }
    }
}

/// Start a scheduler for `config`.
pub fn start(config: CleanerConfig) -> SchedulerHandle {
    Scheduler::new(config).start()
}

/// Owner's handle to a running scheduler.
///
/// Dropping the handle leaves the loop running.
#[derive(Debug)]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    passes: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask the loop to exit at its next check point. Does not wait.
    /// Calling it again is a no-op.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> SchedulerState {
        if self.cancel.is_cancelled() || self.task.is_finished() {
            SchedulerState::Stopped
        } else {
            SchedulerState::Running
        }
    }

    /// Number of passes that have completed, whatever their outcome.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Wait until the background loop has exited.
    pub async fn join(self) {
        // JoinError only on runtime shutdown; nothing left to wait for
        let _ = self.task.await;
    }

    /// Stop the loop and wait for it to exit, unless `force` completes first.
    ///
    /// On `force` the task is aborted, even mid-wait. Returns true when the
    /// loop exited on its own.
    pub async fn shutdown<F>(mut self, force: F) -> bool
    where
        F: Future<Output = ()>,
    {
        self.stop();
        tokio::select! {
            _ = &mut self.task => true,
            _ = force => {
                self.task.abort();
                false
            }
        }
    }
}

async fn run_interval(
    config: Arc<CleanerConfig>,
    cancel: CancellationToken,
    passes: Arc<AtomicU64>,
) {
    loop {
        time::sleep(config.frequency).await;
        if cancel.is_cancelled() {
            config.log(Level::INFO, "Cleanup interval stopped");
            return;
        }

        let pass_config = config.clone();
        let outcome = tokio::task::spawn_blocking(move || perform_cleanup(&pass_config)).await;
        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => config.log(Level::WARN, &err.to_string()),
            Err(err) => config.log(Level::ERROR, &format!("cleanup pass aborted: {err}")),
        }
        passes.fetch_add(1, Ordering::SeqCst);
    }
}
