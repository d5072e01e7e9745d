use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn, Level};

/// Destination for the human-readable lines a cleaner emits.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(Level, &str) + Send + Sync,
{
    fn log(&self, level: Level, message: &str) {
        self(level, message)
    }
}

/// Forwards every line to the `tracing` macro matching its level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => error!(target: "dirjanitor", "{}", message),
            Level::WARN => warn!(target: "dirjanitor", "{}", message),
            Level::INFO => info!(target: "dirjanitor", "{}", message),
            Level::DEBUG => debug!(target: "dirjanitor", "{}", message),
            Level::TRACE => trace!(target: "dirjanitor", "{}", message),
        }
    }
}

/// Keeps every line in memory, for embedders that want to inspect a run.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines recorded so far.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().clone()
    }

    /// True if any recorded line at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        self.lines.lock().push((level, message.to_owned()));
    }
}

/// Map a level name to a level, falling back to `INFO` for unknown names.
pub fn parse_level(level: &str) -> Level {
    match level.to_ascii_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" => Level::WARN,
        "INFO" => Level::INFO,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}
