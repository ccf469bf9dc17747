// Console sink
// Destination of the panic channel and of definition traces

use colored::Colorize;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Trace,
    Warn,
    Panic,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Warn => "WARN",
            Level::Panic => "PANIC",
        }
    }
}

pub trait Sink {
    fn emit(&self, level: Level, message: &str);
}

/// Writes to stderr
pub struct ConsoleSink {
    color: bool,
}

impl ConsoleSink {
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl Sink for ConsoleSink {
    fn emit(&self, level: Level, message: &str) {
        if !self.color {
            eprintln!("{} {}", level.label(), message);
            return;
        }
        let label = match level {
            Level::Trace => level.label().dimmed(),
            Level::Warn => level.label().yellow().bold(),
            Level::Panic => level.label().red().bold(),
        };
        eprintln!("{} {}", label, message);
    }
}

/// Buffers every line; for tests and embedders that collect diagnostics
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().clone()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Sink for MemorySink {
    fn emit(&self, level: Level, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}
