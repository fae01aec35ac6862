//! Console output
//!
//! Up/down lines are output for the operator, not diagnostics, so they bypass
//! the tracing subscriber and go through this small seam instead.

use std::sync::Mutex;

pub trait Console: Send + Sync {
    fn line(&self, line: &str);
}

/// Prints every line to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn line(&self, line: &str) {
        println!("{line}");
    }
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl Console for MemoryConsole {
    fn line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
