//! Status reporting for operator-facing output.
//!
//! Components never print directly; they write to a [`StatusSink`]. The CLI
//! uses [`ConsoleSink`], tests use [`MemorySink`].

use std::sync::Mutex;

use colored::Colorize;

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Step,
    Info,
    Success,
    Warning,
    Error,
}

/// Destination for human-readable progress lines.
pub trait StatusSink: Send + Sync {
    /// Record a single line.
    fn emit(&self, level: Level, message: &str);

    /// Print a numbered step header.
    fn step(&self, current: u8, total: u8, message: &str) {
        self.emit(Level::Step, &format!("[{current}/{total}] {message}"));
    }

    fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn success(&self, message: &str) {
        self.emit(Level::Success, message);
    }

    fn warning(&self, message: &str) {
        self.emit(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }
}

/// Colored console output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn emit(&self, level: Level, message: &str) {
        match level {
            Level::Step => {
                println!();
                println!("{} {}", "▶".cyan(), message.bold());
            }
            Level::Info => println!("  {} {}", "ℹ".blue().bold(), message),
            Level::Success => println!("  {} {}", "✓".green().bold(), message.green()),
            Level::Warning => println!("  {} {}", "⚠".yellow().bold(), message.yellow()),
            Level::Error => eprintln!("  {} {}", "✗".red().bold(), message.red()),
        }
    }

    fn step(&self, current: u8, total: u8, message: &str) {
        println!();
        println!(
            "{} {} {}",
            format!("[{current}/{total}]").bright_black(),
            "▶".cyan(),
            message.bold()
        );
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", "═".repeat(60).bright_black());
    println!("{}", title.cyan().bold());
    println!("{}", "═".repeat(60).bright_black());
}

/// Print a key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("  {} {}", format!("{key}:").bright_black(), value.green());
}

/// Print a summary checklist line.
pub fn print_check_result(name: &str, passed: bool) {
    let status = if passed { "✓".green() } else { "✗".red() };
    println!("  {status} {name}");
}

/// In-memory sink that records every line.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines in order.
    #[must_use]
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Messages recorded at `level`.
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Whether any line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(_, m)| m.contains(needle))
    }
}

impl StatusSink for MemorySink {
    fn emit(&self, level: Level, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}
