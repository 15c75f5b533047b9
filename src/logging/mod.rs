//! Logging and diagnostic output control
//!
//! This module provides the [`Logger`] for controlling output verbosity and
//! formatting diagnostic lines. All diagnostics go to stderr: stdout is
//! reserved for the command result.
//!
//! Every logger carries a trace id generated once per run so that the debug
//! lines of one invocation can be told apart when several runs share a log.

use std::time::{Duration, Instant};
use uuid::Uuid;

/// Logger responsible for all diagnostic output
#[derive(Debug, Clone)]
pub struct Logger {
    pub verbose: bool,
    pub quiet: bool,
    pub start_time: Option<Instant>,
    trace_id: Uuid,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            start_time: Some(Instant::now()),
            trace_id: Uuid::new_v4(),
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
            start_time: Some(Instant::now()),
            trace_id: Uuid::new_v4(),
        }
    }

    pub fn trace_id(&self) -> &Uuid {
        &self.trace_id
    }

    // Structured logging levels
    pub fn debug(&self, message: &str) {
        if self.verbose && !self.quiet {
            eprintln!("{}", self.format_line("DEBUG", message));
        }
    }

    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            eprintln!("{}", self.format_line("INFO", message));
        }
    }

    /// Warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", self.format_line("WARN", message));
        }
    }

    /// Error message, printed even in quiet mode
    pub fn error(&self, message: &str) {
        if self.verbose {
            eprintln!("{}", self.format_line("ERROR", message));
        } else {
            eprintln!("Error: {}", message);
        }
    }

    /// Detailed information (only shown in verbose mode)
    pub fn detail(&self, message: &str) {
        if self.verbose && !self.quiet {
            eprintln!("   {}", message);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    /// Format file size in human-readable units
    pub fn format_size(&self, bytes: u64) -> String {
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else if bytes < 1024 * 1024 * 1024 {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        } else {
            format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
        }
    }

    /// Format duration in human-readable format
    pub fn format_duration(&self, duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs < 60 {
            format!("{:.2}s", duration.as_secs_f64())
        } else if secs < 3600 {
            format!("{}m{}s", secs / 60, secs % 60)
        } else {
            format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }

    fn format_line(&self, level: &str, message: &str) -> String {
        format!(
            "[{:8.3}s] {:<5} trace_id={} {}",
            self.elapsed().as_secs_f64(),
            level,
            self.trace_id,
            message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_logger_is_not_verbose() {
        let logger = Logger::new_quiet();
        assert!(logger.quiet);
        assert!(!logger.verbose);
    }

    #[test]
    fn test_trace_id_is_per_logger_and_kept_by_clones() {
        let a = Logger::new(true);
        let b = Logger::new(true);
        assert_ne!(a.trace_id(), b.trace_id());
        assert_eq!(a.clone().trace_id(), a.trace_id());
    }

    #[test]
    fn test_format_line_carries_level_and_trace_id() {
        let logger = Logger::new(true);
        let line = logger.format_line("DEBUG", "Parsing image reference");
        assert!(line.contains("DEBUG"));
        assert!(line.contains(&format!("trace_id={}", logger.trace_id())));
        assert!(line.ends_with("Parsing image reference"));
    }

    #[test]
    fn test_format_size() {
        let logger = Logger::new(false);
        assert_eq!(logger.format_size(512), "512 B");
        assert_eq!(logger.format_size(1536), "1.5 KB");
        assert_eq!(logger.format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_duration() {
        let logger = Logger::new(false);
        assert_eq!(logger.format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(logger.format_duration(Duration::from_secs(125)), "2m5s");
        assert_eq!(logger.format_duration(Duration::from_secs(3725)), "1h2m5s");
    }
}
