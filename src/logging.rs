//! Tracing setup and the on-disk debug log
//!
//! Everything logged through `tracing` goes to stdout and, when it can be
//! opened, to `debug.log` in the cache root. The log survives cache clears.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Lines returned by `tail` when the caller does not ask for a number
pub const DEFAULT_TAIL_LINES: usize = 80;

/// Install the global subscriber
///
/// Falls back to stdout only when the log file cannot be opened.
pub fn init(log_path: &Path) {
    let parent = log_path.parent().unwrap_or_else(|| Path::new("."));
    let file = fs::create_dir_all(parent).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
    });

    let file_layer = match file {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        ),
        Err(ref e) => {
            eprintln!("debug log unavailable at {}: {}", log_path.display(), e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
}

/// Last `lines` lines of the debug log
pub fn tail(path: &Path, lines: usize) -> String {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return "debug.log not found".to_string(),
        Err(e) => return format!("debug.log unreadable: {}", e),
    };

    let all: Vec<&str> = content.lines().collect();
    if all.iter().all(|line| line.trim().is_empty()) {
        return "(empty)".to_string();
    }

    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

/// Truncate the debug log in place
///
/// The file stays open in the appender, which keeps writing at the new end.
pub fn clear(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = OpenOptions::new().write(true).truncate(true).open(path) {
        tracing::warn!("Failed to clear {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_tail_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(tail(&dir.path().join("debug.log"), 10), "debug.log not found");
    }

    #[test]
    fn test_tail_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debug.log");
        fs::write(&path, "\n\n").unwrap();
        assert_eq!(tail(&path, 10), "(empty)");
    }

    #[test]
    fn test_tail_last_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debug.log");
        let content: String = (1..=100).map(|i| format!("line {}\n", i)).collect();
        fs::write(&path, content).unwrap();

        let tailed = tail(&path, 3);
        assert_eq!(tailed, "line 98\nline 99\nline 100");
        assert_eq!(tail(&path, DEFAULT_TAIL_LINES).lines().count(), 80);
        assert_eq!(tail(&path, 500).lines().count(), 100);
    }

    #[test]
    fn test_clear_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debug.log");
        fs::write(&path, "something happened\n").unwrap();

        clear(&path);
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        assert_eq!(tail(&path, 5), "(empty)");
    }

    #[test]
    fn test_clear_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debug.log");
        clear(&path);
        assert!(!path.exists());
    }
}
