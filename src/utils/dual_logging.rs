use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use super::app_paths::AppPaths;
use super::logging::{LogEntry, LogRingBuffer};

/// Global dual logger instance
static DUAL_LOGGER: OnceLock<DualLogger> = OnceLock::new();

fn fallback_log_dir() -> PathBuf {
    std::env::temp_dir().join("candygram")
}

/// Writes every log line to an in-memory ring buffer and a log file
pub struct DualLogger {
    ring_buffer: LogRingBuffer,
    log_file: Arc<Mutex<Option<File>>>,
    log_path: PathBuf,
}

impl DualLogger {
    pub fn new(ring_buffer: LogRingBuffer) -> Self {
        let log_dir = AppPaths::log_dir().unwrap_or_else(|_| fallback_log_dir());
        let _ = std::fs::create_dir_all(&log_dir);

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("candygram_{}.log", timestamp));

        #[cfg(unix)]
        {
            let latest_path = log_dir.join("latest.log");
            let _ = std::fs::remove_file(&latest_path);
            let _ = std::os::unix::fs::symlink(&log_path, &latest_path);
        }

        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .ok();

        Self {
            ring_buffer,
            log_file: Arc::new(Mutex::new(log_file)),
            log_path,
        }
    }

    /// Record an already-parsed entry
    pub fn log(&self, entry: LogEntry) {
        if let Ok(mut file_opt) = self.log_file.lock() {
            if let Some(ref mut file) = *file_opt {
                let _ = writeln!(file, "{}", entry.format_for_display());
                let _ = file.flush();
            }
        }

        if std::env::var("CANDYGRAM_DEBUG").is_ok() {
            eprintln!("{}", entry.format_for_display());
        }

        self.ring_buffer.push(entry);
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }

    pub fn flush(&self) {
        if let Ok(mut file_opt) = self.log_file.lock() {
            if let Some(ref mut file) = *file_opt {
                let _ = file.flush();
            }
        }
    }
}

/// Initialize the global dual logger
pub fn init_dual_logger(ring_buffer: LogRingBuffer) -> &'static DualLogger {
    DUAL_LOGGER.get_or_init(|| DualLogger::new(ring_buffer))
}
