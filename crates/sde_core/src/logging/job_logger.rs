//! Per-job logger with file and callback output.
//!
//! Each job gets its own logger that:
//! - Writes to a dedicated log file under the batch log folder
//! - Pushes every line to an optional callback (the observability seam)
//! - Filters progress spam in compact mode
//! - Maintains a bounded tail of tool output for error diagnosis

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel};

/// Ceiling on assembled diagnostic text, in bytes.
const MAX_DIAGNOSTIC_LEN: usize = 2048;

/// Per-job logger with dual output (file + callback).
pub struct JobLogger {
    /// Job name for identification.
    job_name: String,
    /// Path to the log file.
    log_path: PathBuf,
    /// File writer (buffered).
    file_writer: Mutex<Option<BufWriter<File>>>,
    /// Push callback for the observability collaborator.
    callback: Option<LogCallback>,
    /// Logging configuration.
    config: LogConfig,
    /// Bounded tail of tool output lines.
    tail_buffer: Mutex<VecDeque<String>>,
    /// Last progress value logged (for compact mode filtering).
    last_progress: Mutex<u32>,
}

impl JobLogger {
    /// Create a new job logger.
    ///
    /// # Arguments
    /// * `job_name` - Name of the job (used in log filename)
    /// * `log_dir` - Directory to write the log file to
    /// * `config` - Logging configuration
    /// * `callback` - Optional push callback for log lines
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let job_name = job_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;
        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&job_name)));
        let file = File::create(&log_path)?;
        let tail_capacity = config.error_tail;

        Ok(Self {
            job_name,
            log_path,
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback,
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(tail_capacity)),
            last_progress: Mutex::new(0),
        })
    }

    /// Get the job name.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Get the log file path.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        self.output(&self.format_message(message));
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, &format!("[DEBUG] {}", message));
    }

    /// Log a warning message.
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &format!("[WARNING] {}", message));
    }

    /// Log an error message.
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &format!("[ERROR] {}", message));
    }

    /// Log a success marker.
    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &format!("[SUCCESS] {}", message));
    }

    /// Log an external command being executed.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Debug, &format!("$ {}", command));
    }

    /// Log a progress update (filtered in compact mode).
    ///
    /// Returns true if the progress was logged, false if filtered.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step;

            // Only log at step intervals (e.g. 0%, 20%, 40%, ...)
            let current_step = (percent / step) * step;
            let last_step = (*last / step) * step;

            if current_step <= last_step && percent < 100 {
                return false;
            }
            *last = percent;
        }

        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// Record a tool output line (stdout/stderr from the external engine).
    ///
    /// Always lands in the bounded tail buffer; in compact mode it is not
    /// pushed to the file or callback, keeping the transcript out of
    /// memory and out of the visible stream.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            buffer.push_back(line.to_string());
        }

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        self.output(&self.format_message(&format!("{}{}", prefix, line)));
    }

    /// Clear the tail buffer (at job start).
    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    /// Get the current tail buffer contents.
    pub fn tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Assemble bounded diagnostic text from the tail buffer.
    ///
    /// Used to populate a failed job's detail field without risking
    /// unbounded growth on pathologically verbose tool failures.
    pub fn diagnostic(&self, header: &str) -> String {
        let tail = self.tail_buffer.lock();
        let mut text = header.to_string();
        for line in tail.iter() {
            if text.len() + line.len() + 1 > MAX_DIAGNOSTIC_LEN {
                text.push_str("\n[truncated]");
                break;
            }
            text.push('\n');
            text.push_str(line);
        }
        text
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file handle.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    /// Format a message with timestamp (if enabled).
    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    /// Output a formatted message to file and callback.
    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }
        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("movie_01", dir.path(), LogConfig::default(), None).unwrap();

        assert!(logger.log_path().exists());
        assert!(logger.log_path().to_string_lossy().contains("movie_01.log"));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("movie_01", dir.path(), LogConfig::default(), None).unwrap();

        logger.info("Probing audio stream");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("Probing audio stream"));
    }

    #[test]
    fn pushes_to_callback() {
        let dir = tempdir().unwrap();
        let call_count = Arc::new(AtomicUsize::new(0));
        let count_clone = call_count.clone();

        let callback: LogCallback = Box::new(move |_line| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger =
            JobLogger::new("movie_01", dir.path(), LogConfig::default(), Some(callback)).unwrap();

        logger.info("one");
        logger.info("two");

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_filters_progress() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: true,
            progress_step: 20,
            ..LogConfig::default()
        };

        let logger = JobLogger::new("movie_01", dir.path(), config, None).unwrap();

        assert!(!logger.progress(5));
        assert!(!logger.progress(15));
        assert!(logger.progress(20));
        assert!(!logger.progress(25));
        assert!(logger.progress(40));
        assert!(logger.progress(100));
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            error_tail: 5,
            ..LogConfig::default()
        };

        let logger = JobLogger::new("movie_01", dir.path(), config, None).unwrap();

        for i in 0..10 {
            logger.output_line(&format!("line {}", i), true);
        }

        let tail = logger.tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "line 5");
        assert_eq!(tail[4], "line 9");
    }

    #[test]
    fn diagnostic_is_bounded() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            error_tail: 100,
            ..LogConfig::default()
        };
        let logger = JobLogger::new("movie_01", dir.path(), config, None).unwrap();

        let long_line = "x".repeat(200);
        for _ in 0..100 {
            logger.output_line(&long_line, true);
        }

        let diagnostic = logger.diagnostic("encode failed");
        assert!(diagnostic.starts_with("encode failed"));
        assert!(diagnostic.len() <= MAX_DIAGNOSTIC_LEN + "\n[truncated]".len());
        assert!(diagnostic.ends_with("[truncated]"));
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
